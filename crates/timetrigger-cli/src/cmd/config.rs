use crate::output::print_json;
use anyhow::{anyhow, Result};
use timetrigger_core::config::{Config, WarnLevel};

/// Print the effective config and its validation results.
/// Fails when validation reports errors.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({
            "config": config,
            "warnings": warnings,
        }))?;
    } else {
        print!("{}", serde_yaml::to_string(config)?);
        for w in &warnings {
            let tag = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            eprintln!("{tag}: {}", w.message);
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();
    if errors > 0 {
        return Err(anyhow!("config has {errors} error(s)"));
    }
    Ok(())
}
