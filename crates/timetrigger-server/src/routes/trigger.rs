use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde_json::Value;
use timetrigger_core::{TriggerError, UtcSeconds};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct TriggerBody {
    #[serde(default)]
    pub timestamp: Option<Value>,
}

#[derive(serde::Deserialize)]
pub struct TriggerForm {
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// POST /trigger — schedule a process exit at a future UTC second.
///
/// Accepts `{"timestamp": <seconds>}` as JSON, or a urlencoded form with a
/// `timestamp` field. The timestamp must be strictly greater than the current
/// second.
pub async fn post_trigger(
    State(app): State<AppState>,
    req: Request,
) -> Result<Json<Value>, AppError> {
    let raw = read_timestamp(req).await?;
    let current = app.clock.now_seconds();
    let parsed = raw.as_ref().and_then(parse_timestamp);

    let target = match parsed {
        Some(t) if t > current => t,
        _ => {
            let err = TriggerError::InvalidTimestamp {
                current,
                target: parsed,
                raw: raw.map(|v| v.to_string()).unwrap_or_else(|| "<missing>".into()),
            };
            warn!(error = %err, "trigger rejected");
            return Err(err.into());
        }
    };

    app.scheduler.schedule(target);

    Ok(Json(serde_json::json!({
        "current_seconds": current,
        "target_seconds": target,
        "delay": target - current,
    })))
}

/// DELETE /trigger — cancel the pending trigger, if any.
pub async fn cancel_trigger(State(app): State<AppState>) -> Json<Value> {
    let cancelled = app.scheduler.cancel();
    Json(serde_json::json!({
        "cancelled": cancelled,
        "status": app.scheduler.status(),
    }))
}

async fn read_timestamp(req: Request) -> Result<Option<Value>, AppError> {
    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<TriggerForm>::from_request(req, &())
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        Ok(form.timestamp.map(Value::String))
    } else {
        let Json(body) = Json::<TriggerBody>::from_request(req, &())
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        Ok(body.timestamp)
    }
}

/// Integer seconds from a JSON number or numeric string. Fractions truncate.
pub fn parse_timestamp(value: &Value) -> Option<UtcSeconds> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<UtcSeconds> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}
