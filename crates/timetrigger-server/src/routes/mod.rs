pub mod info;
pub mod status;
pub mod trigger;
