//! Error type shared by the lower `pk-*` crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("value {value} out of range for {what}")]
    OutOfRange { what: &'static str, value: f64 },
}

pub type CoreResult<T> = Result<T, CoreError>;
