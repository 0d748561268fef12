use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
}
