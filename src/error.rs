use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: bad value in column '{column}': {reason}")]
    BadField {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Condition code '{0}' is too short to decode")]
    ConditionCode(String),

    #[error("Trial code '{code}' has no target character for block {block}")]
    TrialCode { code: String, block: u8 },

    #[error("No congruency mapping for order chars '{chars}' in block {block}")]
    CongruencyUndefined { chars: String, block: u8 },

    #[error("Unknown political orientation label '{0}'")]
    PoliticalLabel(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;
