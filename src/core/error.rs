/// Error type shared by the library components

#[derive(thiserror::Error, Debug)]
pub enum SentinelError {
    #[error("Token identifier must not be empty")]
    EmptyToken,

    #[error("Invalid signal payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Live feed error: {0}")]
    Feed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
