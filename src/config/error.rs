use thiserror::Error;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("de error: {0}")]
    TomlDeError(#[from] toml::de::Error),
    #[error("encoding error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    #[error("config not found")]
    ConfigNotFound,
}
