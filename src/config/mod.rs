//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, DatabaseConfig, EmbeddingConfig, EmbeddingProviderType, HunyuanSettings,
    LogFormat, LoggingConfig, OpenAiSettings, WenxinSettings,
};
