mod gateway;

pub use gateway::{EngineSettings, GatewaySettings, LoggingSettings, SettingsError};
