pub(crate) mod config;
pub use config::{EngineSettings, GatewaySettings, LoggingSettings, SettingsError};

pub(crate) mod constants;
pub use constants::{Constants, expose_constants};

pub(crate) mod haystack;
pub use haystack::Haystack;

pub(crate) mod options;
pub use options::{CaseMode, Criterion, Options, RawOptions};

pub(crate) mod result;
pub use result::{Match, SearchResult};

pub(crate) mod session_id;
pub use session_id::SessionId;
