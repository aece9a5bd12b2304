use fzgate_core::GatewayError;

/// Outcome of every fallible C ABI call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FzStatus {
    Ok = 0,
    /// Null pointer, invalid UTF-8, unparsable JSON or a wrong payload shape.
    Usage = 1,
    Validation = 2,
    Config = 3,
    InvalidHandle = 4,
    Engine = 5,
}

impl From<&GatewayError> for FzStatus {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Validation(_) => FzStatus::Validation,
            GatewayError::Config(_) => FzStatus::Config,
            GatewayError::InvalidHandle(_) => FzStatus::InvalidHandle,
            GatewayError::Engine(_) => FzStatus::Engine,
        }
    }
}

impl From<Result<(), GatewayError>> for FzStatus {
    fn from(result: Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => FzStatus::Ok,
            Err(err) => FzStatus::from(&err),
        }
    }
}
