//! The error taxonomy shared by every UMPS crate (spec §7).

use snafu::Snafu;

/// One variant per error kind named in the error-handling design. Every variant carries a
/// `context` string so loops that catch-and-log (the ZAP service, proxies, repliers) have
/// something concrete to put in the log line.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("invalid argument: {context}"))]
    InvalidArgument { context: String },

    #[snafu(display("not initialized: {context}"))]
    NotInitialized { context: String },

    #[snafu(display("already initialized: {context}"))]
    AlreadyInitialized { context: String },

    #[snafu(display("address in use: {context}"))]
    AddressInUse { context: String },

    #[snafu(display("authentication denied: {context}"))]
    AuthenticationDenied { context: String },

    #[snafu(display("timed out: {context}"))]
    Timeout { context: String },

    #[snafu(display("serialization failure: {context}"))]
    SerializationFailure { context: String },

    #[snafu(display("I/O failure: {context}"))]
    IoFailure { context: String },

    #[snafu(display("algorithm failure: {context}"))]
    AlgorithmFailure { context: String },

    #[snafu(display("not found: {context}"))]
    NotFound { context: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::InvalidArgument {
            context: context.into(),
        }
    }

    pub fn not_initialized(context: impl Into<String>) -> Self {
        Self::NotInitialized {
            context: context.into(),
        }
    }

    pub fn already_initialized(context: impl Into<String>) -> Self {
        Self::AlreadyInitialized {
            context: context.into(),
        }
    }

    pub fn address_in_use(context: impl Into<String>) -> Self {
        Self::AddressInUse {
            context: context.into(),
        }
    }

    pub fn authentication_denied(context: impl Into<String>) -> Self {
        Self::AuthenticationDenied {
            context: context.into(),
        }
    }

    pub fn timeout(context: impl Into<String>) -> Self {
        Self::Timeout {
            context: context.into(),
        }
    }

    pub fn serialization_failure(context: impl Into<String>) -> Self {
        Self::SerializationFailure {
            context: context.into(),
        }
    }

    pub fn io_failure(context: impl Into<String>) -> Self {
        Self::IoFailure {
            context: context.into(),
        }
    }

    pub fn algorithm_failure(context: impl Into<String>) -> Self {
        Self::AlgorithmFailure {
            context: context.into(),
        }
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::io_failure(error.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Self::io_failure(error.to_string())
    }
}
