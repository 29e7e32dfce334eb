use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailureKind {
    Network,
    Status,
    Instantiation,
    MissingModule,
    MissingSymbol,
    WrongExportKind,
}

/// Why a remote module could not produce the requested export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to fetch remote entry {location}: {message}")]
    Network { location: String, message: String },
    #[error("remote entry {location} answered with status {status}")]
    Status { location: String, status: u16 },
    #[error("remote entry {location} could not be instantiated: {message}")]
    Instantiation { location: String, message: String },
    #[error("remote entry {location} does not expose module {module}")]
    MissingModule { location: String, module: String },
    #[error("module {module} of {location} has no export named {symbol}")]
    MissingSymbol {
        location: String,
        module: String,
        symbol: String,
    },
    #[error("export {symbol} of {location} is a {found}, expected a {expected}")]
    WrongExportKind {
        location: String,
        symbol: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl LoadError {
    pub fn kind(&self) -> LoadFailureKind {
        match self {
            Self::Network { .. } => LoadFailureKind::Network,
            Self::Status { .. } => LoadFailureKind::Status,
            Self::Instantiation { .. } => LoadFailureKind::Instantiation,
            Self::MissingModule { .. } => LoadFailureKind::MissingModule,
            Self::MissingSymbol { .. } => LoadFailureKind::MissingSymbol,
            Self::WrongExportKind { .. } => LoadFailureKind::WrongExportKind,
        }
    }
}
