// mkpkginfo-common/src/error.rs
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MkPkgInfoError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("Property List Error: {0}")]
    Plist(#[from] Arc<plist::Error>),

    #[error("Usage Error: {0}")]
    Usage(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    /// A disk image could not be attached or released.
    #[error("Resource Error: {0}")]
    Resource(String),

    #[error("Unsupported installer item: {0}")]
    UnsupportedArtifact(String),

    /// Neither receipts nor installer-level metadata could be read.
    #[error("Unreadable installer item: {0}")]
    UnreadableArtifact(String),

    #[error("Unreadable descriptor {0}: {1}")]
    UnreadableDescriptor(String, String),

    #[error("Item {0} doesn't exist")]
    MissingAuxiliaryItem(String),

    #[error("{0} can only be processed by vendor deployment tooling; create its catalog info manually with the vendor's tools")]
    VendorOnlyArtifact(String),

    #[error("XML Parsing Error in {0}: {1}")]
    Xml(String, String),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),

    #[error("Command timed out after {1}s: {0}")]
    Timeout(String, u64),
}

impl MkPkgInfoError {
    /// Process exit code for this error when it aborts a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            MkPkgInfoError::Usage(_) | MkPkgInfoError::Config(_) => 2,
            MkPkgInfoError::Resource(_) => 3,
            MkPkgInfoError::UnsupportedArtifact(_) | MkPkgInfoError::UnreadableArtifact(_) => 4,
            MkPkgInfoError::VendorOnlyArtifact(_) => 5,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for MkPkgInfoError {
    fn from(err: std::io::Error) -> Self {
        MkPkgInfoError::Io(Arc::new(err))
    }
}

impl From<plist::Error> for MkPkgInfoError {
    fn from(err: plist::Error) -> Self {
        MkPkgInfoError::Plist(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MkPkgInfoError>;
