// mkpkginfo-common/src/model/mod.rs
pub mod artifact;
pub mod catalog;
pub mod fingerprint;
pub mod receipt;

pub use artifact::{ArtifactKind, InstallerArtifact, NOT_A_FILE_HASH};
pub use catalog::{
    CatalogInfo, InstallerType, ItemToCopy, RestartAction, UninstallMethod, UNVERSIONED_PLACEHOLDER,
};
pub use fingerprint::{ItemFingerprint, ItemKind};
pub use receipt::Receipt;
