// mkpkginfo-common/src/model/artifact.rs
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Hash reported for directory-style installer items.
pub const NOT_A_FILE_HASH: &str = "N/A";

/// The kinds of installer item mkpkginfo accepts as input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A component or product package (`.pkg`), flat file or bundle directory.
    Package,
    /// A bundle-style metapackage (`.mpkg`).
    MultiPackage,
    /// A disk image (`.dmg`) that has to be mounted before inspection.
    DiskImage,
}

impl ArtifactKind {
    /// Classifies an input path by its extension. Case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pkg" => Some(ArtifactKind::Package),
            "mpkg" => Some(ArtifactKind::MultiPackage),
            "dmg" => Some(ArtifactKind::DiskImage),
            _ => None,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, ArtifactKind::Package | ArtifactKind::MultiPackage)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Package => "package",
            ArtifactKind::MultiPackage => "multi-package",
            ArtifactKind::DiskImage => "disk image",
        };
        f.write_str(label)
    }
}

/// The installer item a run was started with, measured once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 hex digest, or [`NOT_A_FILE_HASH`] for bundle directories.
    pub digest: String,
}

impl InstallerArtifact {
    /// Size in whole kilobytes, truncated.
    pub fn size_kbytes(&self) -> u64 {
        self.size_bytes / 1024
    }
}
