// mkpkginfo-common/src/model/fingerprint.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of filesystem entity an installed item is.
///
/// Exactly one kind applies; classification checks them in declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Application,
    Bundle,
    /// A standalone `Info.plist` / `version.plist` style descriptor document.
    Plist,
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemKind::Application => "application",
            ItemKind::Bundle => "bundle",
            ItemKind::Plist => "plist",
            ItemKind::File => "file",
        };
        f.write_str(label)
    }
}

/// Metadata captured for one installed item, used later to decide whether the
/// item is present and current.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFingerprint {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub path: String,
    #[serde(rename = "CFBundleName", default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
    #[serde(
        rename = "CFBundleIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bundle_identifier: Option<String>,
    #[serde(
        rename = "CFBundleShortVersionString",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub short_version: Option<String>,
    /// Consumed by the synthesizer; never part of the emitted record.
    #[serde(skip)]
    pub minimum_os_version: Option<String>,
    #[serde(rename = "md5checksum", default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ItemFingerprint {
    pub fn new(kind: ItemKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            bundle_name: None,
            bundle_identifier: None,
            short_version: None,
            minimum_os_version: None,
            checksum: None,
        }
    }
}
