// mkpkginfo-common/src/model/receipt.rs
use serde::{Deserialize, Serialize};

/// One installable unit recorded by a package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Receipt {
    #[serde(rename = "packageid")]
    pub package_id: String,
    pub version: String,
    /// Declared payload size in kilobytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_size: Option<u64>,
    /// File name of the component package, when the descriptor names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Receipt {
    pub fn new(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_installed_size(mut self, kbytes: u64) -> Self {
        self.installed_size = Some(kbytes);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
