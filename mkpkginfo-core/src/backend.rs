// mkpkginfo-core/src/backend.rs
//! The collaborators the synthesis engine talks to for everything that
//! touches the outside world: property lists, package descriptors, disk image
//! mounts and vendor-suite installers.

use std::path::{Path, PathBuf};

use mkpkginfo_common::config::Config;
use mkpkginfo_common::error::Result;
use mkpkginfo_common::model::{CatalogInfo, Receipt, RestartAction};

use crate::container::mount::Hdiutil;
use crate::descriptor::SystemPackageReader;
use crate::plists::FilePlistReader;
use crate::vendor::ExternalVendorHelper;

/// Reads a structured key/value document.
pub trait PlistReader {
    fn read_dict(&self, path: &Path) -> Result<plist::Dictionary>;
}

/// Normalized metadata of one package-like installer item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub receipts: Vec<Receipt>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub restart_action: Option<RestartAction>,
    /// Installer-level declared size in kilobytes.
    pub installed_size: Option<u64>,
}

impl PackageDescriptor {
    pub fn has_installer_fields(&self) -> bool {
        self.display_name.is_some()
            || self.description.is_some()
            || self.restart_action.is_some()
            || self.installed_size.is_some()
    }
}

pub trait PackageReader {
    fn read_package(&self, path: &Path) -> Result<PackageDescriptor>;
}

/// Attaches disk images and releases them again.
pub trait DiskImageMounter {
    /// Returns every mount point of the attached image; never empty on success.
    fn attach(&self, image: &Path) -> Result<Vec<PathBuf>>;
    fn detach(&self, mount_point: &Path) -> Result<()>;
}

/// Specialized handling for vendor installer suites whose metadata the
/// generic package reader cannot recover. `Ok(None)` means "not mine".
pub trait VendorSuite {
    fn catalog_info(&self, root: &Path, hint: Option<&str>) -> Result<Option<CatalogInfo>>;
}

pub struct Backend {
    pub plists: Box<dyn PlistReader>,
    pub packages: Box<dyn PackageReader>,
    pub mounter: Box<dyn DiskImageMounter>,
    pub vendor: Box<dyn VendorSuite>,
}

impl Backend {
    /// The real macOS tooling.
    pub fn system(config: &Config) -> Self {
        Self {
            plists: Box::new(FilePlistReader),
            packages: Box::new(SystemPackageReader::new(config)),
            mounter: Box::new(Hdiutil::new(config.command_timeout)),
            vendor: Box::new(ExternalVendorHelper::new(
                config.vendor_helper.clone(),
                config.command_timeout,
            )),
        }
    }
}
