// mkpkginfo-core/src/descriptor/mod.rs
//! Reads receipts and installer-level fields out of macOS installer
//! packages, in both the flat (xar) and the bundle layouts.

mod bundle_pkg;
mod flat;
mod installer;
mod pkgrefs;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mkpkginfo_common::config::Config;
use mkpkginfo_common::error::Result;
use mkpkginfo_common::model::{ArtifactKind, Receipt};
use tracing::{debug, warn};

use crate::backend::{PackageDescriptor, PackageReader};
use crate::plists::FilePlistReader;

pub use pkgrefs::parse_pkg_refs;

/// Package reader backed by `installer`, `xar` and the package's own files.
#[derive(Debug, Clone)]
pub struct SystemPackageReader {
    plists: FilePlistReader,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl SystemPackageReader {
    pub fn new(config: &Config) -> Self {
        Self {
            plists: FilePlistReader,
            timeout: config.command_timeout,
            scratch_dir: config.scratch_dir(),
        }
    }

    /// Receipts for any package-like path: a flat package file, a bundle
    /// package, an expanded flat component, or a Distribution document.
    pub(crate) fn receipts_for(&self, path: &Path) -> Vec<Receipt> {
        if path.is_dir() && path.join("PackageInfo").is_file() {
            return pkgrefs::parse_pkg_refs(&path.join("PackageInfo"), None, &|p| {
                self.receipts_for(p)
            })
            .unwrap_or_else(|e| {
                warn!("{}", e);
                Vec::new()
            })
            .into_iter()
            .map(|r| match path.file_name() {
                Some(name) if r.filename.is_none() => {
                    r.with_filename(name.to_string_lossy().into_owned())
                }
                _ => r,
            })
            .collect();
        }

        let is_dist = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("dist"));
        if is_dist && path.is_file() {
            return pkgrefs::parse_pkg_refs(path, None, &|p| self.receipts_for(p))
                .unwrap_or_else(|e| {
                    warn!("{}", e);
                    Vec::new()
                });
        }

        match ArtifactKind::from_path(path) {
            Some(kind) if kind.is_package() && path.is_file() => {
                flat::flat_package_receipts(path, self).unwrap_or_else(|e| {
                    warn!("Could not expand {}: {}", path.display(), e);
                    Vec::new()
                })
            }
            Some(kind) if kind.is_package() && path.is_dir() => {
                bundle_pkg::bundle_package_receipts(path, self)
            }
            _ => {
                debug!("{} is not a package; no receipts", path.display());
                Vec::new()
            }
        }
    }
}

impl PackageReader for SystemPackageReader {
    fn read_package(&self, path: &Path) -> Result<PackageDescriptor> {
        let mut descriptor = installer::installer_fields(path, self.timeout);
        descriptor.receipts = self.receipts_for(path);
        debug!(
            "Read {} receipt(s) from {}",
            descriptor.receipts.len(),
            path.display()
        );
        Ok(descriptor)
    }
}
