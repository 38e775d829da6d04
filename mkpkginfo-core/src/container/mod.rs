// mkpkginfo-core/src/container/mod.rs
//! Disk image resolution: mount, find what is inside, describe it, unmount.

pub mod mount;

use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::{
    ArtifactKind, CatalogInfo, InstallerType, ItemToCopy, UninstallMethod,
};
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, DiskImageMounter};
use crate::classify::is_application;
use crate::fingerprint::{fingerprint, FingerprintOptions};
use crate::inspect::inspect_package;
use crate::vendor::is_vendor_enterprise_receipt;

/// An attached disk image. Every mount point is detached by [`release`],
/// or on drop if the session is abandoned.
///
/// [`release`]: MountSession::release
pub struct MountSession<'a> {
    mounter: &'a dyn DiskImageMounter,
    image: PathBuf,
    mount_points: Vec<PathBuf>,
    released: bool,
}

impl<'a> MountSession<'a> {
    pub fn attach(mounter: &'a dyn DiskImageMounter, image: &Path) -> Result<Self> {
        let mount_points = mounter.attach(image)?;
        if mount_points.is_empty() {
            return Err(MkPkgInfoError::Resource(format!(
                "{} attached without any mount points",
                image.display()
            )));
        }
        Ok(Self {
            mounter,
            image: image.to_path_buf(),
            mount_points,
            released: false,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.mount_points
    }

    /// Detaches every mount point, continuing past failures. The first
    /// failure is returned.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.detach_all()
    }

    fn detach_all(&self) -> Result<()> {
        let mut first_error = None;
        for mount_point in &self.mount_points {
            if let Err(e) = self.mounter.detach(mount_point) {
                error!("Could not release {}: {}", mount_point.display(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for MountSession<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!("{} was never released; detaching it now", self.image.display());
            self.released = true;
            let _ = self.detach_all();
        }
    }
}

/// Operator choices that steer disk image resolution.
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Path of a package relative to the image root.
    pub package_hint: Option<String>,
    /// Drag-and-drop item to install instead of the first application.
    pub item_name: Option<String>,
    pub legacy_appdmg: bool,
    pub destination: PathBuf,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<String>,
    pub fingerprint: FingerprintOptions,
}

/// Mounts `image`, resolves its contents and always releases the mount.
///
/// A failed release is an error even when resolution succeeded; when both
/// fail the resolution error wins and the release error is logged.
pub fn resolve_disk_image(
    image: &Path,
    options: &ContainerOptions,
    backend: &Backend,
) -> Result<CatalogInfo> {
    let session = MountSession::attach(backend.mounter.as_ref(), image)?;
    let outcome = resolve_mounted(image, &session.roots()[0], options, backend);
    let released = session.release();
    match (outcome, released) {
        (Ok(info), Ok(())) => Ok(info),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_error)) => {
            error!(
                "{} also failed to unmount: {}",
                image.display(),
                release_error
            );
            Err(e)
        }
    }
}

fn image_name(image: &Path) -> String {
    image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.display().to_string())
}

fn sorted_children(root: &Path) -> Result<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    children.sort();
    Ok(children)
}

fn resolve_mounted(
    image: &Path,
    root: &Path,
    options: &ContainerOptions,
    backend: &Backend,
) -> Result<CatalogInfo> {
    let hinted = options.package_hint.as_deref().and_then(|hint| {
        let candidate = root.join(hint.trim_start_matches('/'));
        if candidate.exists() {
            Some((candidate, Some(hint)))
        } else {
            warn!("{} was not found on {}", hint, image_name(image));
            None
        }
    });
    let package = match hinted {
        Some(found) => Some(found),
        None if options.package_hint.is_some() => None,
        None => sorted_children(root)?
            .into_iter()
            .find(|p| ArtifactKind::from_path(p).is_some_and(|k| k.is_package()))
            .map(|p| (p, None)),
    };

    if let Some((package, hint)) = package {
        debug!("Inspecting {} inside {}", package.display(), image.display());
        let mut info = inspect_package(&package, backend.packages.as_ref())?;
        if let Some(hint) = hint {
            info.package_path = Some(hint.to_string());
        }
        return apply_vendor_rule(info, image, root, backend);
    }

    match backend.vendor.catalog_info(root, None) {
        Ok(Some(info)) => return Ok(info),
        Ok(None) => {}
        Err(e) => warn!("Vendor suite handler failed on {}: {}", image.display(), e),
    }

    drag_and_drop(image, root, options, backend)
}

/// Vendor enterprise packages hide their real metadata; hand them over.
fn apply_vendor_rule(
    info: CatalogInfo,
    image: &Path,
    root: &Path,
    backend: &Backend,
) -> Result<CatalogInfo> {
    let hint = match info.receipts.first() {
        Some(first) if is_vendor_enterprise_receipt(first) => first.filename.clone(),
        _ => return Ok(info),
    };
    info!(
        "{} contains a vendor enterprise package; using the vendor suite handler",
        image_name(image)
    );
    match backend.vendor.catalog_info(root, hint.as_deref()) {
        Ok(Some(vendor_info)) => Ok(vendor_info),
        Ok(None) => Err(MkPkgInfoError::VendorOnlyArtifact(image_name(image))),
        Err(e) => {
            error!("Vendor suite handler failed: {}", e);
            Err(MkPkgInfoError::VendorOnlyArtifact(image_name(image)))
        }
    }
}

fn drag_and_drop(
    image: &Path,
    root: &Path,
    options: &ContainerOptions,
    backend: &Backend,
) -> Result<CatalogInfo> {
    let item = match options.item_name.as_deref() {
        Some(name) => {
            let candidate = root.join(name.trim_start_matches('/'));
            if !candidate.exists() {
                return Err(MkPkgInfoError::UnsupportedArtifact(format!(
                    "{} was not found on {}",
                    name,
                    image_name(image)
                )));
            }
            candidate
        }
        None => sorted_children(root)?
            .into_iter()
            .find(|p| is_application(p, backend.plists.as_ref()) && p.is_dir())
            .ok_or_else(|| {
                MkPkgInfoError::UnsupportedArtifact(format!(
                    "No installable item found on {}",
                    image_name(image)
                ))
            })?,
    };

    let item_name = item
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut installed = fingerprint(&item, backend.plists.as_ref(), options.fingerprint);
    installed.path = options.destination.join(&item_name).to_string_lossy().into_owned();

    let name = item
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| item_name.clone());
    let mut info = CatalogInfo::named(name);
    info.version = installed.short_version.clone();

    if options.legacy_appdmg {
        info.installer_type = Some(InstallerType::AppDmg);
        info.set_uninstall(UninstallMethod::RemoveApp);
    } else {
        info.installer_type = Some(InstallerType::CopyFromDmg);
        info.items_to_copy.push(ItemToCopy {
            source_item: item_name,
            destination_path: options.destination.to_string_lossy().into_owned(),
            user: options.owner.clone(),
            group: options.group.clone(),
            mode: options.mode.clone(),
        });
        info.set_uninstall(UninstallMethod::RemoveCopiedItems);
    }
    info.installs.push(installed);
    Ok(info)
}
