// mkpkginfo-core/src/container/mount.rs
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mkpkginfo_aio::run_command;
use mkpkginfo_common::error::{MkPkgInfoError, Result};
use plist::Value;
use tracing::{debug, error, info, warn};

use crate::backend::DiskImageMounter;
use crate::plists::first_plist_in_output;

const HDIUTIL: &str = "/usr/bin/hdiutil";

/// Mounts disk images with `hdiutil`.
#[derive(Debug, Clone)]
pub struct Hdiutil {
    timeout: Duration,
}

impl Hdiutil {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Images with a software license agreement block `attach` until the
    /// agreement is accepted on stdin.
    fn has_license_agreement(&self, image: &Path) -> bool {
        let args = [
            OsStr::new("imageinfo"),
            image.as_os_str(),
            OsStr::new("-plist"),
        ];
        match run_command(HDIUTIL, &args, None, self.timeout) {
            Ok(out) if out.status.success() => first_plist_in_output(&out.stdout)
                .and_then(|info| info.get("Properties").cloned())
                .and_then(Value::into_dictionary)
                .and_then(|props| props.get("Software License Agreement").cloned())
                .and_then(|v| v.as_boolean())
                .unwrap_or(false),
            Ok(_) | Err(_) => false,
        }
    }

    fn run_detach(&self, mount_point: &Path, force: bool) -> std::result::Result<(), String> {
        let mut args = vec![OsStr::new("detach"), mount_point.as_os_str()];
        if force {
            args.push(OsStr::new("-force"));
        }
        match run_command(HDIUTIL, &args, None, self.timeout) {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(String::from_utf8_lossy(&out.stderr).trim().to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl DiskImageMounter for Hdiutil {
    fn attach(&self, image: &Path) -> Result<Vec<PathBuf>> {
        let name = image.display();
        debug!("Mounting disk image: {}", name);
        let stdin: Option<&[u8]> = if self.has_license_agreement(image) {
            info!("{} has a license agreement; accepting it to mount", name);
            Some(b"Y\n".as_slice())
        } else {
            None
        };

        let args = [
            OsStr::new("attach"),
            image.as_os_str(),
            OsStr::new("-mountRandom"),
            OsStr::new("/tmp"),
            OsStr::new("-nobrowse"),
            OsStr::new("-readonly"),
            OsStr::new("-plist"),
        ];
        let out = run_command(HDIUTIL, &args, stdin, self.timeout)
            .map_err(|e| MkPkgInfoError::Resource(format!("Could not mount {name}: {e}")))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            error!("hdiutil attach failed for {}: {}", name, stderr.trim());
            return Err(MkPkgInfoError::Resource(format!(
                "Could not mount {}: {}",
                name,
                stderr.trim()
            )));
        }

        let mount_points = parse_mount_points(&out.stdout);
        if mount_points.is_empty() {
            // Attached but not mounted: release the device before giving up.
            let devices = parse_device_entries(&out.stdout);
            if devices.is_empty() {
                warn!("hdiutil reported no devices for {}; nothing to detach", name);
            }
            for device in &devices {
                match self.detach(device) {
                    Ok(()) => break,
                    Err(e) => warn!("Could not detach {}: {}", device.display(), e),
                }
            }
            return Err(MkPkgInfoError::Resource(format!(
                "hdiutil reported no mount points for {name}"
            )));
        }
        debug!("{} mounted at {:?}", name, mount_points);
        Ok(mount_points)
    }

    /// Polite detach first; a forced detach is tried once if that fails.
    fn detach(&self, mount_point: &Path) -> Result<()> {
        debug!("Unmounting {}", mount_point.display());
        let polite = match self.run_detach(mount_point, false) {
            Ok(()) => return Ok(()),
            Err(reason) => reason,
        };
        warn!(
            "Polite unmount of {} failed: {}; forcing it",
            mount_point.display(),
            polite
        );
        self.run_detach(mount_point, true).map_err(|forced| {
            error!("Forced unmount of {} failed: {}", mount_point.display(), forced);
            MkPkgInfoError::Resource(format!(
                "Failed to unmount {}; it may still be mounted: {}",
                mount_point.display(),
                forced
            ))
        })
    }
}

/// Device nodes listed under `system-entities`, whole disk first.
pub fn parse_device_entries(output: &[u8]) -> Vec<PathBuf> {
    entity_strings(output, "dev-entry")
}

/// Mount points listed under `system-entities` in `hdiutil attach -plist`
/// output.
pub fn parse_mount_points(output: &[u8]) -> Vec<PathBuf> {
    entity_strings(output, "mount-point")
}

fn entity_strings(output: &[u8], key: &str) -> Vec<PathBuf> {
    let Some(dict) = first_plist_in_output(output) else {
        warn!("hdiutil attach output contained no property list");
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = dict
        .get("system-entities")
        .and_then(Value::as_array)
        .map(|entities| {
            entities
                .iter()
                .filter_map(Value::as_dictionary)
                .filter_map(|entity| entity.get(key))
                .filter_map(Value::as_string)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();
    if key == "dev-entry" {
        found.sort_by_key(|dev| dev.as_os_str().len());
    }
    found
}
