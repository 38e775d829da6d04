// mkpkginfo-core/src/descriptor/installer.rs
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use mkpkginfo_aio::run_command;
use mkpkginfo_common::model::RestartAction;
use plist::Dictionary;
use tracing::{debug, warn};

use crate::backend::PackageDescriptor;
use crate::plists::{first_plist_in_output, string_value, unsigned_value};

const INSTALLER: &str = "/usr/sbin/installer";

/// Installer-level fields as reported by `installer -pkginfo` and
/// `installer -query RestartAction`. Every failure here is logged and
/// leaves the corresponding fields unset.
pub(crate) fn installer_fields(pkg: &Path, timeout: Duration) -> PackageDescriptor {
    let mut descriptor = PackageDescriptor::default();

    let args = [
        OsStr::new("-pkginfo"),
        OsStr::new("-verbose"),
        OsStr::new("-plist"),
        OsStr::new("-pkg"),
        pkg.as_os_str(),
    ];
    match run_command(INSTALLER, &args, None, timeout) {
        Ok(out) if out.status.success() => match first_plist_in_output(&out.stdout) {
            Some(dict) => apply_pkginfo(&mut descriptor, &dict),
            None => debug!("installer -pkginfo printed no plist for {}", pkg.display()),
        },
        Ok(out) => debug!(
            "installer -pkginfo failed for {}: {}",
            pkg.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        ),
        Err(e) => warn!("Could not query {}: {}", pkg.display(), e),
    }

    let args = [
        OsStr::new("-query"),
        OsStr::new("RestartAction"),
        OsStr::new("-pkg"),
        pkg.as_os_str(),
    ];
    match run_command(INSTALLER, &args, None, timeout) {
        Ok(out) if out.status.success() => {
            let action = String::from_utf8_lossy(&out.stdout);
            if let Some(action) = parse_restart_action(&action) {
                descriptor.restart_action = Some(action);
            }
        }
        Ok(_) => debug!("installer -query RestartAction failed for {}", pkg.display()),
        Err(e) => debug!("Could not query RestartAction of {}: {}", pkg.display(), e),
    }

    descriptor
}

fn apply_pkginfo(descriptor: &mut PackageDescriptor, dict: &Dictionary) {
    descriptor.installed_size = unsigned_value(dict, "Size");
    descriptor.description = string_value(dict, "Description");
    descriptor.display_name = string_value(dict, "Title");
    if string_value(dict, "Will Restart").as_deref() == Some("YES") {
        descriptor.restart_action = Some(RestartAction::RequireRestart);
    }
}

/// `None` (the literal word) means no action.
fn parse_restart_action(output: &str) -> Option<RestartAction> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return None;
    }
    match trimmed.parse() {
        Ok(action) => Some(action),
        Err(e) => {
            warn!("Ignoring restart action: {}", e);
            None
        }
    }
}
