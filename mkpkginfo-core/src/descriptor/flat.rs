// mkpkginfo-core/src/descriptor/flat.rs
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_aio::run_command;
use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::Receipt;
use tracing::{debug, warn};

use super::{pkgrefs, SystemPackageReader};

const XAR: &str = "/usr/bin/xar";

/// Receipts of a flat (xar) package.
///
/// The archive is expanded without its payload into a scratch directory that
/// is removed on return. `PackageInfo` is read first, then `Distribution`,
/// then any expanded component packages at the top level.
pub(crate) fn flat_package_receipts(
    pkg: &Path,
    reader: &SystemPackageReader,
) -> Result<Vec<Receipt>> {
    let pkg = fs::canonicalize(pkg)?;
    fs::create_dir_all(&reader.scratch_dir)?;
    let scratch = tempfile::Builder::new()
        .prefix("mkpkginfo-")
        .tempdir_in(&reader.scratch_dir)?;

    let args = [
        OsStr::new("-xf"),
        pkg.as_os_str(),
        OsStr::new("--exclude"),
        OsStr::new("Payload"),
        OsStr::new("-C"),
        scratch.path().as_os_str(),
    ];
    let out = run_command(XAR, &args, None, reader.timeout)?;
    if !out.status.success() {
        return Err(MkPkgInfoError::CommandExec(format!(
            "xar could not expand {}: {}",
            pkg.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let receipts = expanded_receipts(scratch.path(), &pkg, reader);
    debug!("{} receipt(s) in flat package {}", receipts.len(), pkg.display());
    Ok(receipts)
}

fn expanded_receipts(root: &Path, pkg: &Path, reader: &SystemPackageReader) -> Vec<Receipt> {
    let resolve = |p: &Path| reader.receipts_for(p);
    let read = |document: PathBuf, package: Option<&Path>| {
        pkgrefs::parse_pkg_refs(&document, package, &resolve).unwrap_or_else(|e| {
            warn!("{}", e);
            Vec::new()
        })
    };

    let package_info = root.join("PackageInfo");
    if package_info.is_file() {
        let receipts = read(package_info, None);
        if !receipts.is_empty() {
            return receipts;
        }
    }

    let distribution = root.join("Distribution");
    if distribution.is_file() {
        let receipts = read(distribution, Some(pkg));
        if !receipts.is_empty() {
            return receipts;
        }
    }

    let mut components: Vec<PathBuf> = match fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .filter(|p| {
                p.extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("pkg"))
            })
            .collect(),
        Err(e) => {
            warn!("Could not list {}: {}", root.display(), e);
            Vec::new()
        }
    };
    components.sort();
    components
        .iter()
        .flat_map(|component| reader.receipts_for(component))
        .collect()
}
