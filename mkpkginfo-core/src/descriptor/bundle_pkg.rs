// mkpkginfo-core/src/descriptor/bundle_pkg.rs
//! Receipts of bundle-style `.pkg` / `.mpkg` directories.

use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_common::model::Receipt;
use plist::Dictionary;
use tracing::{debug, warn};

use super::{pkgrefs, SystemPackageReader};
use crate::backend::PlistReader;
use crate::plists::{package_version_string, string_value, unsigned_value};

/// Places a metapackage may keep its components when its Info.plist does
/// not say.
const DEFAULT_COMPONENT_DIRS: [&str; 6] = [
    "",
    "Contents",
    "Contents/Installers",
    "Contents/Packages",
    "Contents/Resources",
    "Contents/Resources/Packages",
];

const UNKNOWN_VERSION: &str = "0.0";
const UNVERSIONED_PACKAGE: &str = "0.0.0.0.0";
const UNKNOWN_NAME: &str = "UNKNOWN";

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn bundle_package_receipts(pkg: &Path, reader: &SystemPackageReader) -> Vec<Receipt> {
    if has_extension(pkg, "pkg") {
        if let Some(receipt) = single_package_receipt(pkg, &reader.plists) {
            return vec![receipt];
        }
    }

    let contents = pkg.join("Contents");
    if !contents.is_dir() {
        debug!("{} has no Contents directory", pkg.display());
        return Vec::new();
    }

    if let Some(dist) = sorted_entries(&contents)
        .into_iter()
        .find(|p| has_extension(p, "dist"))
    {
        let resolve = |p: &Path| reader.receipts_for(p);
        match pkgrefs::parse_pkg_refs(&dist, Some(&contents), &resolve) {
            Ok(receipts) => return receipts,
            Err(e) => warn!("{}", e),
        }
    }

    let declared_dir = reader
        .plists
        .read_dict(&contents.join("Info.plist"))
        .ok()
        .and_then(|dict| string_value(&dict, "IFPkgFlagComponentDirectory"));
    let search_dirs: Vec<PathBuf> = match declared_dir {
        // Declared relative to the bundle root, e.g. `Contents/Packages`.
        Some(dir) => vec![pkg.join(dir.trim_start_matches('/'))],
        None => DEFAULT_COMPONENT_DIRS.iter().map(|d| pkg.join(d)).collect(),
    };

    let mut receipts = Vec::new();
    for dir in search_dirs.iter().filter(|d| d.is_dir()) {
        for item in sorted_entries(dir) {
            if has_extension(&item, "pkg") {
                receipts.extend(single_package_receipt(&item, &reader.plists));
            } else if has_extension(&item, "mpkg") {
                receipts.extend(bundle_package_receipts(&item, reader));
            }
        }
    }
    receipts
}

/// The one receipt a component bundle package describes.
fn single_package_receipt(pkg: &Path, plists: &dyn PlistReader) -> Option<Receipt> {
    let name = file_name(pkg);
    let info_plist = pkg.join("Contents/Info.plist");
    if info_plist.is_file() {
        let receipt = match plists.read_dict(&info_plist) {
            Ok(dict) => receipt_from_info_plist(pkg, &name, &dict, plists),
            Err(e) => {
                warn!("{}", e);
                Receipt::new(format!("BAD PLIST in {name}"), UNKNOWN_VERSION)
            }
        };
        return Some(receipt.with_filename(name));
    }

    let info_file = legacy_info_file(pkg)?;
    let fields = read_info_file(&info_file);
    let mut receipt = Receipt::new(
        name.clone(),
        fields.version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
    );
    receipt.name = Some(fields.title.unwrap_or_else(|| UNKNOWN_NAME.to_string()));
    Some(receipt.with_filename(name))
}

fn receipt_from_info_plist(
    pkg: &Path,
    name: &str,
    dict: &Dictionary,
    plists: &dyn PlistReader,
) -> Receipt {
    let id = string_value(dict, "CFBundleIdentifier")
        .or_else(|| string_value(dict, "Bundle identifier"))
        .unwrap_or_else(|| name.to_string());

    let mut receipt = Receipt::new(id, extended_version(pkg, dict, plists));
    receipt.name = string_value(dict, "CFBundleName");
    receipt.installed_size = unsigned_value(dict, "IFPkgFlagInstalledSize");
    receipt
}

/// Package version from `Contents/version.plist`, then `Contents/Info.plist`,
/// then the `Version` line of a legacy `.info` file, taken as written.
fn extended_version(pkg: &Path, info: &Dictionary, plists: &dyn PlistReader) -> String {
    let version_plist = pkg.join("Contents/version.plist");
    let from_version_plist = if version_plist.is_file() {
        plists
            .read_dict(&version_plist)
            .ok()
            .and_then(|dict| package_version_string(&dict))
    } else {
        None
    };
    from_version_plist
        .or_else(|| package_version_string(info))
        .or_else(|| legacy_info_file(pkg).and_then(|f| read_info_file(&f).version))
        .unwrap_or_else(|| UNVERSIONED_PACKAGE.to_string())
}

/// `Contents/Resources/English.lproj/*.info`, the pre-Info.plist format.
fn legacy_info_file(pkg: &Path) -> Option<PathBuf> {
    let lproj = pkg.join("Contents/Resources/English.lproj");
    sorted_entries(&lproj)
        .into_iter()
        .find(|p| has_extension(p, "info") && p.is_file())
}

#[derive(Debug, Default, PartialEq)]
struct InfoFileFields {
    version: Option<String>,
    title: Option<String>,
}

/// Parses the whitespace-separated `Key Value` lines of a `.info` file.
fn read_info_file(path: &Path) -> InfoFileFields {
    let text = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return InfoFileFields::default();
        }
    };
    let mut fields = InfoFileFields::default();
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key {
            "Version" => fields.version = Some(value.to_string()),
            "Title" => fields.title = Some(value.to_string()),
            _ => {}
        }
    }
    fields
}
