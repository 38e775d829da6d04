// mkpkginfo-core/src/inspect.rs
use std::path::Path;

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::{CatalogInfo, Receipt};
use tracing::debug;

use crate::backend::PackageReader;
use crate::version::{highest, split_name_version};

/// Builds the package-derived part of a catalog record.
///
/// Name and version come from the file name, refined by the receipts: a bare
/// name falls back to the highest receipt version, and a file-name version
/// that is a prefix of the highest receipt version yields to the more precise
/// receipt value.
pub fn inspect_package(path: &Path, reader: &dyn PackageReader) -> Result<CatalogInfo> {
    let descriptor = reader.read_package(path)?;
    if descriptor.receipts.is_empty() && !descriptor.has_installer_fields() {
        return Err(MkPkgInfoError::UnreadableArtifact(format!(
            "{}: no receipts or installer metadata could be read",
            path.display()
        )));
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (base, token) = split_name_version(&stem);
    let name = if base.is_empty() { stem.clone() } else { base };

    let top_receipt_version = highest(descriptor.receipts.iter().map(|r| r.version.as_str()));
    let version = match (token.is_empty(), top_receipt_version) {
        (true, top) => top.map(str::to_string),
        (false, Some(top)) if top.starts_with(&token) => Some(top.to_string()),
        (false, _) => Some(token),
    };
    debug!(
        "Inspected {}: name={}, version={:?}, {} receipt(s)",
        path.display(),
        name,
        version,
        descriptor.receipts.len()
    );

    let mut info = CatalogInfo::named(name);
    info.version = version;
    info.display_name = descriptor.display_name;
    info.description = descriptor.description;
    info.restart_action = descriptor.restart_action;
    info.installed_size = installed_size(descriptor.installed_size, &descriptor.receipts);
    info.receipts = descriptor.receipts;
    Ok(info)
}

/// A positive installer-declared size wins over the receipt sum.
fn installed_size(declared: Option<u64>, receipts: &[Receipt]) -> Option<u64> {
    match declared {
        Some(kb) if kb > 0 => Some(kb),
        _ => {
            let sum: u64 = receipts.iter().filter_map(|r| r.installed_size).sum();
            (sum > 0).then_some(sum)
        }
    }
}
