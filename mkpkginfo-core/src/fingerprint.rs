// mkpkginfo-core/src/fingerprint.rs
use std::path::Path;

use mkpkginfo_aio::{is_regular_file, md5_file};
use mkpkginfo_common::model::{ItemFingerprint, ItemKind};
use plist::Dictionary;
use tracing::{debug, warn};

use crate::backend::PlistReader;
use crate::classify::{bundle_info_plist, classify};
use crate::plists::{minimum_os, short_version, string_value};

#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintOptions {
    /// Turn applications and bundles with no version into checksummed plain
    /// items instead of keeping their kind.
    pub demote_unversioned_bundles: bool,
}

/// Fingerprints one installed item so its presence and version can be
/// checked later. Unreadable metadata is logged and skipped; this never fails.
pub fn fingerprint(
    path: &Path,
    plists: &dyn PlistReader,
    options: FingerprintOptions,
) -> ItemFingerprint {
    let kind = classify(path, plists);
    let mut item = ItemFingerprint::new(kind, path.to_string_lossy());

    let document = match kind {
        ItemKind::Application => Some(path.join("Contents/Info.plist")),
        ItemKind::Bundle => bundle_info_plist(path),
        ItemKind::Plist => Some(path.to_path_buf()),
        ItemKind::File => None,
    };
    if let Some(document) = document {
        match plists.read_dict(&document) {
            Ok(dict) => apply_descriptor(&mut item, &dict),
            Err(e) => warn!("Ignoring metadata of {}: {}", path.display(), e),
        }
    }

    if item.short_version.is_none() {
        match kind {
            ItemKind::Application | ItemKind::Bundle if !options.demote_unversioned_bundles => {
                warn!(
                    "{} has no version information; recording it as {} without one",
                    path.display(),
                    kind
                );
            }
            ItemKind::Application | ItemKind::Bundle => {
                warn!(
                    "{} has no version information; recording it as a plain file",
                    path.display()
                );
                demote_to_file(&mut item, path);
            }
            ItemKind::Plist | ItemKind::File => demote_to_file(&mut item, path),
        }
    }

    debug!("Fingerprinted {} as {}", path.display(), item.kind);
    item
}

fn apply_descriptor(item: &mut ItemFingerprint, dict: &Dictionary) {
    item.bundle_name = string_value(dict, "CFBundleName");
    item.bundle_identifier = string_value(dict, "CFBundleIdentifier");
    item.short_version = short_version(dict);
    item.minimum_os_version = minimum_os(dict);
}

/// Plain items carry a checksum only when they are regular files.
fn demote_to_file(item: &mut ItemFingerprint, path: &Path) {
    item.kind = ItemKind::File;
    if !is_regular_file(path) {
        return;
    }
    match md5_file(path) {
        Ok(sum) => item.checksum = Some(sum),
        Err(e) => warn!("Could not checksum {}: {}", path.display(), e),
    }
}
