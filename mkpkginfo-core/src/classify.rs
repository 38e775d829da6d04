// mkpkginfo-core/src/classify.rs
use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_common::model::ItemKind;

use crate::backend::PlistReader;
use crate::plists::string_value;

const DESCRIPTOR_SUFFIXES: [&str; 2] = ["Info.plist", "version.plist"];

/// Decides what kind of item `path` is. Rules are checked in priority order;
/// the first match wins and the answer never depends on whether the nested
/// metadata turns out to be readable.
pub fn classify(path: &Path, plists: &dyn PlistReader) -> ItemKind {
    if is_application(path, plists) {
        ItemKind::Application
    } else if bundle_info_plist(path).is_some() {
        ItemKind::Bundle
    } else if is_descriptor_document(path) {
        ItemKind::Plist
    } else {
        ItemKind::File
    }
}

/// Symbolic links are never applications. Otherwise a `.app` extension
/// decides; an extensionless bundle counts when its `Info.plist` declares
/// package type `APPL` or its bundle executable exists under
/// `Contents/MacOS`.
pub fn is_application(path: &Path, plists: &dyn PlistReader) -> bool {
    if fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink()) {
        return false;
    }
    let has_app_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("app"));
    if has_app_extension {
        return true;
    }
    if !path.is_dir() {
        return false;
    }

    let info_plist = path.join("Contents/Info.plist");
    if !info_plist.is_file() {
        return false;
    }
    let Ok(info) = plists.read_dict(&info_plist) else {
        return false;
    };
    if string_value(&info, "CFBundlePackageType").as_deref() == Some("APPL") {
        return true;
    }
    string_value(&info, "CFBundleExecutable")
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .is_some_and(|exe| path.join("Contents/MacOS").join(exe).exists())
}

/// The bundle's own `Info.plist`, under `Contents/` for macOS-style bundles or
/// `Resources/` for the older flat layout.
pub fn bundle_info_plist(path: &Path) -> Option<PathBuf> {
    ["Contents/Info.plist", "Resources/Info.plist"]
        .iter()
        .map(|rel| path.join(rel))
        .find(|candidate| candidate.is_file())
}

pub fn is_descriptor_document(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| DESCRIPTOR_SUFFIXES.iter().any(|s| name.ends_with(s)))
}
