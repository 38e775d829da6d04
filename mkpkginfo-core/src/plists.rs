// mkpkginfo-core/src/plists.rs
//! Property-list access: reading documents from disk, pulling the first plist
//! out of noisy tool output, and the handful of bundle keys we care about.

use std::io::Cursor;
use std::path::Path;

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use plist::{Dictionary, Value};
use tracing::debug;

use crate::backend::PlistReader;

/// Reads plists straight from the filesystem. Handles XML and binary forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePlistReader;

impl PlistReader for FilePlistReader {
    fn read_dict(&self, path: &Path) -> Result<Dictionary> {
        debug!("Reading property list {}", path.display());
        let value = Value::from_file(path).map_err(|e| {
            MkPkgInfoError::UnreadableDescriptor(path.display().to_string(), e.to_string())
        })?;
        value.into_dictionary().ok_or_else(|| {
            MkPkgInfoError::UnreadableDescriptor(
                path.display().to_string(),
                "top-level object is not a dictionary".to_string(),
            )
        })
    }
}

/// Extracts the first XML property list embedded in command output.
///
/// Tools such as `hdiutil` may print license text or progress lines around
/// the document; anything outside `<?xml ... </plist>` is ignored.
pub fn first_plist_in_output(output: &[u8]) -> Option<Dictionary> {
    let text = String::from_utf8_lossy(output);
    let start = text.find("<?xml")?;
    let end_tag = "</plist>";
    let end = text[start..].find(end_tag)? + start + end_tag.len();
    let document = &text[start..end];
    Value::from_reader_xml(Cursor::new(document.as_bytes()))
        .ok()?
        .into_dictionary()
}

/// A string-ish value for `key`. Integers and reals are rendered as text
/// since some vendors store versions as numbers.
pub fn string_value(dict: &Dictionary, key: &str) -> Option<String> {
    match dict.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        _ => None,
    }
    .filter(|s| !s.trim().is_empty())
}

pub fn unsigned_value(dict: &Dictionary, key: &str) -> Option<u64> {
    match dict.get(key)? {
        Value::Integer(i) => i.as_unsigned(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Marketing version of a bundle: the first word of
/// `CFBundleShortVersionString`, falling back to `CFBundleVersion`.
pub fn short_version(dict: &Dictionary) -> Option<String> {
    ["CFBundleShortVersionString", "CFBundleVersion"]
        .iter()
        .find_map(|key| string_value(dict, key))
        .and_then(|v| v.split_whitespace().next().map(str::to_string))
}

pub fn minimum_os(dict: &Dictionary) -> Option<String> {
    string_value(dict, "LSMinimumSystemVersion")
        .or_else(|| string_value(dict, "SystemVersionCheck:MinimumSystemVersion"))
}

/// Version string of a bundle-style package. Only values that start with a
/// digit count; decimal commas are normalized to periods.
///
/// Some packaging tools write the short version under the human-readable
/// key `Bundle versions string, short`; when present it is used instead of
/// `CFBundleShortVersionString`. `CFBundleVersion` is the last resort.
pub fn package_version_string(dict: &Dictionary) -> Option<String> {
    let first_word = |key: &str| {
        string_value(dict, key).and_then(|v| v.split_whitespace().next().map(str::to_string))
    };
    let usable = |v: &String| v.starts_with(|c: char| c.is_ascii_digit());

    first_word("Bundle versions string, short")
        .or_else(|| first_word("CFBundleShortVersionString"))
        .filter(usable)
        .or_else(|| first_word("CFBundleVersion").filter(usable))
        .map(|v| v.replace(',', "."))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn dict(pairs: &[(&str, Value)]) -> Dictionary {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn finds_plist_between_noise() {
        let output = b"Preparing imaging engine\n<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n<plist version=\"1.0\"><dict><key>Size</key><integer>42</integer></dict></plist>\ntrailing junk";
        let parsed = first_plist_in_output(output).unwrap();
        assert_eq!(unsigned_value(&parsed, "Size"), Some(42));
    }

    #[test]
    fn no_plist_in_output() {
        assert!(first_plist_in_output(b"hdiutil: attach failed").is_none());
    }

    #[test]
    fn short_version_prefers_marketing_version_first_word() {
        let d = dict(&[
            ("CFBundleShortVersionString", Value::String("2.3 (build 77)".into())),
            ("CFBundleVersion", Value::String("77".into())),
        ]);
        assert_eq!(short_version(&d).as_deref(), Some("2.3"));

        let d = dict(&[("CFBundleVersion", Value::Integer(5i64.into()))]);
        assert_eq!(short_version(&d).as_deref(), Some("5"));

        let d = dict(&[("CFBundleShortVersionString", Value::String("  ".into()))]);
        assert_eq!(short_version(&d), None);
    }

    #[test]
    fn minimum_os_falls_back_to_version_check_key() {
        let d = dict(&[(
            "SystemVersionCheck:MinimumSystemVersion",
            Value::String("10.6.8".into()),
        )]);
        assert_eq!(minimum_os(&d).as_deref(), Some("10.6.8"));
    }

    #[test]
    fn package_versions_must_start_with_a_digit() {
        let d = dict(&[
            ("CFBundleShortVersionString", Value::String("Release".into())),
            ("CFBundleVersion", Value::String("1,5".into())),
        ]);
        assert_eq!(package_version_string(&d).as_deref(), Some("1.5"));
        assert_eq!(package_version_string(&Dictionary::new()), None);
    }

    #[test]
    fn readable_short_version_key_takes_precedence() {
        let d = dict(&[
            ("CFBundleShortVersionString", Value::String("1.0".into())),
            ("Bundle versions string, short", Value::String("1.0.2 (b4)".into())),
            ("CFBundleVersion", Value::String("104".into())),
        ]);
        assert_eq!(package_version_string(&d).as_deref(), Some("1.0.2"));

        // An unusable override falls through to CFBundleVersion, not to the
        // shadowed CFBundleShortVersionString.
        let d = dict(&[
            ("CFBundleShortVersionString", Value::String("1.0".into())),
            ("Bundle versions string, short", Value::String("beta".into())),
            ("CFBundleVersion", Value::String("3,2".into())),
        ]);
        assert_eq!(package_version_string(&d).as_deref(), Some("3.2"));
    }

    #[test]
    fn reading_a_non_plist_is_an_unreadable_descriptor() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Info.plist");
        std::fs::write(&path, "not a plist").unwrap();
        assert!(matches!(
            FilePlistReader.read_dict(&path),
            Err(MkPkgInfoError::UnreadableDescriptor(_, _))
        ));
    }
}
