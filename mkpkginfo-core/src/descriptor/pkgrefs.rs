// mkpkginfo-core/src/descriptor/pkgrefs.rs
//! Receipts from `PackageInfo` and `Distribution` XML documents.

use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::Receipt;
use tracing::{debug, trace};
use url::Url;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

#[derive(Debug, Default)]
struct PkgInfoElement {
    identifier: Option<String>,
    version: Option<String>,
    install_kbytes: Option<u64>,
}

#[derive(Debug, Default)]
struct PkgRefElement {
    id: Option<String>,
    version: Option<String>,
    install_kbytes: Option<u64>,
    text: String,
}

/// Merged view of every `pkg-ref` sharing one identifier.
#[derive(Debug)]
struct PkgRefEntry {
    id: String,
    version: Option<String>,
    install_kbytes: Option<u64>,
    file: Option<PathBuf>,
}

fn attr<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
        .filter(|v| !v.is_empty())
}

fn kbytes(attributes: &[OwnedAttribute]) -> Option<u64> {
    attr(attributes, "installKBytes").and_then(|v| v.trim().parse().ok())
}

fn scan(xml: &[u8]) -> std::result::Result<(Vec<PkgInfoElement>, Vec<PkgRefElement>), String> {
    let mut infos = Vec::new();
    let mut refs = Vec::new();
    let mut open_info: Option<PkgInfoElement> = None;
    let mut open_ref: Option<PkgRefElement> = None;

    for event in EventReader::new(xml) {
        match event.map_err(|e| e.to_string())? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => match name.local_name.as_str() {
                "pkg-info" => {
                    open_info = Some(PkgInfoElement {
                        identifier: attr(&attributes, "identifier").map(String::from),
                        version: attr(&attributes, "version").map(String::from),
                        install_kbytes: None,
                    });
                }
                "payload" => {
                    if let Some(info) = open_info.as_mut() {
                        info.install_kbytes = info.install_kbytes.or_else(|| kbytes(&attributes));
                    }
                }
                "pkg-ref" => {
                    open_ref = Some(PkgRefElement {
                        id: attr(&attributes, "id").map(String::from),
                        version: attr(&attributes, "version").map(String::from),
                        install_kbytes: kbytes(&attributes),
                        text: String::new(),
                    });
                }
                _ => {}
            },
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let Some(r) = open_ref.as_mut() {
                    r.text.push_str(&text);
                }
            }
            XmlEvent::EndElement { name } => match name.local_name.as_str() {
                "pkg-info" => infos.extend(open_info.take()),
                "pkg-ref" => refs.extend(open_ref.take()),
                _ => {}
            },
            _ => {}
        }
    }
    Ok((infos, refs))
}

/// Resolves a percent-encoded relative reference against `base_dir`.
fn resolve_relative(base_dir: &Path, relative: &str) -> Option<PathBuf> {
    let absolute = fs::canonicalize(base_dir).ok()?;
    let base = Url::from_directory_path(&absolute).ok()?;
    base.join(relative).ok()?.to_file_path().ok()
}

/// The component package a `pkg-ref` body points at, if any.
///
/// `file:` references are relative to the directory holding the outer
/// package; `#name.pkg` references are relative to the XML document.
fn referenced_file(text: &str, xml_dir: &Path, package_dir: Option<&Path>) -> Option<PathBuf> {
    let text = text.trim();
    if !text.to_ascii_lowercase().ends_with(".pkg") {
        return None;
    }
    match text.strip_prefix("file:") {
        Some(rest) => resolve_relative(package_dir.unwrap_or(xml_dir), rest),
        None => resolve_relative(xml_dir, text.trim_start_matches('#')),
    }
}

/// Receipts declared by a `PackageInfo` or `Distribution` document.
///
/// `pkg-info` elements win when present. Otherwise `pkg-ref` elements are
/// merged by id; a ref that names an existing component package is expanded
/// through `resolve`, falling back to the ref's own version.
pub fn parse_pkg_refs(
    xml_path: &Path,
    package: Option<&Path>,
    resolve: &dyn Fn(&Path) -> Vec<Receipt>,
) -> Result<Vec<Receipt>> {
    let xml = fs::read(xml_path)?;
    let (infos, refs) = scan(&xml)
        .map_err(|e| MkPkgInfoError::Xml(xml_path.display().to_string(), e))?;
    debug!(
        "{}: {} pkg-info and {} pkg-ref element(s)",
        xml_path.display(),
        infos.len(),
        refs.len()
    );

    let mut receipts: Vec<Receipt> = Vec::new();
    if !infos.is_empty() {
        for info in infos {
            let (Some(id), Some(version)) = (info.identifier, info.version) else {
                continue;
            };
            let mut receipt = Receipt::new(id, version);
            receipt.installed_size = info.install_kbytes;
            if !receipts.contains(&receipt) {
                receipts.push(receipt);
            }
        }
        return Ok(receipts);
    }

    let xml_dir = xml_path.parent().unwrap_or_else(|| Path::new("."));
    let package_dir = package.and_then(Path::parent);
    let mut entries: Vec<PkgRefEntry> = Vec::new();
    for element in refs {
        let Some(id) = element.id else { continue };
        let index = match entries.iter().position(|e| e.id == id) {
            Some(index) => index,
            None => {
                entries.push(PkgRefEntry {
                    id,
                    version: None,
                    install_kbytes: None,
                    file: None,
                });
                entries.len() - 1
            }
        };
        let entry = &mut entries[index];
        if element.version.is_some() {
            entry.version = element.version;
        }
        if element.install_kbytes.is_some() {
            entry.install_kbytes = element.install_kbytes;
        }
        if let Some(file) = referenced_file(&element.text, xml_dir, package_dir) {
            entry.file = Some(file);
        }
    }

    for entry in entries {
        if let Some(file) = entry.file.as_deref().filter(|f| f.exists()) {
            let nested = resolve(file);
            if !nested.is_empty() {
                trace!("{} expanded to {} receipt(s)", file.display(), nested.len());
                receipts.extend(nested);
                continue;
            }
        }
        let Some(version) = entry.version else {
            trace!("pkg-ref {} carries no version; skipped", entry.id);
            continue;
        };
        let mut receipt = Receipt::new(entry.id, version);
        receipt.installed_size = entry.install_kbytes;
        receipt.filename = entry
            .file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        receipts.push(receipt);
    }
    Ok(receipts)
}
