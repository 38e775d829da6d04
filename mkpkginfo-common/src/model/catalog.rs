// mkpkginfo-common/src/model/catalog.rs
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fingerprint::ItemFingerprint;
use super::receipt::Receipt;

/// Version written when nothing better could be inferred.
pub const UNVERSIONED_PLACEHOLDER: &str = "1.0.0.0.0 (Please edit me!)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallerType {
    #[serde(rename = "copy_from_dmg")]
    CopyFromDmg,
    #[serde(rename = "appdmg")]
    AppDmg,
    AdobeUberInstaller,
    AdobeSetup,
    AdobeAcrobatUpdater,
    #[serde(rename = "AdobeCS5Installer")]
    AdobeCs5Installer,
    #[serde(rename = "AdobeCS5PatchInstaller")]
    AdobeCs5PatchInstaller,
    #[serde(rename = "AdobeCS5AAMEEPackage")]
    AdobeCs5AameePackage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UninstallMethod {
    #[serde(rename = "removepackages")]
    RemovePackages,
    #[serde(rename = "uninstall_script")]
    UninstallScript,
    #[serde(rename = "remove_copied_items")]
    RemoveCopiedItems,
    #[serde(rename = "remove_app")]
    RemoveApp,
    AdobeUberUninstaller,
    AdobeSetup,
    #[serde(rename = "AdobeCS5AAMEEPackage")]
    AdobeCs5AameePackage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RestartAction {
    RequireRestart,
    RecommendRestart,
    RequireLogout,
    RequireShutdown,
}

impl FromStr for RestartAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RequireRestart" => Ok(RestartAction::RequireRestart),
            "RecommendRestart" => Ok(RestartAction::RecommendRestart),
            "RequireLogout" => Ok(RestartAction::RequireLogout),
            "RequireShutdown" => Ok(RestartAction::RequireShutdown),
            other => Err(format!("unknown restart action '{other}'")),
        }
    }
}

/// One drag-and-drop copy directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ItemToCopy {
    pub source_item: String,
    pub destination_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// The synthesized metadata record for one installer item.
///
/// Fields map one-to-one onto keys of the emitted property list; unset
/// optional fields and empty lists are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CatalogInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_type: Option<InstallerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_item_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_item_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_item_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstaller_item_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstaller_item_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstaller_item_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_path: Option<String>,

    pub catalogs: Vec<String>,
    pub autoremove: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_os_version: Option<String>,
    #[serde(rename = "RestartAction", skip_serializing_if = "Option::is_none")]
    pub restart_action: Option<RestartAction>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub receipts: Vec<Receipt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub installs: Vec<ItemFingerprint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items_to_copy: Vec<ItemToCopy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstallable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstall_method: Option<UninstallMethod>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preinstall_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postinstall_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preuninstall_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postuninstall_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstall_script: Option<String>,
}

impl CatalogInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_uninstall(&mut self, method: UninstallMethod) {
        self.uninstallable = Some(true);
        self.uninstall_method = Some(method);
    }

    /// Serializes the record as an XML property list.
    pub fn to_xml_plist(&self) -> Result<Vec<u8>, plist::Error> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::fingerprint::ItemKind;

    #[test]
    fn keys_use_catalog_names() {
        let mut info = CatalogInfo::named("Foo");
        info.version = Some("1.2".into());
        info.restart_action = Some(RestartAction::RequireRestart);
        info.receipts.push(Receipt::new("com.example.foo", "1.2"));
        info.set_uninstall(UninstallMethod::RemovePackages);

        let xml = String::from_utf8(info.to_xml_plist().unwrap()).unwrap();
        assert!(xml.contains("<key>RestartAction</key>"));
        assert!(xml.contains("<string>RequireRestart</string>"));
        assert!(xml.contains("<key>packageid</key>"));
        assert!(xml.contains("<string>removepackages</string>"));
        assert!(!xml.contains("installs"));
        assert!(!xml.contains("display_name"));
    }

    #[test]
    fn minimum_os_of_installs_is_never_emitted() {
        let mut item = ItemFingerprint::new(ItemKind::Application, "/Applications/Foo.app");
        item.short_version = Some("1.0".into());
        item.minimum_os_version = Some("10.5".into());
        let mut info = CatalogInfo::named("Foo");
        info.installs.push(item);

        let xml = String::from_utf8(info.to_xml_plist().unwrap()).unwrap();
        assert!(xml.contains("<key>CFBundleShortVersionString</key>"));
        assert!(xml.contains("<string>application</string>"));
        assert!(!xml.contains("10.5"));
    }

    #[test]
    fn script_bodies_round_trip_byte_for_byte() {
        let script = "#!/bin/sh\n# <tags> & \"quotes\" 'single'\n\tif [ -d /tmp ]; then\n  echo ü ✓\nfi\n\n";
        let mut info = CatalogInfo::named("Foo");
        info.version = Some("1.0".into());
        info.postinstall_script = Some(script.to_string());
        info.uninstall_script = Some(String::new());

        let xml = info.to_xml_plist().unwrap();
        let back: CatalogInfo = plist::from_bytes(&xml).unwrap();

        assert_eq!(back.postinstall_script.as_deref(), Some(script));
        assert_eq!(back.uninstall_script.as_deref(), Some(""));
        assert_eq!(back.name, "Foo");
    }

    #[test]
    fn restart_action_parses_known_values() {
        assert_eq!(
            "RecommendRestart\n".parse::<RestartAction>().unwrap(),
            RestartAction::RecommendRestart
        );
        assert!("None".parse::<RestartAction>().is_err());
    }
}
