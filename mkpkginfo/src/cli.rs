// mkpkginfo/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use mkpkginfo_core::{validate_symbolic_mode, ScriptPaths, SynthesisRequest};

#[derive(Parser, Debug)]
#[command(author, version, name = "mkpkginfo", bin_name = "mkpkginfo")]
#[command(
    about = "Print catalog info for a package, metapackage or disk image",
    long_about = "Inspects an installer item (.pkg, .mpkg or .dmg) and prints its catalog \
                  info as an XML property list on standard output."
)]
pub struct CliArgs {
    /// The installer item to describe
    #[arg(value_name = "INSTALLER_ITEM")]
    pub installer_item: PathBuf,

    /// Also record PATH as an installed item (repeatable)
    #[arg(short = 'f', long = "file", value_name = "PATH", action = ArgAction::Append)]
    pub files: Vec<PathBuf>,

    /// Package inside the disk image to inspect, relative to its root
    #[arg(short = 'p', long = "pkgname", value_name = "SUBPATH")]
    pub pkgname: Option<String>,

    /// Item inside the disk image to install by copying
    #[arg(short = 'i', long = "itemname", visible_alias = "appname", value_name = "NAME")]
    pub itemname: Option<String>,

    #[arg(long = "displayname", value_name = "TEXT")]
    pub display_name: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Where a copied item is installed [default: /Applications]
    #[arg(short = 'd', long = "destinationpath", value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// Owner of the copied item
    #[arg(short, long, value_name = "USER")]
    pub owner: Option<String>,

    /// Group of the copied item
    #[arg(short, long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Symbolic chmod mode for the copied item, e.g. "go-w" or "u+rwX,go=rX"
    #[arg(short, long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<String>,

    /// Catalog to list the item in (repeatable)
    #[arg(short = 'c', long = "catalog", value_name = "NAME", action = ArgAction::Append)]
    pub catalogs: Vec<String>,

    #[arg(long = "preinstall_script", value_name = "PATH")]
    pub preinstall_script: Option<PathBuf>,

    #[arg(long = "postinstall_script", value_name = "PATH")]
    pub postinstall_script: Option<PathBuf>,

    #[arg(long = "preuninstall_script", value_name = "PATH")]
    pub preuninstall_script: Option<PathBuf>,

    #[arg(long = "postuninstall_script", value_name = "PATH")]
    pub postuninstall_script: Option<PathBuf>,

    /// Script that uninstalls the item; replaces receipt-based removal
    #[arg(long = "uninstall_script", value_name = "PATH")]
    pub uninstall_script: Option<PathBuf>,

    /// Use the legacy appdmg installer type for drag-and-drop images
    #[arg(long)]
    pub appdmg: bool,

    /// Disk image holding the item's uninstaller
    #[arg(short = 'U', long = "uninstallerdmg", value_name = "PATH")]
    pub uninstaller_dmg: Option<PathBuf>,

    /// Record applications and bundles without a version as plain files
    #[arg(long)]
    pub demote_unversioned_bundles: bool,

    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_mode(raw: &str) -> Result<String, String> {
    validate_symbolic_mode(raw).map_err(|e| e.to_string())
}

impl CliArgs {
    pub fn into_request(self) -> SynthesisRequest {
        SynthesisRequest {
            installer_item: self.installer_item,
            installs: self.files,
            package_hint: self.pkgname,
            item_name: self.itemname,
            display_name: self.display_name,
            description: self.description,
            destination: self.destination,
            owner: self.owner,
            group: self.group,
            mode: self.mode,
            catalogs: self.catalogs,
            scripts: ScriptPaths {
                preinstall: self.preinstall_script,
                postinstall: self.postinstall_script,
                preuninstall: self.preuninstall_script,
                postuninstall: self.postuninstall_script,
                uninstall: self.uninstall_script,
            },
            legacy_appdmg: self.appdmg,
            uninstaller_image: self.uninstaller_dmg,
            demote_unversioned_bundles: self.demote_unversioned_bundles,
        }
    }
}
