// mkpkginfo-core/src/synth.rs
//! The top-level catalog info pipeline.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use mkpkginfo_aio::{is_regular_file, read_script, sha256_file, tree_size_bytes};
use mkpkginfo_common::config::{Config, RECEIPTS_DIR, REPO_PKGS_SEGMENT};
use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::{
    ArtifactKind, CatalogInfo, InstallerArtifact, ItemFingerprint, UninstallMethod,
    NOT_A_FILE_HASH, UNVERSIONED_PLACEHOLDER,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, PlistReader};
use crate::container::{resolve_disk_image, ContainerOptions};
use crate::fingerprint::{fingerprint, FingerprintOptions};
use crate::inspect::inspect_package;
use crate::mode::validate_symbolic_mode;
use crate::version::{highest, lowest};

#[derive(Debug, Clone, Default)]
pub struct ScriptPaths {
    pub preinstall: Option<PathBuf>,
    pub postinstall: Option<PathBuf>,
    pub preuninstall: Option<PathBuf>,
    pub postuninstall: Option<PathBuf>,
    pub uninstall: Option<PathBuf>,
}

/// Everything the operator asked for in one run.
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    pub installer_item: PathBuf,
    /// Extra installed items to fingerprint; these replace any installs the
    /// installer item itself produced.
    pub installs: Vec<PathBuf>,
    pub package_hint: Option<String>,
    pub item_name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub destination: Option<PathBuf>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<String>,
    pub catalogs: Vec<String>,
    pub scripts: ScriptPaths,
    pub legacy_appdmg: bool,
    pub uninstaller_image: Option<PathBuf>,
    pub demote_unversioned_bundles: bool,
}

#[derive(Debug, Default)]
struct ScriptBodies {
    preinstall: Option<String>,
    postinstall: Option<String>,
    preuninstall: Option<String>,
    postuninstall: Option<String>,
    uninstall: Option<String>,
}

impl ScriptBodies {
    fn read(paths: &ScriptPaths, limit: u64) -> Result<Self> {
        let read = |path: &Option<PathBuf>| {
            path.as_deref()
                .map(|p| read_script(p, limit))
                .transpose()
        };
        Ok(Self {
            preinstall: read(&paths.preinstall)?,
            postinstall: read(&paths.postinstall)?,
            preuninstall: read(&paths.preuninstall)?,
            postuninstall: read(&paths.postuninstall)?,
            uninstall: read(&paths.uninstall)?,
        })
    }

    fn apply(self, info: &mut CatalogInfo) {
        let targets = [
            (self.preinstall, &mut info.preinstall_script),
            (self.postinstall, &mut info.postinstall_script),
            (self.preuninstall, &mut info.preuninstall_script),
            (self.postuninstall, &mut info.postuninstall_script),
        ];
        for (body, field) in targets {
            if body.is_some() {
                *field = body;
            }
        }
        if let Some(body) = self.uninstall {
            info.uninstall_script = Some(body);
            info.set_uninstall(UninstallMethod::UninstallScript);
        }
    }
}

/// Drops trailing separators and `.` components.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn require_existing(path: &Path, what: &str) -> Result<()> {
    fs::symlink_metadata(path).map(|_| ()).map_err(|_| {
        MkPkgInfoError::Usage(format!("{} {} does not exist", what, path.display()))
    })
}

/// Produces the catalog record for one installer item.
pub fn synthesize(
    request: &SynthesisRequest,
    backend: &Backend,
    config: &Config,
) -> Result<CatalogInfo> {
    let item = normalize(&request.installer_item);
    let kind = ArtifactKind::from_path(&item).ok_or_else(|| {
        MkPkgInfoError::UnsupportedArtifact(format!(
            "{} is not a package, metapackage or disk image",
            item.display()
        ))
    })?;
    require_existing(&item, "Installer item")?;

    // Operator input is validated before anything gets mounted.
    let mode = request
        .mode
        .as_deref()
        .map(validate_symbolic_mode)
        .transpose()?;
    let uninstaller = request.uninstaller_image.as_deref().map(normalize);
    if let Some(uninstaller) = &uninstaller {
        require_existing(uninstaller, "Uninstaller item")?;
    }
    let scripts = ScriptBodies::read(&request.scripts, config.script_size_limit)?;
    let fingerprint_options = FingerprintOptions {
        demote_unversioned_bundles: request.demote_unversioned_bundles
            || config.demote_unversioned_bundles,
    };

    info!("Inspecting {} {}", kind, item.display());
    let mut info = match kind {
        ArtifactKind::Package | ArtifactKind::MultiPackage => {
            inspect_package(&item, backend.packages.as_ref())?
        }
        ArtifactKind::DiskImage => {
            let options = ContainerOptions {
                package_hint: request.package_hint.clone(),
                item_name: request.item_name.clone(),
                legacy_appdmg: request.legacy_appdmg,
                destination: request
                    .destination
                    .clone()
                    .unwrap_or_else(|| config.default_destination.clone()),
                owner: request.owner.clone(),
                group: request.group.clone(),
                mode,
                fingerprint: fingerprint_options,
            };
            resolve_disk_image(&item, &options, backend)?
        }
    };

    if let Some(display_name) = &request.display_name {
        info.display_name = Some(display_name.clone());
    }
    if let Some(description) = &request.description {
        info.description = Some(description.clone());
    }

    let artifact = measure_artifact(kind, &item)?;
    info.installer_item_size = Some(artifact.size_kbytes());
    info.installer_item_hash = Some(artifact.digest);
    info.installer_item_location = Some(repo_relative_location(&item));

    if let Some(uninstaller) = &uninstaller {
        let measured = measure_artifact(ArtifactKind::DiskImage, uninstaller)?;
        info.uninstaller_item_size = Some(measured.size_kbytes());
        info.uninstaller_item_hash = Some(measured.digest);
        info.uninstaller_item_location = Some(repo_relative_location(uninstaller));
    }

    let requested = if request.catalogs.is_empty() {
        &config.default_catalogs
    } else {
        &request.catalogs
    };
    info.catalogs = unique_catalogs(requested);

    let extra = fingerprint_installs(&request.installs, backend.plists.as_ref(), fingerprint_options);
    if !extra.is_empty() {
        if !info.installs.is_empty() {
            debug!("Replacing {} discovered install item(s)", info.installs.len());
        }
        info.installs = extra;
    }

    if !info.receipts.is_empty() {
        info.set_uninstall(UninstallMethod::RemovePackages);
    }

    info.minimum_os_version = Some(
        lowest(
            info.installs
                .iter()
                .filter_map(|i| i.minimum_os_version.as_deref()),
        )
        .map(String::from)
        .unwrap_or_else(|| config.minimum_os_floor.clone()),
    );

    if info.version.as_deref().is_none_or(|v| v.trim().is_empty()) {
        info.version = Some(
            highest(info.installs.iter().filter_map(|i| i.short_version.as_deref()))
                .map(String::from)
                .unwrap_or_else(|| {
                    warn!("No version could be determined; edit the placeholder");
                    UNVERSIONED_PLACEHOLDER.to_string()
                }),
        );
    }

    scripts.apply(&mut info);
    info.autoremove = false;
    Ok(info)
}

/// Catalog names in first-seen order, repeats dropped.
fn unique_catalogs(names: &[String]) -> Vec<String> {
    let mut catalogs: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !catalogs.contains(name) {
            catalogs.push(name.clone());
        }
    }
    catalogs
}

/// Size and digest of an installer item.
pub fn measure_artifact(kind: ArtifactKind, path: &Path) -> Result<InstallerArtifact> {
    let size_bytes = tree_size_bytes(path)?;
    let digest = if is_regular_file(path) {
        sha256_file(path)?
    } else {
        NOT_A_FILE_HASH.to_string()
    };
    Ok(InstallerArtifact {
        kind,
        path: path.to_path_buf(),
        size_bytes,
        digest,
    })
}

/// Location relative to the nearest ancestor directory named `pkgs`, or the
/// bare file name when there is none.
pub fn repo_relative_location(path: &Path) -> String {
    path.ancestors()
        .skip(1)
        .find(|ancestor| ancestor.file_name() == Some(OsStr::new(REPO_PKGS_SEGMENT)))
        .and_then(|pkgs| path.strip_prefix(pkgs).ok())
        .map(|rest| rest.to_string_lossy().into_owned())
        .unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

fn fingerprint_installs(
    paths: &[PathBuf],
    plists: &dyn PlistReader,
    options: FingerprintOptions,
) -> Vec<ItemFingerprint> {
    let mut installs = Vec::new();
    for raw in paths {
        let path = normalize(raw);
        if path.starts_with(RECEIPTS_DIR) {
            warn!("{} appears to be a receipt; skipping it", path.display());
            continue;
        }
        if fs::symlink_metadata(&path).is_err() {
            warn!(
                "{}; skipping it",
                MkPkgInfoError::MissingAuxiliaryItem(path.display().to_string())
            );
            continue;
        }
        installs.push(fingerprint(&path, plists, options));
    }
    installs
}

#[cfg(test)]
mod tests {
    use mkpkginfo_common::model::{InstallerType, ItemKind, Receipt, RestartAction};
    use plist::{Dictionary, Value};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::backend::PackageDescriptor;
    use crate::testutil::{write_app, TestBackend};

    fn app_with_min_os(dir: &Path, name: &str, version: &str, min_os: &str) -> PathBuf {
        let app = write_app(dir, name, version);
        let plist_path = app.join("Contents/Info.plist");
        let mut dict: Dictionary = Value::from_file(&plist_path)
            .unwrap()
            .into_dictionary()
            .unwrap();
        dict.insert(
            "LSMinimumSystemVersion".into(),
            Value::String(min_os.into()),
        );
        Value::Dictionary(dict).to_file_xml(&plist_path).unwrap();
        app
    }

    fn request(item: &Path) -> SynthesisRequest {
        SynthesisRequest {
            installer_item: item.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn application_disk_image_end_to_end() {
        let repo = TempDir::new().unwrap();
        let image = repo.path().join("pkgs/apps/Foo-1.2.3.dmg");
        fs::create_dir_all(image.parent().unwrap()).unwrap();
        fs::write(&image, vec![b'x'; 4096]).unwrap();
        let volume = TempDir::new().unwrap();
        app_with_min_os(volume.path(), "Foo.app", "1.2.3", "10.7");
        let t = TestBackend::new(volume.path());

        let info = synthesize(&request(&image), &t.backend, &Config::default()).unwrap();

        assert_eq!(info.name, "Foo");
        assert_eq!(info.version.as_deref(), Some("1.2.3"));
        assert_eq!(info.installer_type, Some(InstallerType::CopyFromDmg));
        assert_eq!(info.installer_item_size, Some(4));
        assert_eq!(
            info.installer_item_hash.as_deref(),
            Some(sha256_file(&image).unwrap().as_str())
        );
        assert_eq!(info.installer_item_location.as_deref(), Some("apps/Foo-1.2.3.dmg"));
        assert_eq!(info.catalogs, vec!["testing".to_string()]);
        assert_eq!(info.minimum_os_version.as_deref(), Some("10.7"));
        assert_eq!(info.installs.len(), 1);
        assert_eq!(info.installs[0].kind, ItemKind::Application);
        assert!(!info.autoremove);
        assert_eq!(t.attaches.get(), t.detaches.get());
    }

    #[test]
    fn package_receipts_force_removepackages() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Tool-2.0.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages.insert_descriptor(
            "Tool-2.0.pkg",
            PackageDescriptor {
                receipts: vec![Receipt::new("com.example.tool", "2.0.5").with_installed_size(300)],
                restart_action: Some(RestartAction::RecommendRestart),
                ..Default::default()
            },
        );
        let backend = t.rebuild();

        let info = synthesize(&request(&pkg), &backend, &Config::default()).unwrap();
        assert_eq!(info.name, "Tool");
        assert_eq!(info.version.as_deref(), Some("2.0.5"));
        assert_eq!(info.installed_size, Some(300));
        assert_eq!(info.uninstallable, Some(true));
        assert_eq!(info.uninstall_method, Some(UninstallMethod::RemovePackages));
        assert_eq!(info.restart_action, Some(RestartAction::RecommendRestart));
        assert_eq!(info.installer_item_location.as_deref(), Some("Tool-2.0.pkg"));
        assert_eq!(info.minimum_os_version.as_deref(), Some("10.4.0"));
        assert_eq!(t.attaches.get(), 0);
    }

    #[test]
    fn uninstall_script_beats_receipts() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Tool.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let script = dir.path().join("uninstall.sh");
        fs::write(&script, "#!/bin/sh\nrm -rf /Applications/Tool.app\n").unwrap();
        let post = dir.path().join("post.sh");
        fs::write(&post, "#!/bin/sh\ntouch /tmp/done\n").unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages
            .insert("Tool.pkg", vec![Receipt::new("com.example.tool", "1.0")]);
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.scripts.uninstall = Some(script);
        req.scripts.postinstall = Some(post);
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        assert_eq!(info.uninstall_method, Some(UninstallMethod::UninstallScript));
        assert_eq!(
            info.uninstall_script.as_deref(),
            Some("#!/bin/sh\nrm -rf /Applications/Tool.app\n")
        );
        assert_eq!(
            info.postinstall_script.as_deref(),
            Some("#!/bin/sh\ntouch /tmp/done\n")
        );
        assert_eq!(info.preinstall_script, None);
    }

    #[test]
    fn extra_installs_replace_discovered_ones_and_drive_versions() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Suite.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let apps = TempDir::new().unwrap();
        let a = app_with_min_os(apps.path(), "Alpha.app", "2.10", "10.9");
        let b = app_with_min_os(apps.path(), "Beta.app", "2.9", "10.6.8");
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages.insert_descriptor(
            "Suite.pkg",
            PackageDescriptor {
                description: Some("Installer without receipts".into()),
                ..Default::default()
            },
        );
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.installs = vec![
            PathBuf::from(format!("{}/", a.display())),
            PathBuf::from("/Library/Receipts/Suite.pkg"),
            apps.path().join("Missing.app"),
            b,
        ];
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        let paths: Vec<&str> = info.installs.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                a.to_str().unwrap(),
                apps.path().join("Beta.app").to_str().unwrap()
            ]
        );
        assert_eq!(info.minimum_os_version.as_deref(), Some("10.6.8"));
        assert_eq!(info.version.as_deref(), Some("2.10"));
        assert_eq!(info.uninstallable, None);
    }

    #[test]
    fn unversioned_items_get_the_placeholder() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Thing.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages.insert_descriptor(
            "Thing.pkg",
            PackageDescriptor {
                display_name: Some("Thing".into()),
                ..Default::default()
            },
        );
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.display_name = Some("The Thing".into());
        req.description = Some("Does the thing".into());
        req.catalogs = vec!["production".into(), "testing".into()];
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        assert_eq!(info.version.as_deref(), Some(UNVERSIONED_PLACEHOLDER));
        assert_eq!(info.display_name.as_deref(), Some("The Thing"));
        assert_eq!(info.description.as_deref(), Some("Does the thing"));
        assert_eq!(info.catalogs, vec!["production".to_string(), "testing".to_string()]);
    }

    #[test]
    fn repeated_catalogs_keep_their_first_position() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Thing-1.0.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages
            .insert("Thing-1.0.pkg", vec![Receipt::new("com.example.thing", "1.0")]);
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.catalogs = ["testing", "production", "testing", "beta", "production"]
            .into_iter()
            .map(String::from)
            .collect();
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        assert_eq!(info.catalogs, vec!["testing", "production", "beta"]);
    }

    #[test]
    fn bundle_package_size_and_hash() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("Old.pkg");
        fs::create_dir_all(pkg.join("Contents/Resources")).unwrap();
        fs::write(pkg.join("Contents/Info.plist"), vec![b'a'; 1024]).unwrap();
        fs::write(pkg.join("Contents/Resources/Archive.bom"), vec![b'b'; 3072]).unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages
            .insert("Old.pkg", vec![Receipt::new("com.example.old", "1.0")]);
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.installer_item = PathBuf::from(format!("{}/", pkg.display()));
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        assert_eq!(info.installer_item_size, Some(4));
        assert_eq!(info.installer_item_hash.as_deref(), Some(NOT_A_FILE_HASH));
        assert_eq!(info.installer_item_location.as_deref(), Some("Old.pkg"));
    }

    #[test]
    fn uninstaller_image_is_measured() {
        let repo = TempDir::new().unwrap();
        let pkgs = repo.path().join("pkgs");
        fs::create_dir_all(&pkgs).unwrap();
        let pkg = pkgs.join("Tool.pkg");
        fs::write(&pkg, "xar!").unwrap();
        let uninstaller = pkgs.join("Tool Uninstaller.dmg");
        fs::write(&uninstaller, vec![0u8; 2048]).unwrap();
        let volume = TempDir::new().unwrap();
        let mut t = TestBackend::new(volume.path());
        t.packages
            .insert("Tool.pkg", vec![Receipt::new("com.example.tool", "1.0")]);
        let backend = t.rebuild();

        let mut req = request(&pkg);
        req.uninstaller_image = Some(uninstaller.clone());
        let info = synthesize(&req, &backend, &Config::default()).unwrap();

        assert_eq!(
            info.uninstaller_item_location.as_deref(),
            Some("Tool Uninstaller.dmg")
        );
        assert_eq!(info.uninstaller_item_size, Some(2));
        assert_eq!(
            info.uninstaller_item_hash,
            Some(sha256_file(&uninstaller).unwrap())
        );
    }

    #[test]
    fn invalid_input_fails_before_mounting() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("Foo.dmg");
        fs::write(&image, "dmg").unwrap();
        let volume = TempDir::new().unwrap();
        write_app(volume.path(), "Foo.app", "1.0");
        let t = TestBackend::new(volume.path());

        let mut req = request(&image);
        req.mode = Some("u+q".into());
        let err = synthesize(&req, &t.backend, &Config::default()).unwrap_err();
        assert!(matches!(err, MkPkgInfoError::Usage(_)));

        let mut req = request(&image);
        req.scripts.preinstall = Some(dir.path().join("missing.sh"));
        let err = synthesize(&req, &t.backend, &Config::default()).unwrap_err();
        assert!(matches!(err, MkPkgInfoError::Usage(_)));

        assert_eq!(t.attaches.get(), 0);
    }

    #[test]
    fn unsupported_and_missing_items() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("Foo.zip");
        fs::write(&zip, "zip").unwrap();
        let t = TestBackend::new(dir.path());

        let err = synthesize(&request(&zip), &t.backend, &Config::default()).unwrap_err();
        assert!(matches!(err, MkPkgInfoError::UnsupportedArtifact(_)));
        assert_eq!(err.exit_code(), 4);

        let err = synthesize(
            &request(&dir.path().join("Nope.pkg")),
            &t.backend,
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MkPkgInfoError::Usage(_)));
    }

    #[test]
    fn location_uses_nearest_pkgs_ancestor() {
        assert_eq!(
            repo_relative_location(Path::new("/repo/pkgs/apps/firefox/Firefox-3.6.dmg")),
            "apps/firefox/Firefox-3.6.dmg"
        );
        assert_eq!(
            repo_relative_location(Path::new("/repo/pkgs/old/pkgs/Foo.pkg")),
            "Foo.pkg"
        );
        assert_eq!(
            repo_relative_location(Path::new("/Users/me/Downloads/Foo.dmg")),
            "Foo.dmg"
        );
        // A file literally named "pkgs" is not a directory segment.
        assert_eq!(repo_relative_location(Path::new("/tmp/pkgs")), "pkgs");
    }
}
