// mkpkginfo-core/src/testutil.rs
//! In-memory collaborators for exercising the engine without macOS tooling.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::{CatalogInfo, Receipt};
use plist::{Dictionary, Value};

use crate::backend::{Backend, DiskImageMounter, PackageDescriptor, PackageReader, VendorSuite};
use crate::plists::FilePlistReader;

pub fn write_app(dir: &Path, name: &str, version: &str) -> PathBuf {
    let app = dir.join(name);
    fs::create_dir_all(app.join("Contents")).unwrap();
    let stem = name.trim_end_matches(".app");
    let dict: Dictionary = [
        ("CFBundleName", stem.to_string()),
        ("CFBundleIdentifier", format!("com.example.{}", stem.to_lowercase())),
        ("CFBundleShortVersionString", version.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Value::String(v)))
    .collect();
    Value::Dictionary(dict)
        .to_file_xml(app.join("Contents/Info.plist"))
        .unwrap();
    app
}

pub struct FakeMounter {
    /// `None` makes every attach fail.
    pub root: Option<PathBuf>,
    /// Further mount points reported after `root`, as multi-partition
    /// images do.
    pub extra_roots: Vec<PathBuf>,
    pub attaches: Rc<Cell<usize>>,
    pub detaches: Rc<Cell<usize>>,
    pub fail_detach: bool,
}

impl DiskImageMounter for FakeMounter {
    fn attach(&self, image: &Path) -> Result<Vec<PathBuf>> {
        let root = self.root.clone().ok_or_else(|| {
            MkPkgInfoError::Resource(format!("cannot attach {}", image.display()))
        })?;
        self.attaches.set(self.attaches.get() + 1);
        let mut roots = vec![root];
        roots.extend(self.extra_roots.iter().cloned());
        Ok(roots)
    }

    fn detach(&self, mount_point: &Path) -> Result<()> {
        self.detaches.set(self.detaches.get() + 1);
        if self.fail_detach {
            return Err(MkPkgInfoError::Resource(format!(
                "{} is busy",
                mount_point.display()
            )));
        }
        Ok(())
    }
}

/// Answers by file name; unknown packages read as empty.
#[derive(Debug, Clone, Default)]
pub struct FakePackages {
    by_name: HashMap<String, PackageDescriptor>,
}

impl FakePackages {
    pub fn insert(&mut self, name: &str, receipts: Vec<Receipt>) {
        self.insert_descriptor(
            name,
            PackageDescriptor {
                receipts,
                ..Default::default()
            },
        );
    }

    pub fn insert_descriptor(&mut self, name: &str, descriptor: PackageDescriptor) {
        self.by_name.insert(name.to_string(), descriptor);
    }
}

impl PackageReader for FakePackages {
    fn read_package(&self, path: &Path) -> Result<PackageDescriptor> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.by_name.get(&name).cloned().unwrap_or_default())
    }
}

pub struct FakeVendor {
    pub answer: Option<CatalogInfo>,
    pub calls: Rc<RefCell<Vec<(PathBuf, Option<String>)>>>,
}

impl VendorSuite for FakeVendor {
    fn catalog_info(&self, root: &Path, hint: Option<&str>) -> Result<Option<CatalogInfo>> {
        self.calls
            .borrow_mut()
            .push((root.to_path_buf(), hint.map(String::from)));
        Ok(self.answer.clone())
    }
}

/// A fake backend plus handles on what it observed.
pub struct TestBackend {
    pub backend: Backend,
    pub root: PathBuf,
    pub packages: FakePackages,
    pub vendor_answer: Option<CatalogInfo>,
    pub fail_detach: bool,
    pub extra_roots: Vec<PathBuf>,
    pub attaches: Rc<Cell<usize>>,
    pub detaches: Rc<Cell<usize>>,
    pub vendor_calls: Rc<RefCell<Vec<(PathBuf, Option<String>)>>>,
}

impl TestBackend {
    /// Every attach mounts `root`.
    pub fn new(root: &Path) -> Self {
        let mut t = Self {
            backend: placeholder_backend(),
            root: root.to_path_buf(),
            packages: FakePackages::default(),
            vendor_answer: None,
            fail_detach: false,
            extra_roots: Vec::new(),
            attaches: Rc::new(Cell::new(0)),
            detaches: Rc::new(Cell::new(0)),
            vendor_calls: Rc::new(RefCell::new(Vec::new())),
        };
        t.backend = t.rebuild();
        t
    }

    /// A backend reflecting the current settings, sharing the counters.
    pub fn rebuild(&self) -> Backend {
        Backend {
            plists: Box::new(FilePlistReader),
            packages: Box::new(self.packages.clone()),
            mounter: Box::new(FakeMounter {
                root: Some(self.root.clone()),
                extra_roots: self.extra_roots.clone(),
                attaches: self.attaches.clone(),
                detaches: self.detaches.clone(),
                fail_detach: self.fail_detach,
            }),
            vendor: Box::new(FakeVendor {
                answer: self.vendor_answer.clone(),
                calls: self.vendor_calls.clone(),
            }),
        }
    }
}

fn placeholder_backend() -> Backend {
    Backend {
        plists: Box::new(FilePlistReader),
        packages: Box::new(FakePackages::default()),
        mounter: Box::new(FakeMounter {
            root: None,
            extra_roots: Vec::new(),
            attaches: Rc::new(Cell::new(0)),
            detaches: Rc::new(Cell::new(0)),
            fail_detach: false,
        }),
        vendor: Box::new(FakeVendor {
            answer: None,
            calls: Rc::new(RefCell::new(Vec::new())),
        }),
    }
}
