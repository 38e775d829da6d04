// mkpkginfo-core/src/vendor.rs
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mkpkginfo_aio::run_command;
use mkpkginfo_common::error::{MkPkgInfoError, Result};
use mkpkginfo_common::model::{CatalogInfo, Receipt};
use tracing::{debug, info};

use crate::backend::VendorSuite;

/// Receipt identifier prefix of vendor enterprise deployment packages.
pub const VENDOR_ENTERPRISE_PREFIX: &str = "com.adobe.Enterprise.install";

pub fn is_vendor_enterprise_receipt(receipt: &Receipt) -> bool {
    receipt.package_id.starts_with(VENDOR_ENTERPRISE_PREFIX)
}

/// Delegates vendor suites to an external helper program.
///
/// The helper is invoked as `helper <root> [hint]`. It prints a catalog
/// record as a property list and exits zero, or exits non-zero when the
/// root is not something it recognizes.
#[derive(Debug, Clone)]
pub struct ExternalVendorHelper {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl ExternalVendorHelper {
    pub fn new(program: Option<PathBuf>, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

impl VendorSuite for ExternalVendorHelper {
    fn catalog_info(&self, root: &Path, hint: Option<&str>) -> Result<Option<CatalogInfo>> {
        let Some(program) = &self.program else {
            debug!("No vendor helper configured; skipping {}", root.display());
            return Ok(None);
        };

        let mut args: Vec<OsString> = vec![root.as_os_str().to_owned()];
        args.extend(hint.map(OsString::from));
        let program_name = program.to_string_lossy();
        let out = run_command(&program_name, &args, None, self.timeout)?;
        if !out.status.success() {
            debug!(
                "Vendor helper declined {} ({})",
                root.display(),
                out.status
            );
            return Ok(None);
        }
        if out.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let record: CatalogInfo = plist::from_bytes(&out.stdout).map_err(|e| {
            MkPkgInfoError::UnreadableDescriptor(program_name.to_string(), e.to_string())
        })?;
        info!("Vendor helper produced catalog info for {}", record.name);
        Ok(Some(record))
    }
}
