// mkpkginfo-common/src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::error::{MkPkgInfoError, Result};

pub const DEFAULT_CATALOG: &str = "testing";
pub const DEFAULT_MINIMUM_OS_FLOOR: &str = "10.4.0";
pub const DEFAULT_DESTINATION: &str = "/Applications";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SCRIPT_SIZE_LIMIT: u64 = 1024 * 1024;

/// Path segment marking the root of a repository's installer item storage.
pub const REPO_PKGS_SEGMENT: &str = "pkgs";

/// Package receipts live here; never fingerprint them as installed items.
pub const RECEIPTS_DIR: &str = "/Library/Receipts";

#[derive(Debug, Clone)]
pub struct Config {
    pub default_catalogs: Vec<String>,
    pub minimum_os_floor: String,
    pub default_destination: PathBuf,
    pub command_timeout: Duration,
    pub vendor_helper: Option<PathBuf>,
    pub demote_unversioned_bundles: bool,
    pub script_size_limit: u64,
    pub tmp_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading mkpkginfo configuration");
        Self::load_from(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        let default_catalogs = match get("MKPKGINFO_DEFAULT_CATALOGS") {
            Some(list) => {
                let catalogs: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if catalogs.is_empty() {
                    defaults.default_catalogs.clone()
                } else {
                    catalogs
                }
            }
            None => defaults.default_catalogs.clone(),
        };

        let minimum_os_floor =
            get("MKPKGINFO_MINIMUM_OS_FLOOR").unwrap_or(defaults.minimum_os_floor);
        let default_destination = get("MKPKGINFO_DEFAULT_DESTINATION")
            .map(PathBuf::from)
            .unwrap_or(defaults.default_destination);

        let command_timeout = match get("MKPKGINFO_COMMAND_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("MKPKGINFO_COMMAND_TIMEOUT_SECS", &raw)?),
            None => defaults.command_timeout,
        };
        let script_size_limit = match get("MKPKGINFO_SCRIPT_SIZE_LIMIT") {
            Some(raw) => parse_u64("MKPKGINFO_SCRIPT_SIZE_LIMIT", &raw)?,
            None => defaults.script_size_limit,
        };

        let demote_unversioned_bundles = get("MKPKGINFO_DEMOTE_UNVERSIONED_BUNDLES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = Self {
            default_catalogs,
            minimum_os_floor,
            default_destination,
            command_timeout,
            vendor_helper: get("MKPKGINFO_VENDOR_HELPER").map(PathBuf::from),
            demote_unversioned_bundles,
            script_size_limit,
            tmp_dir: get("MKPKGINFO_TMPDIR").map(PathBuf::from),
        };
        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Scratch root for expanding flat packages.
    pub fn scratch_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_catalogs: vec![DEFAULT_CATALOG.to_string()],
            minimum_os_floor: DEFAULT_MINIMUM_OS_FLOOR.to_string(),
            default_destination: PathBuf::from(DEFAULT_DESTINATION),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            vendor_helper: None,
            demote_unversioned_bundles: false,
            script_size_limit: DEFAULT_SCRIPT_SIZE_LIMIT,
            tmp_dir: None,
        }
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| MkPkgInfoError::Config(format!("{key}={raw:?} is not a number: {e}")))
}
