// mkpkginfo-aio/src/lib.rs
//! IO operations for mkpkginfo (checksums, tree sizes, external commands)

pub mod checksum;
pub mod fs;
pub mod process;

pub use checksum::{md5_file, sha256_file};
pub use fs::{is_regular_file, read_script, tree_size_bytes};
pub use process::run_command;
