// mkpkginfo-aio/src/checksum.rs
use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use mkpkginfo_common::error::Result;
use sha2::{Digest, Sha256};
use tracing::debug;

const BLOCK_SIZE: usize = 64 * 1024;

/// Streams a file through `D` in fixed-size blocks and returns the hex digest.
fn hash_file<D: Digest>(path: &Path) -> Result<(String, u64)> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];
    let mut total_bytes_read = 0u64;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total_bytes_read += n as u64;
    }

    Ok((hex::encode(hasher.finalize()), total_bytes_read))
}

/// SHA-256 of a whole installer item.
pub fn sha256_file(path: &Path) -> Result<String> {
    let (digest, bytes) = hash_file::<Sha256>(path)?;
    debug!(
        "Calculated SHA256 for {}: {} ({} bytes read)",
        path.display(),
        digest,
        bytes
    );
    Ok(digest)
}

/// MD5 checksum recorded for plain files in an installs list.
pub fn md5_file(path: &Path) -> Result<String> {
    let (digest, bytes) = hash_file::<Md5>(path)?;
    debug!(
        "Calculated MD5 for {}: {} ({} bytes read)",
        path.display(),
        digest,
        bytes
    );
    Ok(digest)
}
