//! SHA-256 checksum calculation for downloaded patches.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file.
///
/// Returns the lowercase hexadecimal hash of the file contents.
pub fn calculate_file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare an advertised hash with a computed one.
///
/// Servers are inconsistent about hex case, so the comparison ignores it.
pub fn hashes_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Whether a hash identifier has the shape of a hex SHA-256 digest.
///
/// Only such identifiers are checked against the downloaded content; any
/// other identifier is accepted as an opaque version tag.
pub fn is_sha256_hex(hash: &str) -> bool {
    let hash = hash.trim();
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
