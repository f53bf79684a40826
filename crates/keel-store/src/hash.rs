//! Content hashing.
//!
//! Package content hashes are SHA-512, stored base64-encoded in the sidecar
//! file and the lockfile.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha512};
use std::io::{self, Read};

/// Hash a byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    STANDARD.encode(hasher.finalize())
}

/// Hash everything a reader yields.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(STANDARD.encode(hasher.finalize()))
}
