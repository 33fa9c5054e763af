use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha2::{Digest, Sha256};

/// Digest used for a content fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    /// Pick the digest that produced a declared fingerprint, by its hex length.
    pub fn for_declared(hash: &str) -> Self {
        if hash.trim().len() == 32 {
            Algorithm::Md5
        } else {
            Algorithm::Sha256
        }
    }
}

/// Hex digest of the file at `path`.
///
/// The raw I/O error is returned so callers can tell a missing file apart.
pub fn compute(path: &Path, algorithm: Algorithm) -> io::Result<String> {
    match algorithm {
        Algorithm::Md5 => digest_file::<Md5>(path),
        Algorithm::Sha256 => digest_file::<Sha256>(path),
    }
}

pub fn matches(declared: &str, actual: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(actual)
}

fn digest_file<D: Digest>(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
