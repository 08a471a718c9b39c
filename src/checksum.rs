use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

pub type Sha256Digest = [u8; 32];

pub fn parse_sha256(value: &str) -> Result<Sha256Digest> {
    let trimmed = value.trim();
    let digest = trimmed.strip_prefix("sha256:").unwrap_or(trimmed);

    if digest.len() != 64 {
        return Err(Error::integrity(
            digest,
            "SHA256 checksum must be exactly 64 hex characters",
        ));
    }

    let bytes = hex::decode(digest)
        .map_err(|err| Error::integrity(digest, format!("invalid hex digest: {err}")))?;
    let mut array = [0u8; 32];
    array.copy_from_slice(&bytes);
    Ok(array)
}

pub fn format_digest(bytes: &Sha256Digest) -> String {
    hex::encode(bytes)
}

pub fn compute_sha256(path: &Path) -> Result<Sha256Digest> {
    let mut file = File::open(path).map_err(|err| Error::io(path, err))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|err| Error::io(path, err))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize().into())
}

/// Look up `asset` in a `sha256sum`-style manifest (`<hex>  <name>` per line).
///
/// Binary-mode markers (`*name`) and leading `./` are tolerated.
pub fn find_in_manifest(manifest: &str, asset: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?;
        let name = name.trim_start_matches('*').trim_start_matches("./");
        (name == asset).then(|| digest.to_ascii_lowercase())
    })
}
