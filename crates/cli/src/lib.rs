use std::env;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub mod commands;

/// Turn a user-supplied path into an absolute one.
///
/// Canonicalizes when possible; if that fails (e.g., the path does not
/// exist yet), joins it with the current working directory instead.
pub fn absolutize_input(input: &str) -> Result<PathBuf> {
    let path = Path::new(input);
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) => {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Compute the SHA-256 hash of a file and return it as a hex string.
///
/// Recorded in extraction reports so a provenance list can be tied back to
/// the exact artifact it was derived from.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open artifact for hashing: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read artifact for hashing: {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = hasher.finalize();
    Ok(format!("{:x}", digest))
}

/// Current wall-clock time as an RFC 3339 string, for stage reports.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
