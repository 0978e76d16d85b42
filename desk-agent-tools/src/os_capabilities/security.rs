//! Password-keyed file obfuscation and overwrite-before-delete.
//!
//! The cipher is a repeating XOR with `sha256(password)`. It keeps casual
//! eyes off a file and nothing more.

use super::hashing::sha256_bytes;
use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use rand::RngCore;
use serde::Serialize;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const SECURE_DELETE_PASSES: usize = 3;
const ENCRYPTED_SUFFIX: &str = ".encrypted";
const DECRYPTED_SUFFIX: &str = ".decrypted";

#[derive(Debug, Clone, Serialize)]
pub struct Transformed {
    pub source: PathBuf,
    pub output: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecureDeletion {
    pub path: PathBuf,
    pub size: u64,
    pub passes: usize,
}

pub fn xor_with_key(data: &mut [u8], key: &[u8; 32]) {
    for (byte, k) in data.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}

/// `<path>.encrypted`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// `.encrypted` replaced by `.decrypted`, or `<path>.decrypted`.
pub fn decrypted_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match raw.strip_suffix(ENCRYPTED_SUFFIX) {
        Some(stem) if !stem.is_empty() => PathBuf::from(format!("{}{}", stem, DECRYPTED_SUFFIX)),
        _ => PathBuf::from(format!("{}{}", raw, DECRYPTED_SUFFIX)),
    }
}

async fn transform(guard: &PathGuard, path: impl AsRef<Path>, password: &str, output_for: fn(&Path) -> PathBuf) -> OsResult<Transformed> {
    if password.is_empty() {
        return Err(OsError::InvalidArgument("password cannot be empty".to_string()));
    }
    let source = guard.check(path)?;
    if !source.is_file() {
        return Err(not_found(&source));
    }
    let output = guard.check(output_for(&source))?;
    let key = sha256_bytes(password.as_bytes());

    blocking(move || {
        let mut data = std::fs::read(&source)?;
        xor_with_key(&mut data, &key);
        std::fs::write(&output, &data)?;
        Ok(Transformed {
            size: data.len() as u64,
            source,
            output,
        })
    })
    .await
}

pub async fn encrypt_file(guard: &PathGuard, path: impl AsRef<Path>, password: &str) -> OsResult<Transformed> {
    transform(guard, path, password, encrypted_path).await
}

pub async fn decrypt_file(guard: &PathGuard, path: impl AsRef<Path>, password: &str) -> OsResult<Transformed> {
    transform(guard, path, password, decrypted_path).await
}

/// Overwrite the file with random bytes `SECURE_DELETE_PASSES` times, then
/// remove it.
pub async fn secure_delete(guard: &PathGuard, path: impl AsRef<Path>) -> OsResult<SecureDeletion> {
    let path = guard.check(path)?;
    if !path.is_file() {
        return Err(not_found(&path));
    }

    blocking(move || {
        let size = std::fs::metadata(&path)?.len();
        {
            let mut file = std::fs::OpenOptions::new().write(true).open(&path)?;
            let mut rng = rand::rngs::OsRng;
            let mut buffer = vec![0u8; 64 * 1024];
            for _ in 0..SECURE_DELETE_PASSES {
                file.seek(SeekFrom::Start(0))?;
                let mut remaining = size;
                while remaining > 0 {
                    let chunk = remaining.min(buffer.len() as u64) as usize;
                    rng.fill_bytes(&mut buffer[..chunk]);
                    file.write_all(&buffer[..chunk])?;
                    remaining -= chunk as u64;
                }
                file.sync_all()?;
            }
        }
        std::fs::remove_file(&path)?;
        Ok(SecureDeletion {
            path,
            size,
            passes: SECURE_DELETE_PASSES,
        })
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard() -> PathGuard {
        PathGuard::new(["/proc"])
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(encrypted_path(Path::new("/d/a.txt")), PathBuf::from("/d/a.txt.encrypted"));
        assert_eq!(decrypted_path(Path::new("/d/a.txt.encrypted")), PathBuf::from("/d/a.txt.decrypted"));
        assert_eq!(decrypted_path(Path::new("/d/blob")), PathBuf::from("/d/blob.decrypted"));
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt_restores_content() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("secret.txt");
        std::fs::write(&plain, "attack at dawn").unwrap();

        let encrypted = encrypt_file(&guard(), &plain, "hunter2").await.unwrap();
        assert_ne!(std::fs::read(&encrypted.output).unwrap(), b"attack at dawn");

        let decrypted = decrypt_file(&guard(), &encrypted.output, "hunter2").await.unwrap();
        assert_eq!(decrypted.output, dir.path().join("secret.txt.decrypted"));
        assert_eq!(std::fs::read_to_string(&decrypted.output).unwrap(), "attack at dawn");
    }

    #[tokio::test]
    async fn test_secure_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shred.me");
        std::fs::write(&path, vec![7u8; 200_000]).unwrap();

        let result = secure_delete(&guard(), &path).await.unwrap();
        assert_eq!(result.size, 200_000);
        assert_eq!(result.passes, 3);
        assert!(!path.exists());
    }
}
