//! Content digests for files and text.

use super::{blocking, not_found, OsError, OsResult};
use crate::sandbox::PathGuard;
use md5::Md5;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = OsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(OsError::InvalidArgument(format!(
                "Unsupported hash algorithm: {}. Use md5, sha1, sha224, sha256, sha384 or sha512",
                other
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub algorithm: HashAlgorithm,
    pub hash: String,
    pub size: u64,
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hex digest of everything `reader` yields.
pub fn digest<R: Read>(algorithm: HashAlgorithm, reader: R) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => digest_reader::<Md5, _>(reader),
        HashAlgorithm::Sha1 => digest_reader::<Sha1, _>(reader),
        HashAlgorithm::Sha224 => digest_reader::<Sha224, _>(reader),
        HashAlgorithm::Sha256 => digest_reader::<Sha256, _>(reader),
        HashAlgorithm::Sha384 => digest_reader::<Sha384, _>(reader),
        HashAlgorithm::Sha512 => digest_reader::<Sha512, _>(reader),
    }
}

pub(crate) fn digest_file_blocking(algorithm: HashAlgorithm, path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    digest(algorithm, std::io::BufReader::new(file))
}

pub async fn hash_file(guard: &PathGuard, path: impl AsRef<Path>, algorithm: HashAlgorithm) -> OsResult<FileDigest> {
    let path = guard.check(path)?;
    if !path.is_file() {
        return Err(not_found(&path));
    }

    blocking(move || {
        let size = std::fs::metadata(&path)?.len();
        let hash = digest_file_blocking(algorithm, &path)?;
        Ok(FileDigest {
            path,
            algorithm,
            hash,
            size,
        })
    })
    .await
}

pub fn hash_text(text: &str, algorithm: HashAlgorithm) -> String {
    // Reading from a byte slice cannot fail.
    digest(algorithm, text.as_bytes()).unwrap_or_default()
}

/// Raw SHA-256 of `data`, used as the key stream seed for file encryption.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&Sha256::digest(data));
    key
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            hash_text("abc", HashAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hash_text("abc", HashAlgorithm::Md5),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            hash_text("abc", HashAlgorithm::Sha1),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(hash_text("x", HashAlgorithm::Sha224).len(), 56);
        assert_eq!(hash_text("x", HashAlgorithm::Sha384).len(), 96);
        assert_eq!(hash_text("x", HashAlgorithm::Sha512).len(), 128);
    }

    #[test]
    fn test_file_digest_matches_text_digest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();
        for algorithm in [HashAlgorithm::Md5, HashAlgorithm::Sha256, HashAlgorithm::Sha512] {
            assert_eq!(
                digest_file_blocking(algorithm, &path).unwrap(),
                hash_text("abc", algorithm)
            );
        }
        assert_eq!(to_hex(&[0x00, 0x0f, 0xff]), "000fff");
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        let err = "crc32".parse::<HashAlgorithm>().unwrap_err();
        assert!(err.to_string().contains("Unsupported hash algorithm"));
    }
}
