//! Named TSIG key management: a YAML-configured key store and single-key
//! secret files holding base64 material.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::error::{error, Result};
use crate::name::Name;
use crate::tsig::{TsigKey, HMAC_SHA256};

/// Keys indexed by their (case-insensitive) key name.
#[derive(Debug, Default, Clone)]
pub struct KeyStore {
    keys: HashMap<Name, TsigKey>,
}

/// On-disk shape:
///
/// ```yaml
/// keys:
///   xfr-key.example.:
///     algorithm: hmac-sha256
///     secret: aGVsbG8gd29ybGQ=
/// ```
#[derive(Debug, Deserialize)]
struct KeyStoreConfig {
    keys: HashMap<String, KeyConfig>,
}

#[derive(Debug, Deserialize)]
struct KeyConfig {
    algorithm: Option<String>,
    secret: String,
}

impl KeyStore {
    pub fn new() -> KeyStore {
        Default::default()
    }

    pub fn from_yaml(text: &str) -> Result<KeyStore> {
        let config: KeyStoreConfig = serde_yaml::from_str(text)?;
        let mut store = KeyStore::new();
        for (name, key) in config.keys {
            let algorithm = key.algorithm.as_deref().unwrap_or(HMAC_SHA256);
            let secret = BASE64.decode(key.secret.as_bytes())?;
            store.insert(TsigKey::new(&name, algorithm, secret)?);
        }
        Ok(store)
    }

    pub fn from_file<P>(path: &P) -> Result<KeyStore>
    where
        P: AsRef<OsStr>,
    {
        let text = std::fs::read_to_string(std::path::Path::new(path))?;
        KeyStore::from_yaml(&text)
    }

    pub fn insert(&mut self, key: TsigKey) {
        log::debug!(target: "key", "loaded key {} ({})", key.name(), key.algorithm());
        self.keys.insert(key.name().clone(), key);
    }

    pub fn find(&self, name: &Name) -> Option<&TsigKey> {
        self.keys.get(name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Generates a fresh key and writes its secret, base64-encoded, to a new
/// file. Refuses to clobber an existing one.
pub fn generate_key_file<P>(fpath: &P, name: &str, algorithm: &str) -> Result<TsigKey>
where
    P: AsRef<OsStr>,
{
    let path = std::path::Path::new(fpath);

    if path.is_file() {
        return Err(
            error!(KeyFileExists => "key file at path ({}) already exists", path.display()),
        );
    }

    let key = TsigKey::generate(name, algorithm)?;
    let secret = BASE64.encode(key.secret());

    let mut file = std::fs::File::create(path)?;
    write!(file, "{}", secret)?;

    Ok(key)
}

/// Loads a key whose secret was stored by [`generate_key_file`].
pub fn load_key_file<P>(fpath: &P, name: &str, algorithm: &str) -> Result<TsigKey>
where
    P: AsRef<OsStr>,
{
    let path = std::path::Path::new(fpath);

    if !path.is_file() {
        return Err(error!(KeyFileNotFound => "key file at path ({}) not found", path.display()));
    }

    let secret = std::fs::read(path)?;
    let secret = BASE64.decode(secret)?;

    TsigKey::new(name, algorithm, secret)
}

pub fn delete_key_file<P>(fpath: &P) -> Result<()>
where
    P: AsRef<OsStr>,
{
    let path = std::path::Path::new(fpath);

    if path.is_file() {
        std::fs::remove_file(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn yaml_store_round_trip() {
        let store = KeyStore::from_yaml(
            "keys:\n  xfr.example.:\n    algorithm: hmac-sha256\n    secret: MDEyMzQ1Njc4OWFiY2RlZg==\n  plain.example.:\n    secret: c2VjcmV0\n",
        )
        .unwrap();
        assert_eq!(store.len(), 2);

        let key = store.find(&"xfr.example.".parse().unwrap()).unwrap();
        assert_eq!(key.secret(), b"0123456789abcdef");
        // Key names compare case-insensitively.
        assert!(store.find(&"XFR.Example.".parse().unwrap()).is_some());
        // Unconfigured algorithm falls back to hmac-sha256.
        let plain = store.find(&"plain.example.".parse().unwrap()).unwrap();
        assert_eq!(plain.algorithm().to_string(), "hmac-sha256.");
    }

    #[test]
    fn bad_secret_is_a_base64_error() {
        let err = KeyStore::from_yaml("keys:\n  k.:\n    secret: '@@@'\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Base64);
    }

    #[test]
    fn key_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xfr.key");

        let generated = generate_key_file(&path, "xfr.example.", "hmac-sha256").unwrap();
        let loaded = load_key_file(&path, "xfr.example.", "hmac-sha256").unwrap();
        assert_eq!(generated, loaded);

        let err = generate_key_file(&path, "xfr.example.", "hmac-sha256").unwrap_err();
        assert_eq!(err.kind, ErrorKind::KeyFileExists);

        delete_key_file(&path).unwrap();
        let err = load_key_file(&path, "xfr.example.", "hmac-sha256").unwrap_err();
        assert_eq!(err.kind, ErrorKind::KeyFileNotFound);

        // Deleting a missing file is not an error.
        delete_key_file(&path).unwrap();
    }
}
