//! Shared fixtures for configuration loading tests.

use std::path::PathBuf;

use tempfile::TempDir;

/// A scratch directory that is removed when dropped.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name` inside the fixture and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Generate a self-signed pair. Returns (cert, key, bundle) paths, where
    /// the bundle holds both the certificate and the key.
    #[allow(dead_code)]
    pub fn self_signed(&self, prefix: &str) -> (PathBuf, PathBuf, PathBuf) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = cert.serialize_pem().unwrap();
        let key_pem = cert.serialize_private_key_pem();

        let cert_path = self.write(&format!("{prefix}.crt"), &cert_pem);
        let key_path = self.write(&format!("{prefix}.key"), &key_pem);
        let bundle_path = self.write(&format!("{prefix}.pem"), &format!("{cert_pem}{key_pem}"));
        (cert_path, key_path, bundle_path)
    }
}
