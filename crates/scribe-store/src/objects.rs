use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use scribe_types::Digest;

use crate::error::{StoreError, StoreResult};

/// Filesystem-backed content-addressed blob store.
///
/// A digest with hex `h` lives at `<root>/<h[0..2]>/<h[2..]>`. Writes land in
/// a temporary file first and are renamed into place, so readers never see a
/// partial object; rewriting an existing digest is a no-op success.
#[derive(Debug)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a digest.
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Store `content` under `digest`. Duplicate writes succeed without
    /// touching the existing object.
    pub fn store(&self, digest: &Digest, content: &[u8]) -> StoreResult<()> {
        if digest.is_zero() {
            return Err(StoreError::InvalidArg("cannot store the zero digest".into()));
        }

        let path = self.object_path(digest);
        if path.exists() {
            return Ok(());
        }

        let dir = path.parent().expect("object path has a parent");
        fs::create_dir_all(dir)?;

        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        let result = (|| -> StoreResult<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(content)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        } else {
            debug!(object = %digest.short_hex(), size = content.len(), "stored object");
        }
        result
    }

    /// Read the full content of an object.
    pub fn load(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        let path = self.object_path(digest);
        if !path.exists() {
            return Err(StoreError::ObjectMissing(*digest));
        }
        Ok(fs::read(path)?)
    }

    pub fn exists(&self, digest: &Digest) -> bool {
        self.object_path(digest).exists()
    }

    pub fn delete(&self, digest: &Digest) -> StoreResult<()> {
        let path = self.object_path(digest);
        if !path.exists() {
            return Err(StoreError::ObjectMissing(*digest));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
