//! Local filesystem blob backend for development and tests.
//!
//! Object payloads are sharded beneath `base_path/{shard}/{shard}/{key}`
//! to keep per-directory file counts down. Multipart sessions live as
//! part files under `base_path/.multipart/{session}/` until completion
//! concatenates them, in the order given, into the final object path.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

use super::{BlobError, BlobResult, BlobStore, PartTag};

pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(base_path.join(".multipart"))?;
        Ok(Self { base_path })
    }

    /// Reject path components that could escape the base directory. Keys
    /// and session handles are UUIDs generated by this service, so a
    /// failure here means a corrupted or forged value.
    fn ensure_component_safe(value: &str) -> BlobResult<()> {
        if value.is_empty()
            || value.contains('/')
            || value.contains('\\')
            || value.contains("..")
            || value.bytes().any(|b| b.is_ascii_control())
        {
            return Err(BlobError::Backend(format!("invalid path component `{}`", value)));
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(key) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff).
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified object payload path.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.base_path.join(".multipart").join(session)
    }

    fn part_path(&self, session: &str, part_number: i32) -> PathBuf {
        self.session_dir(session)
            .join(format!("part-{:05}", part_number))
    }

    /// Durably write `data` to `path` via a temp file and atomic rename.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> BlobResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| BlobError::Backend("object path missing parent directory".into()))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let result = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;
        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(path).await?;
                fs::rename(&tmp_path, path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BlobError::Io(err));
            }
        }
        Ok(())
    }

    /// Recursively remove empty shard directories up to the base path.
    ///
    /// Stops on the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put_object(&self, key: &str, data: Bytes) -> BlobResult<()> {
        Self::ensure_component_safe(key)?;
        self.write_atomic(&self.object_path(key), &data).await
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        response_filename: &str,
        ttl: Duration,
    ) -> BlobResult<String> {
        Self::ensure_component_safe(key)?;
        let path = self.object_path(key);
        if !path.exists() {
            return Err(BlobError::NotFound(key.to_string()));
        }
        // Local files carry no signature; hand back the raw URI.
        debug!(
            "presigning local uri for {} as `{}` ({}s)",
            key,
            response_filename,
            ttl.as_secs()
        );
        Ok(format!("file://{}", path.display()))
    }

    async fn delete_object(&self, key: &str) -> BlobResult<()> {
        Self::ensure_component_safe(key)?;
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed object file {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("object file {} already missing", path.display());
            }
            Err(err) => return Err(BlobError::Io(err)),
        }
        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> BlobResult<()> {
        for key in keys {
            self.delete_object(key).await?;
        }
        Ok(())
    }

    async fn create_multipart(
        &self,
        key: &str,
        labels: &[(String, String)],
    ) -> BlobResult<String> {
        Self::ensure_component_safe(key)?;
        let session = Uuid::new_v4().to_string();
        let dir = self.session_dir(&session);
        fs::create_dir_all(&dir).await?;

        let mut meta = format!("key={}\n", key);
        for (name, value) in labels {
            meta.push_str(&format!("{}={}\n", name, value));
        }
        fs::write(dir.join("meta"), meta).await?;

        Ok(session)
    }

    async fn upload_part(
        &self,
        key: &str,
        session: &str,
        part_number: i32,
        data: Bytes,
    ) -> BlobResult<String> {
        Self::ensure_component_safe(key)?;
        Self::ensure_component_safe(session)?;
        if !self.session_dir(session).exists() {
            return Err(BlobError::SessionNotFound(session.to_string()));
        }

        let tag = format!("{:x}", md5::compute(&data));
        self.write_atomic(&self.part_path(session, part_number), &data)
            .await?;
        Ok(tag)
    }

    async fn complete_multipart(
        &self,
        key: &str,
        session: &str,
        parts: &[PartTag],
    ) -> BlobResult<()> {
        Self::ensure_component_safe(key)?;
        Self::ensure_component_safe(session)?;
        let dir = self.session_dir(session);
        if !dir.exists() {
            return Err(BlobError::SessionNotFound(session.to_string()));
        }

        let object_path = self.object_path(key);
        let parent = object_path
            .parent()
            .ok_or_else(|| BlobError::Backend("object path missing parent directory".into()))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let assemble = async {
            let mut out = File::create(&tmp_path).await?;
            for part in parts {
                let bytes = fs::read(self.part_path(session, part.part_number)).await?;
                if format!("{:x}", md5::compute(&bytes)) != part.tag {
                    return Err(BlobError::TagMismatch(part.part_number));
                }
                out.write_all(&bytes).await?;
            }
            out.flush().await?;
            out.sync_all().await?;
            Ok::<(), BlobError>(())
        }
        .await;
        if let Err(err) = assemble {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        fs::rename(&tmp_path, &object_path).await?;
        if let Err(err) = fs::remove_dir_all(&dir).await {
            debug!("failed to remove session dir {}: {}", dir.display(), err);
        }
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, session: &str) -> BlobResult<()> {
        Self::ensure_component_safe(key)?;
        Self::ensure_component_safe(session)?;
        match fs::remove_dir_all(self.session_dir(session)).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobError::Io(err)),
        }
    }
}
