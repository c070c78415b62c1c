use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};
use tracing::trace;

use crate::backends::{ObjectStore, PutRequest};

// -- 📂 FileStoreConfig — "It's just a folder", said no sysadmin ever before the disk filled up.
// KNOWLEDGE GRAPH: config lives co-located with the backend that uses it. One backend = one config = one file.
#[derive(Debug, Deserialize, Clone)]
pub struct FileStoreConfig {
    /// 📁 Every key lands somewhere under here. Created on startup if missing.
    pub root: PathBuf,
}

/// 🚰 FileStore — writes each object to `<root>/<key>`, creating parent dirs as needed.
///
/// It's a BufWriter around a tokio `File`. Simple. Honest. Does not complain.
/// Metadata (content type, ACL, encryption) has no meaning on a local disk, so it is
/// logged and otherwise ignored.
///
/// ⚠️ `File::create` truncates if the file exists. Re-running a job overwrites its output.
/// Keys that are absolute or try to climb out with `..` are refused.
#[derive(Debug)]
pub struct FileStore {
    store_config: FileStoreConfig,
}

impl FileStore {
    /// 🚀 Makes sure the root exists, then stands ready.
    pub async fn new(store_config: FileStoreConfig) -> Result<Self> {
        fs::create_dir_all(&store_config.root).await.context(format!(
            "💀 The store root '{}' could not be conjured into existence. \
             We stared at the path. The path stared back. Check permissions.",
            store_config.root.display()
        ))?;
        Ok(Self { store_config })
    }

    /// 🗺️ Turn a key into a path under the root, or refuse to.
    pub(crate) fn resolve(&self, key: &str) -> Result<PathBuf> {
        let the_relative = Path::new(key);
        let mut saw_a_real_component = false;
        for component in the_relative.components() {
            match component {
                Component::Normal(_) => saw_a_real_component = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => bail!(
                    "💀 key '{key}' tries to escape the store root. Nice try. \
                     Keys must be relative paths without '..'"
                ),
            }
        }
        if !saw_a_real_component {
            bail!("💀 key '{key}' does not name a file");
        }
        Ok(self.store_config.root.join(the_relative))
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    /// 📡 Drain the body into `<root>/<key>`. One copy, one flush, done.
    async fn put_object(&mut self, request: PutRequest) -> Result<()> {
        let PutRequest {
            key,
            mut body,
            metadata,
        } = request;
        let the_path = self.resolve(&key)?;

        if let Some(parent) = the_path.parent() {
            fs::create_dir_all(parent).await.context(format!(
                "💀 could not create the directory for key '{key}' at '{}'",
                parent.display()
            ))?;
        }

        trace!(
            "📬 key '{}' walked into the file store (metadata {:?} noted, then politely ignored)",
            key, metadata
        );

        let the_file = File::create(&the_path).await.context(format!(
            "💀 The file '{}' refused to be born. Perhaps the directory is read-only. \
             Perhaps it was always us.",
            the_path.display()
        ))?;
        // -- 📦 BufWriter: because one syscall per chunk is a war crime.
        let mut the_writer = io::BufWriter::new(the_file);
        let the_bytes_written = io::copy(&mut body, &mut the_writer)
            .await
            .context(format!("💀 writing key '{key}' to disk failed mid-copy"))?;
        // -- 🎬 final flush. without it the tail of the payload lives forever in the buffer. like Kevin's blender.
        the_writer
            .flush()
            .await
            .context(format!("💀 flushing key '{key}' to disk failed"))?;

        trace!("💾 {} bytes landed at '{}'", the_bytes_written, the_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UploadMetadata;
    use bytes::Bytes;
    use std::io::Cursor;

    async fn store_in(dir: &Path) -> Result<FileStore> {
        FileStore::new(FileStoreConfig {
            root: dir.to_path_buf(),
        })
        .await
    }

    fn request(key: &str, body: &'static [u8]) -> PutRequest {
        PutRequest {
            key: key.to_string(),
            body: Cursor::new(Bytes::from_static(body)),
            metadata: UploadMetadata::default(),
        }
    }

    #[tokio::test]
    async fn the_one_where_nested_keys_grow_their_own_directories() -> Result<()> {
        let the_tempdir = tempfile::tempdir()?;
        let mut the_store = store_in(the_tempdir.path()).await?;

        the_store
            .put_object(request("daily/2026/users.csv", b"id\n1\n"))
            .await?;

        let the_contents = std::fs::read(the_tempdir.path().join("daily/2026/users.csv"))?;
        assert_eq!(the_contents, b"id\n1\n");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_rewriting_a_key_truncates_the_old_content() -> Result<()> {
        let the_tempdir = tempfile::tempdir()?;
        let mut the_store = store_in(the_tempdir.path()).await?;

        the_store
            .put_object(request("k.csv", b"a much longer first version\n"))
            .await?;
        the_store.put_object(request("k.csv", b"short\n")).await?;

        assert_eq!(std::fs::read(the_tempdir.path().join("k.csv"))?, b"short\n");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_escape_artists_are_caught_at_the_gate() -> Result<()> {
        let the_tempdir = tempfile::tempdir()?;
        let the_store = store_in(the_tempdir.path()).await?;

        assert!(the_store.resolve("../outside.csv").is_err());
        assert!(the_store.resolve("a/../../outside.csv").is_err());
        assert!(the_store.resolve("/etc/passwd").is_err());
        assert!(the_store.resolve("./").is_err());
        assert_eq!(
            the_store.resolve("./a/b.csv")?,
            the_tempdir.path().join("./a/b.csv")
        );
        Ok(())
    }
}
