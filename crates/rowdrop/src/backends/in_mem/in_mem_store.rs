use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use crate::backends::{ObjectStore, PutRequest};
use crate::common::UploadMetadata;

/// 📦 One object as the store saw it: key, bytes, and the stickers on the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub metadata: UploadMetadata,
}

/// 📦 A store that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// Every `put_object` drains the body and pushes a [`StoredObject`] into a Vec
/// wrapped in a Mutex wrapped in an Arc. Clone-able because tests need to peek
/// inside after handing `self` off to the exporter. The `Arc` means every clone
/// shares the same Vec.
///
/// Keys registered with [`InMemoryStore::failing_on`] are refused after being
/// recorded as attempted, so tests can prove which keys were never tried.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    objects: Arc<Mutex<Vec<StoredObject>>>,
    attempted_keys: Arc<Mutex<Vec<String>>>,
    failing_keys: HashSet<String>,
}

impl InMemoryStore {
    /// 🚀 An empty vault, full of potential.
    pub fn new() -> Self {
        Self::default()
    }

    /// 💣 This key will be refused with an error. Everything else lands normally.
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// 📋 Every object that made it, in arrival order.
    pub async fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().await.clone()
    }

    /// 🔍 The latest object stored under `key`, if any.
    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .await
            .iter()
            .rev()
            .find(|o| o.key == key)
            .cloned()
    }

    /// 📋 Every key that `put_object` was called with, including the ones that failed.
    pub async fn attempted_keys(&self) -> Vec<String> {
        self.attempted_keys.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put_object(&mut self, request: PutRequest) -> Result<()> {
        let PutRequest {
            key,
            mut body,
            metadata,
        } = request;
        // 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        self.attempted_keys.lock().await.push(key.clone());

        if self.failing_keys.contains(&key) {
            bail!("💀 the in-memory store was told to refuse '{key}', and it is a store of its word");
        }

        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .await
            .context("💀 draining an in-memory body failed. RAM said no.")?;

        self.objects.lock().await.push(StoredObject {
            key,
            bytes,
            metadata,
        });
        Ok(())
    }
}
