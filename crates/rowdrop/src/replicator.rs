// ai
//! 📬 The Replicator — one payload, N keys, N identical objects.
//!
//! 🎬 COLD OPEN — INT. OBJECT STORE — A LONG HALLWAY OF KEYS
//! The payload arrives. It is finished. It is immutable. It will be read N times
//! by N uploads and not one of them will be able to tell the others exist.
//!
//! 🧠 Knowledge graph:
//! - The payload is an [`EncodedPayload`] (a `Bytes` underneath). Each key gets its
//!   own `Cursor<Bytes>` over the same buffer. Cloning `Bytes` bumps a refcount,
//!   it does not copy anything.
//! - Keys upload in the order the job lists them, one at a time.
//! - First failure wins: later keys are never attempted, earlier keys stay put.
//!   There is no rollback. An object store has no transactions and we are not going
//!   to pretend it does.
//! - `skip_if_empty` only applies to query jobs. Raw text is always uploaded.
//!
//! 🦆 The duck asked for parallel uploads. The duck was told "ordering is the contract".

use tracing::{debug, warn};

use crate::backends::{ObjectStore, PutRequest};
use crate::common::{EncodedPayload, ExportContent, ExportJob};
use crate::error::{ExportError, ExportResult};

/// 🏁 What the replicator did with the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// 🕳️ Zero rows and the job asked us not to bother. Nothing was uploaded.
    Skipped,
    /// ✅ Every key got the payload, listed in upload order.
    Delivered { keys: Vec<String> },
}

impl ReplicationOutcome {
    /// 🔢 How many objects this outcome put into the store.
    pub fn delivered_count(&self) -> usize {
        match self {
            ReplicationOutcome::Skipped => 0,
            ReplicationOutcome::Delivered { keys } => keys.len(),
        }
    }
}

/// 📬 Upload `payload` to every destination key of `job`, in order.
///
/// Every upload reads from the start of the payload, so every key receives the
/// same bytes. Fails with [`ExportError::Upload`] naming the first key that
/// refused. Keys after it are not attempted.
pub async fn put_all<S>(
    store: &mut S,
    payload: &EncodedPayload,
    job: &ExportJob,
) -> ExportResult<ReplicationOutcome>
where
    S: ObjectStore + ?Sized,
{
    let is_query_job = matches!(job.content(), ExportContent::Query(_));
    if is_query_job && job.skip_if_empty() && payload.row_count() == 0 {
        warn!(
            "🕳️ job '{}' returned zero rows and skip_if_empty is on, nothing uploaded",
            job.name()
        );
        return Ok(ReplicationOutcome::Skipped);
    }

    let mut the_delivered = Vec::with_capacity(job.destination_keys().len());
    for key in job.destination_keys() {
        let the_request = PutRequest {
            key: key.clone(),
            body: payload.reader(),
            metadata: job.metadata().clone(),
        };
        store
            .put_object(the_request)
            .await
            .map_err(|e| ExportError::upload(key.clone(), e))?;
        debug!("📬 {} bytes delivered to '{}'", payload.len(), key);
        the_delivered.push(key.clone());
    }

    Ok(ReplicationOutcome::Delivered {
        keys: the_delivered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryStore;
    use crate::common::UploadMetadata;
    use crate::encoder::encode_text;
    use bytes::Bytes;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| k.to_string()).collect()
    }

    fn query_job(destination_keys: &[&str]) -> ExportJob {
        ExportJob::new(
            "users",
            ExportContent::Query("SELECT * FROM users".to_string()),
            keys(destination_keys),
        )
        .expect("💀 a job with real keys should build")
    }

    #[tokio::test]
    async fn the_one_where_three_keys_get_the_exact_same_bytes() -> ExportResult<()> {
        let mut the_store = InMemoryStore::new();
        let the_metadata = UploadMetadata {
            content_type: Some("text/csv".to_string()),
            content_encoding: Some("gzip".to_string()),
            access_policy: Some("private".to_string()),
            server_side_encryption: Some("AES256".to_string()),
        };
        let the_job = query_job(&["a", "b", "c"])
            .with_compression(true)
            .with_metadata(the_metadata.clone());
        let the_payload = EncodedPayload::new(Bytes::from_static(b"\x1f\x8bnot-really"), 4, true);

        let the_outcome = put_all(&mut the_store, &the_payload, &the_job).await?;

        assert_eq!(
            the_outcome,
            ReplicationOutcome::Delivered {
                keys: keys(&["a", "b", "c"])
            }
        );
        let the_objects = the_store.objects().await;
        assert_eq!(the_objects.len(), 3);
        for (object, expected_key) in the_objects.iter().zip(["a", "b", "c"]) {
            assert_eq!(object.key, expected_key, "uploads happen in job order");
            assert_eq!(object.bytes, the_payload.bytes().to_vec());
            assert_eq!(object.metadata, the_metadata);
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_key_b_fails_and_key_c_never_hears_about_it() {
        let mut the_store = InMemoryStore::new().failing_on("b");
        let the_job = query_job(&["a", "b", "c"]);
        let the_payload = EncodedPayload::new(Bytes::from_static(b"id\n1\n"), 1, false);

        let the_verdict = put_all(&mut the_store, &the_payload, &the_job).await;

        match the_verdict {
            Err(ExportError::Upload { key, .. }) => assert_eq!(key, "b"),
            other => panic!("💀 expected an upload error for 'b', got {other:?}"),
        }
        assert_eq!(the_store.attempted_keys().await, keys(&["a", "b"]));
        let the_survivor = the_store
            .object("a")
            .await
            .expect("💀 'a' landed before 'b' failed and there is no rollback");
        assert_eq!(the_survivor.bytes, b"id\n1\n");
        assert!(the_store.object("c").await.is_none());
    }

    #[tokio::test]
    async fn the_one_where_an_empty_result_is_skipped_when_asked() -> ExportResult<()> {
        let mut the_store = InMemoryStore::new();
        let the_job = query_job(&["a", "b"]).with_skip_if_empty(true);
        let the_payload = EncodedPayload::new(Bytes::from_static(b"id,name\n"), 0, false);

        let the_outcome = put_all(&mut the_store, &the_payload, &the_job).await?;

        assert_eq!(the_outcome, ReplicationOutcome::Skipped);
        assert_eq!(the_outcome.delivered_count(), 0);
        assert!(the_store.attempted_keys().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_empty_result_still_ships_a_header_by_default() -> ExportResult<()> {
        let mut the_store = InMemoryStore::new();
        let the_job = query_job(&["a"]);
        let the_payload = EncodedPayload::new(Bytes::from_static(b"id,name\n"), 0, false);

        let the_outcome = put_all(&mut the_store, &the_payload, &the_job).await?;

        assert_eq!(the_outcome.delivered_count(), 1);
        let the_object = the_store
            .object("a")
            .await
            .expect("💀 the header-only payload should have landed");
        assert_eq!(the_object.bytes, b"id,name\n");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_raw_text_ignores_skip_if_empty() -> ExportResult<()> {
        let mut the_store = InMemoryStore::new();
        let the_job = ExportJob::new(
            "banner",
            ExportContent::Raw("hello".to_string()),
            keys(&["banner.txt"]),
        )?
        .with_skip_if_empty(true);
        let the_payload = encode_text("hello", false)?;

        let the_outcome = put_all(&mut the_store, &the_payload, &the_job).await?;

        assert_eq!(the_outcome.delivered_count(), 1);
        assert_eq!(the_store.objects().await[0].bytes, b"hello");
        Ok(())
    }
}
