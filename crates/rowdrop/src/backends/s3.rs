// ai
//! 🪣🚀🌐 S3 Backend — the ground-to-cloud data paratrooper.
//!
//! INT. AWS CONSOLE — NIGHT. A lone bucket sits in us-east-1, waiting for CSVs.
//! Someone configured three keys for the same report. Legal wants one, finance
//! wants one, and the data lake wants one "just in case". The bytes must match.
//! Exactly. Nobody wants to explain to legal why their copy is 4KB shorter.
//!
//! This module wraps the AWS S3 SDK and exposes an [`ObjectStore`](crate::backends::ObjectStore)
//! that issues one `PutObject` per key, stamping content type, content encoding,
//! canned ACL and server-side encryption on each.
//!
//! 🧠 Knowledge graph:
//! - Same pattern as `file/`, `in_mem/`, `sqlite/`
//! - Config co-located: `S3StoreConfig` lives in `s3_store.rs`
//! - Transport: `PutRequest.body` (a `Cursor<Bytes>`) → `ByteStream::from(Bytes)` → `PutObject`
//! - Credentials: the standard AWS chain (env vars, profile, IAM role, hope)
//! - `endpoint_url` switches to path-style addressing for MinIO, R2 and friends
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

mod s3_store;

pub use s3_store::{S3Store, S3StoreConfig};
