// ai
//! 📂 Previously, on "Things That Could Go Wrong With A Directory"...
//!
//! The disk was quiet. Too quiet. A lone process had been told to "just drop the
//! export in a folder". Simple, they said. Then someone configured a key of
//! `../../etc/passwd` and the folder got very interesting very quickly.
//!
//! This module is the local-disk object store: every key becomes a file path under
//! a configured root. Handy for dry runs, for air-gapped boxes, and for tests that
//! want to `cat` the result.
//!
//! 🚰 replicator → PutRequest → FileStore → BufWriter → `<root>/<key>`
//! 💀 Disk full → your problem now
//! 🦆 (mandatory, no notes)

mod file_store;

pub use file_store::{FileStore, FileStoreConfig};
