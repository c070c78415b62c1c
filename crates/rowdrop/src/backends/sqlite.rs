// ai
//! 🗄️🧵 SQLite Backend — rows from a file on disk, one at a time, no hoarding.
//!
//! INT. BLOCKING THREAD POOL — NIGHT. A rusqlite `Statement` sits in a thread it
//! cannot leave (it borrows its `Connection`, and the borrow checker has opinions).
//! So it does the next best thing: it passes notes. One row per note, through a
//! bounded `async_channel`, to a cursor living on the async side.
//!
//! 🧠 Knowledge graph:
//! - `SqliteDatabaseConfig`: path + channel capacity, co-located with the backend
//! - `execute` → `spawn_blocking(stream_rows)` → first event decides Connection vs Query error
//! - The first step runs before the headers are sent, so a query that prepares but
//!   fails when SQLite runs it (integer overflow, say) is a Query error, not a row error
//! - Rows flow as `SqliteEvent::Row`, the stream ends with `SqliteEvent::Done`
//! - `close()` closes the channel, so the producer's next `send_blocking` fails and it exits
//! - Dropping the cursor without closing it also closes the channel. Belt, meet suspenders.
//!
//!
//! 🔄 Values become text with Rust's own formatting. INTEGER is plain decimal. REAL
//! uses `f64`'s `Display`, the shortest text that reads back to the same float, so
//! a whole-number REAL like `2.0` is written as `2` and `1e20` as `100000000000000000000`.
//! Consumers that care about "was it a float" should cast in the query
//! (`printf('%.2f', r)`).
//!
//! 🦆 The duck is not allowed in the blocking pool. It would block.

mod sqlite_database;

pub use sqlite_database::{SqliteCursor, SqliteDatabase, SqliteDatabaseConfig};
