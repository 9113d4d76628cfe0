//! LoopList store: loops, check-ins and cheers over a key-value snapshot.
//!
//! `LoopStore` owns the whole state in memory and rewrites it through a
//! `KvStore` after every change. `SqliteKv` is the durable backend.

pub mod notify;
pub mod seed;
pub mod storage;
pub mod store;

pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use storage::{KvStore, MemoryKv, SqliteKv, StorageError};
pub use store::{CheerOutcome, LoopStore, StoreError, StoreSettings};
