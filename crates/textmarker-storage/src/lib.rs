//! # textmarker-storage
//!
//! Reference implementations of the engine's [`HighlightStore`] contract:
//!
//! - [`MemoryStore`] — plain in-memory map, non-durable; tests and demos.
//! - [`FileStore`] — JSON file namespaced by a caller-supplied key, durable
//!   across runs.
//! - [`ChannelStore`] — request/response message passing with correlation
//!   ids and a caller-side timeout, for backends living in another context
//!   (paired with [`StoreServer`]).
//!
//! All adapters enforce the same contract: `save`/`update` validate anchors
//! before persisting anything, and `update`/`remove` on an unknown id fail
//! with a not-found error.
//!
//! [`HighlightStore`]: textmarker_engine::store::HighlightStore

mod channel;
mod file;
mod memory;

pub use channel::{ChannelStore, StoreServer, channel_store_pair};
pub use file::FileStore;
pub use memory::MemoryStore;

pub use textmarker_engine::store::{HighlightStore, StorageError};
