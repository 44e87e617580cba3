//! Durable state for Student Compass
//!
//! - [`KeyValueBackend`]: raw string storage ([`FileBackend`], [`MemoryBackend`])
//! - [`PersistentStore`]: typed JSON `load`/`save` per key; unreadable
//!   values load as `None`
//! - [`StateStore`]: single owner of [`AppState`] that writes the whole
//!   state as one snapshot after every mutation, and migrates the older
//!   one-key-per-slice layout on first load
//!
//! # Example
//!
//! ```ignore
//! use compass_store::{StateStore, FileBackend, StatePatch};
//! use compass_model::ThemePreference;
//!
//! let mut store = StateStore::open(FileBackend::open("/var/lib/compass")?);
//! store.set(StatePatch::new().theme(ThemePreference::Dark))?;
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod keys;
pub mod state;
pub mod store;

pub use adapter::PersistentStore;
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use config::StoreConfig;
pub use error::StoreError;
pub use keys::StateKey;
pub use state::{AppState, StatePatch, StateSnapshot};
pub use store::StateStore;
