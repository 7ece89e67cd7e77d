//! Store adapters for the Castaway core. Currently a single in-memory
//! implementation of the `Store` port; a networked realtime-store adapter
//! plugs in here without touching the services layer.

pub mod memory;

pub use memory::MemoryStore;
