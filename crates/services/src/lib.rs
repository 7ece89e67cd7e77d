//! Business logic for the Castaway core: condition resolution, live
//! snapshot streams, bottle sessions, the spatial index, discovery
//! orchestration, chat, presence, and the creation flow. Adapters for the
//! ports these services consume live in their own crates.

pub mod bottles;
pub mod chat;
pub mod collection;
pub mod creation;
pub mod discovery;
pub mod presence;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod spatial;
