//! Conversation session storage.
//!
//! One [`UserSession`](dustline_core::UserSession) per LINE user id, held in
//! memory and snapshotted wholesale to a JSON file on every mutation.
//! Sessions idle for longer than the timeout are skipped when the snapshot is
//! reloaded; the file itself is only compacted by the next full rewrite.

pub mod locks;
pub mod store;

pub use locks::UserLocks;
pub use store::SessionStore;
