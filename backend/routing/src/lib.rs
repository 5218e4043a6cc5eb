//! Conversation routing.
//!
//! Each inbound text runs through an ordered rule table: cancel first when a
//! flow is active, then assessment answers, then the awaiting-location
//! reminder, then intent keywords, then FAQ, then the default reply.
//! Keyword matching is case-insensitive containment with first class wins,
//! so the lists stay curated against cross-class substring collisions.

pub mod router;
pub mod texts;

pub use router::MessageRouter;
