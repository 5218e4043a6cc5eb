//! Health assessment for PM2.5 exposure symptoms.
//!
//! A fixed nine-question sequence (six symptom questions, then three risk
//! factor questions), numeric answers scored per option, and a tiered
//! recommendation derived from the total. The FAQ knowledge base lives here
//! too since its answers share the same static-content style.

pub mod faq;
pub mod questions;
pub mod scoring;
pub mod sequencer;

pub use scoring::recommend;
pub use sequencer::Assessment;
