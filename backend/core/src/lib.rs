pub mod error;
pub mod session;

pub use error::BotError;
pub use session::{ConversationState, UserSession};
