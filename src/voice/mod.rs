//! Voice command core
//!
//! This module turns finalized transcripts into HUD mode changes, spoken
//! replies and deep links, and runs the face enrollment interview.

pub mod commands;
pub mod conversation;
pub mod effects;
pub mod last_command;
pub mod lifecycle;
pub mod mode;
pub mod session;

pub use commands::{CommandInterpreter, CommandRule, Links};
pub use conversation::{ConversationEngine, ConversationError, ConversationState, DraftIdentity};
pub use effects::{Effect, EffectLog, Effects};
pub use last_command::LastCommand;
pub use lifecycle::{LifecycleError, ListenerEvent, ListenerLifecycle, ListenerState};
pub use mode::Mode;
pub use session::{Dispatch, SessionError, VoiceSession};
