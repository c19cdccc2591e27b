//! Shared lobby state and chat command handling
//!
//! There is at most one lobby per process. Players open it, join it, and once
//! enough of them are ready the bot pings everyone and closes it.

pub mod command;
pub mod coordinator;
pub mod instance;
pub mod messages;

// Re-export commonly used types
pub use command::Command;
pub use coordinator::{
    CloseReason, CoordinatorStats, DispatchOutcome, LobbyCoordinator, LobbyRules, Rejection,
    Transition,
};
pub use instance::Lobby;
