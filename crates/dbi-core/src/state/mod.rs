//! Command dispatch state machine.

pub mod handlers;
pub mod machine;

pub use handlers::{HandleResult, HandlerContext, handle_command};
pub use machine::DispatchState;
