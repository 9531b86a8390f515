//! Agent session state and the tool-calling turn loop

pub mod confirm;
pub mod orchestrator;
pub mod session;

pub use confirm::{parse_confirmation, Confirmation, ConfirmationHandler, TurnObserver};
pub use orchestrator::{Orchestrator, NO_OUTPUT_SENTINEL};
pub use session::Session;
