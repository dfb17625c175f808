//! Conversation state machine
//!
//! Elm Architecture: a pure transition function turns (state, event) into a
//! new state plus effects. The runtime executes the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, ImportPurpose};
pub use state::{ConvContext, ConvState};
pub use transition::transition;
