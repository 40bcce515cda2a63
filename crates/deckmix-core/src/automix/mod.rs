//! Automix - queue, crossfade transitions and the scheduler driving them

mod queue;
mod scheduler;
mod transition;

pub use queue::*;
pub use scheduler::*;
pub use transition::*;
