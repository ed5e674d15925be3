pub mod engine;
pub mod states;

pub use engine::{LifecycleDefinition, LifecycleEngine, MotorQuoteLifecycle, TransitionError};
pub use states::{LifecycleAction, LifecycleEvent, TransitionOutcome};
