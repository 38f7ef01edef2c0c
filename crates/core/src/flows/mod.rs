pub mod engine;
pub mod parse;
pub mod script;
pub mod states;

pub use engine::{
    FlowDefinition, FlowEngine, FlowReply, FlowTransitionError, GardenIntakeFlow, IntakeFlow,
    TransitionOutcome,
};
pub use script::{Script, Step, StepId, StepKind, COMPLETION_MESSAGE};
pub use states::{Cursor, FenceCursor, FenceStage, FlowState, PendingQueue, PendingSplit, SubFlow};
