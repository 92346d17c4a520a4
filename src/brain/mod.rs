//! Behavior controller module
//!
//! The brain: a finite state machine orchestrating senses, motor, and
//! combat into patrol/alert/chase/attack/search/return behavior, ticked
//! once per simulation frame.

mod agent;
mod fsm;
mod sequence;
mod states;

pub use agent::{Agent, BrainCtx, SessionFlags};
pub use fsm::{BehaviorState, State, StateMachine, Transition};
pub use sequence::{ReturnSequence, SequenceStatus, WakeUpSequence};
pub use states::{
    AlertState, AttackState, BreakWallState, ChaseState, DeadState, InvestigateState, PassiveMode,
    PassiveState, PatrolState, ReturnState,
};
