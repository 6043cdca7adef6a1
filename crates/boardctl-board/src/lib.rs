//! Board / Task Engine (spec.md §4.4): the typed task state machine,
//! dependency-block closure, multi-actor authorization, and the activity
//! log + SSE polling primitives it feeds.

pub mod activity;
pub mod authorization;
pub mod dependency;
pub mod engine;
pub mod sse;
pub mod state_machine;

pub use engine::{
    blocked_by_for_task, create_agent, create_dependency, create_task, delete_agent, delete_task,
    record_heartbeat, update_task, NewAgent, NewTask, TaskPatch,
};
