//! Wire types shared between the root process and subagent subprocesses.
//!
//! Kept free of logic: just the `SubagentEvent` shape posted to the event
//! bus (see the `eventbus` crate).

mod event;

pub use event::{SubagentEvent, SubagentEventType};
