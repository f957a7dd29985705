//! Tool-augmented generation: one user turn in, the assistant/tool-result
//! messages it produced out. A turn is a chain of middleware around the
//! provider driver — tool loop, saving, and printing — innermost first.

mod generator;
mod openai;
mod turn;

pub use generator::{GenerateError, Generator};
pub use openai::OpenAiGenerator;
pub use turn::{run_turn, EventContext, PipelineError, PipelineOutcome, Printer};

/// Exceeding this many tool-loop iterations in one turn is treated as a
/// runaway loop rather than patience.
pub const MAX_TOOL_LOOP_ITERATIONS: u32 = 50;
