//! The execution controller: the heart of toolclaw.
//!
//! A run follows a **Request → Parse → Dispatch** cycle:
//!
//! 1. **Append** the user prompt to the task (new or continued)
//! 2. **Send** the system prompt and full history to the backend
//! 3. **Parse** the reply into prose and at most one tool call
//! 4. **If a tool call**: check the mode allows it, execute, append the
//!    result, loop back to step 2
//! 5. **If prose only**: the run is done
//!
//! The loop also stops when the step budget in [`RunConfig`] is used up.

pub mod controller;
pub mod new_task;
pub mod prompt;
pub mod run_config;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{max_steps_notice, ControllerState, ExecutionController, StepOutcome, TaskResult};
pub use new_task::NewTaskTool;
pub use prompt::{build_system_prompt, resolve_mode};
pub use run_config::RunConfig;
