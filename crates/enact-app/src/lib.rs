//! Use case orchestration for enact.
//!
//! This crate provides the application layer: the script interpreter, the two enforcement
//! backends, the per-run accumulator, and receipt assembly. The engine does the enforcing; this
//! crate decides what gets enforced, in which order, and what a failure means for the run.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod backend;
mod delegating;
mod error;
mod facts;
mod in_process;
mod interpreter;
mod receipt;
mod run;
mod script;
mod state;

#[cfg(test)]
mod test_support;

pub use backend::{
    BlockOutcome, CodeBlockBackend, EnforcementBackend, EnforcementResult, ScriptBackend,
};
pub use delegating::DelegatingBackend;
pub use error::RunError;
pub use facts::collect_facts;
pub use in_process::InProcessBackend;
pub use interpreter::Interpreter;
pub use receipt::{build_receipt, serialize_receipt};
pub use run::{
    Abort, RunInput, RunOutcome, RunOutput, build_backend, execute_script, exit_code_for, run_script,
};
pub use script::{
    Action, Condition, ConditionDecl, ConditionTest, Loop, Script, ScriptError, ScriptFileV1, Step,
    StepDecl, parse_script,
};
pub use state::ScriptRunState;
