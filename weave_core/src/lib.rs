//! Invocation-count bytecode weaver (spec.md): reads a metadata-rich
//! managed-bytecode module, decides which methods are eligible, and splices
//! a per-method 32-bit invocation counter into the module — either directly
//! into a method's body, or at every call site for methods that have no
//! body of their own (abstract, interface, extern).
//!
//! `weave_core::orchestrator::weave` is the single entry point; everything
//! else is an internal stage it composes in order (spec.md §2 data flow).
//! This crate has no `main` and never prints directly — it only calls
//! `log::{info,warn,debug}!`, so a host (an editor integration, a build
//! script, or `weave_cli`) can embed it and capture output on its own
//! terms.

pub mod backup;
pub mod body;
pub mod caller_side;
pub mod cil;
pub mod config;
pub mod error;
pub mod filter;
pub mod helper;
pub mod idempotence;
pub mod ids;
pub mod instr;
pub mod model;
pub mod orchestrator;
pub mod recompact;
pub mod report;
pub mod session;
pub mod symbols;

pub use config::Config;
pub use error::{Result, WeaveError};
pub use orchestrator::weave;
pub use report::WeaveSummary;
