//! `WeaveSummary` (SPEC_FULL.md §3 supplemental feature): a serde-derived
//! report of one weave run, in the shape of `bsharp_analysis`'s
//! `AnalysisReport` — a `schema_version` field plus plain counts, meant to
//! be machine-read by a calling build step rather than only printed.

use serde::Serialize;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct WeaveSummary {
    pub schema_version: u32,
    pub module: String,
    pub types_scanned: usize,
    pub methods_body_instrumented: usize,
    pub methods_caller_side_instrumented: usize,
    pub call_sites_instrumented: usize,
    pub helper_types_created: usize,
    pub counter_fields_created: usize,
    pub skipped_already_instrumented: bool,
    pub warnings: Vec<String>,
}

impl WeaveSummary {
    pub fn new(module: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            module,
            types_scanned: 0,
            methods_body_instrumented: 0,
            methods_caller_side_instrumented: 0,
            call_sites_instrumented: 0,
            helper_types_created: 0,
            counter_fields_created: 0,
            skipped_already_instrumented: false,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
