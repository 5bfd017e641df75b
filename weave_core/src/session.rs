//! Explicit per-run state container (spec.md §9 redesign note: "no
//! process-wide singletons — every piece of mutable cross-method state is
//! constructed fresh per run and passed explicitly"). `WeaveSession` is
//! that container: one instance lives for the duration of a single
//! `orchestrator::weave` call and is never reused across modules.

use crate::caller_side::InstrumentationContext;
use crate::helper::HelperIndex;

/// Bundles the two pieces of state that used to be natural candidates for
/// module-level statics in a naive port — the helper/field cache and the
/// caller-side discovery table — so they're constructed once per weave run
/// and threaded through explicitly instead.
pub struct WeaveSession {
    pub helpers: HelperIndex,
    pub caller_targets: InstrumentationContext,
}

impl WeaveSession {
    pub fn new() -> Self {
        Self {
            helpers: HelperIndex::new(),
            caller_targets: InstrumentationContext::new(),
        }
    }
}

impl Default for WeaveSession {
    fn default() -> Self {
        Self::new()
    }
}
