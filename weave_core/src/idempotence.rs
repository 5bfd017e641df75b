//! Idempotence Guard (spec.md §4.6, Invariant "Idempotence"): refuses to
//! weave a module that already carries instrumentation, rather than
//! producing double-counted or duplicate-field output.

/// True if any field in the module already starts with `prefix` — the
/// signature left behind by a prior weave run (spec.md §4.6). Checked
/// against every field on every top-level and nested type; the orchestrator
/// runs this before Filter, Allocator, or either Instrumenter ever touch
/// the module, so a repeat run is a clean no-op exit rather than a
/// double-counted one.
pub fn already_instrumented(field_names: &[String], prefix: &str) -> bool {
    field_names.iter().any(|name| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_prior_run_via_prefixed_field_name() {
        let names = vec!["value".to_string(), "_invokeCount_Bar".to_string()];
        assert!(already_instrumented(&names, "_invokeCount_"));
    }

    #[test]
    fn clean_module_has_no_prefixed_fields() {
        let names = vec!["value".to_string(), "count".to_string()];
        assert!(!already_instrumented(&names, "_invokeCount_"));
    }

    #[test]
    fn custom_prefix_is_respected() {
        let names = vec!["cov_Bar".to_string()];
        assert!(already_instrumented(&names, "cov_"));
        assert!(!already_instrumented(&names, "_invokeCount_"));
    }
}
