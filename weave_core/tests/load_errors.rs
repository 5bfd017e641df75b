//! Exercises `weave_core::weave`'s error path without a dotscope-loadable
//! fixture module, the same spirit as `bsharp_cli/tests/parse_cli.rs`
//! asserting on a specific failure mode rather than only the happy path.

use weave_core::{Config, WeaveError};

#[test]
fn weaving_a_missing_module_reports_input_not_found() {
    let config = Config::new("definitely-does-not-exist.dll".into());
    let result = weave_core::weave(&config);

    match result {
        Err(WeaveError::InputNotFound(path)) => {
            assert_eq!(path, std::path::Path::new("definitely-does-not-exist.dll"));
        }
        other => panic!("expected InputNotFound, got {other:?}"),
    }
}
