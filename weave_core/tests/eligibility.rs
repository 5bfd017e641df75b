//! End-to-end exercise of the filtering/signature layer over a fabricated
//! type tree, the way `bsharp_analysis/tests/metrics_regression.rs` drives
//! its metrics functions over a fabricated syntax tree rather than a real
//! compiled program. No dotscope-loadable module is needed for this slice
//! of the pipeline since `Filter`/`CanonicalSignature` only depend on the
//! plain `weave_core::model` view.

use dotscope::metadata::token::Token;
use weave_core::config::Config;
use weave_core::filter::Filter;
use weave_core::ids::{MethodId, TypeId};
use weave_core::model::{CanonicalSignature, MethodInfo, TypeInfo};

fn method(name: &str, declaring_type: &str, has_body: bool, is_abstract: bool) -> MethodInfo {
    MethodInfo {
        id: MethodId(Token::new(0x0600_0001)),
        declaring_type_fqn: declaring_type.to_string(),
        simple_name: name.to_string(),
        generic_arity: 0,
        is_abstract,
        is_compiler_generated: false,
        has_body,
        has_any_instructions: has_body,
        param_signature: vec!["System.Int32".to_string()],
    }
}

fn ty(namespace: &str, name: &str, methods: Vec<MethodInfo>, nested: Vec<TypeInfo>) -> TypeInfo {
    TypeInfo {
        id: TypeId(Token::new(0x0200_0001)),
        namespace: namespace.to_string(),
        simple_name: name.to_string(),
        generic_arity: 0,
        is_interface: false,
        is_abstract: false,
        is_sealed: false,
        is_compiler_generated: false,
        nested,
        methods,
    }
}

/// A small module shaped like scenario S5: a kept namespace holding an
/// ordinary class plus an interface, and an excluded namespace holding a
/// class that should never show up in either eligible set.
fn sample_module() -> Vec<TypeInfo> {
    let worker = ty(
        "Demo.App",
        "Worker",
        vec![
            method("DoWork", "Demo.App.Worker", true, false),
            method("Dispose", "Demo.App.Worker", true, false),
        ],
        Vec::new(),
    );

    let ilogger = ty(
        "Demo.App",
        "ILogger",
        vec![method("Log", "Demo.App.ILogger", false, true)],
        Vec::new(),
    );

    let vendored = ty(
        "Vendor.Internal",
        "Helper",
        vec![method("Crunch", "Vendor.Internal.Helper", true, false)],
        Vec::new(),
    );

    vec![worker, ilogger, vendored]
}

#[test]
fn excluded_namespace_contributes_no_methods_to_either_set() {
    let mut config = Config::new("App.dll".into());
    config.exclude_namespaces = vec!["Vendor".to_string()];
    let filter = Filter::new(&config);

    let types = sample_module();
    let mut body_eligible = Vec::new();
    let mut caller_side_eligible = Vec::new();

    for t in &types {
        let fqn = t.fqn();
        if !filter.type_eligible(t, &fqn) {
            continue;
        }
        for m in &t.methods {
            if filter.body_eligible(m) {
                body_eligible.push(m.simple_name.clone());
            } else if filter.caller_side_eligible(m) {
                caller_side_eligible.push(m.simple_name.clone());
            }
        }
    }

    assert_eq!(body_eligible, vec!["DoWork".to_string(), "Dispose".to_string()]);
    assert_eq!(caller_side_eligible, vec!["Log".to_string()]);
}

#[test]
fn canonical_signature_matches_across_distinct_method_info_instances() {
    let declared = method("Log", "Demo.App.ILogger", false, true);
    let called = method("Log", "Demo.App.ILogger", false, true);

    assert_eq!(CanonicalSignature::of(&declared), CanonicalSignature::of(&called));

    let different_overload = method("Log", "Demo.App.ILogger", false, true);
    let mut different_overload = different_overload;
    different_overload.param_signature = vec!["System.String".to_string()];

    assert_ne!(
        CanonicalSignature::of(&declared),
        CanonicalSignature::of(&different_overload)
    );
}
