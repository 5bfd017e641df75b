//! Per-type and per-method eligibility (spec.md §4.2).

use crate::config::Config;
use crate::model::{MethodInfo, TypeInfo};

pub struct Filter<'a> {
    config: &'a Config,
}

impl<'a> Filter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Whether `ty` itself (ignoring its nested types) should be
    /// instrumented. Nested types are walked independently — a type's
    /// namespace position is inherited from its enclosing type, but
    /// eligibility is still decided per-type (spec.md §4.2).
    pub fn type_eligible(&self, ty: &TypeInfo, namespace_fqn: &str) -> bool {
        if ty.is_compiler_generated && !self.config.instrument_compiler_generated {
            return false;
        }
        self.namespace_allowed(namespace_fqn)
    }

    fn namespace_allowed(&self, fqn: &str) -> bool {
        if self
            .config
            .exclude_namespaces
            .iter()
            .any(|ns| prefix_matches(fqn, ns))
        {
            return false;
        }
        if self.config.include_namespaces.is_empty() {
            return true;
        }
        self.config
            .include_namespaces
            .iter()
            .any(|ns| prefix_matches(fqn, ns))
    }

    /// Eligible for body instrumentation (spec.md §4.2): has a body, is not
    /// abstract, is not compiler-generated. Property accessors have no
    /// special case — they are ordinary methods to the filter.
    pub fn body_eligible(&self, method: &MethodInfo) -> bool {
        if method.is_compiler_generated && !self.config.instrument_compiler_generated {
            return false;
        }
        method.has_body && !method.is_abstract
    }

    /// Eligible for caller-side instrumentation (spec.md §4.2): abstract,
    /// or otherwise bodyless (interface members, externs/native imports).
    pub fn caller_side_eligible(&self, method: &MethodInfo) -> bool {
        if method.is_compiler_generated && !self.config.instrument_compiler_generated {
            return false;
        }
        method.is_abstract || !method.has_body
    }
}

/// Prefix-match against a fully qualified type name, per spec.md §4.2. A
/// namespace entry matches `Demo.Keep` against `Demo.Keep.Sub.Type` but not
/// against `Demo.KeepAlive.Type` — the match must land on a namespace
/// boundary (an exact match, or followed by `.`).
fn prefix_matches(fqn: &str, ns: &str) -> bool {
    fqn == ns || fqn.starts_with(&format!("{ns}."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MethodId, TypeId};
    use dotscope::metadata::token::Token;

    fn ty(namespace: &str, name: &str, compiler_generated: bool) -> TypeInfo {
        TypeInfo {
            id: TypeId(Token::new(0x0200_0001)),
            namespace: namespace.to_string(),
            simple_name: name.to_string(),
            generic_arity: 0,
            is_interface: false,
            is_abstract: false,
            is_sealed: false,
            is_compiler_generated: compiler_generated,
            nested: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn method(has_body: bool, is_abstract: bool, compiler_generated: bool) -> MethodInfo {
        MethodInfo {
            id: MethodId(Token::new(0x0600_0001)),
            declaring_type_fqn: "Demo.Foo".to_string(),
            simple_name: "Bar".to_string(),
            generic_arity: 0,
            is_abstract,
            is_compiler_generated: compiler_generated,
            has_body,
            has_any_instructions: has_body,
            param_signature: Vec::new(),
        }
    }

    #[test]
    fn exclude_takes_precedence_over_include() {
        let mut cfg = Config::new("App.dll".into());
        cfg.include_namespaces = vec!["Demo.Keep".to_string()];
        cfg.exclude_namespaces = vec!["Demo.Keep.Skip".to_string()];
        let filter = Filter::new(&cfg);

        assert!(filter.namespace_allowed("Demo.Keep.A"));
        assert!(!filter.namespace_allowed("Demo.Keep.Skip.B"));
        assert!(!filter.namespace_allowed("Demo.Other.C"));
    }

    #[test]
    fn empty_include_means_all_not_excluded() {
        let mut cfg = Config::new("App.dll".into());
        cfg.exclude_namespaces = vec!["System".to_string()];
        let filter = Filter::new(&cfg);

        assert!(filter.namespace_allowed("Demo.Foo"));
        assert!(!filter.namespace_allowed("System.Collections"));
    }

    #[test]
    fn namespace_prefix_match_respects_boundaries() {
        let mut cfg = Config::new("App.dll".into());
        cfg.exclude_namespaces = vec!["Demo.Keep".to_string()];
        let filter = Filter::new(&cfg);

        assert!(!filter.namespace_allowed("Demo.Keep.Sub"));
        assert!(filter.namespace_allowed("Demo.KeepAlive"));
    }

    #[test]
    fn compiler_generated_types_are_skipped_by_default() {
        let cfg = Config::new("App.dll".into());
        let filter = Filter::new(&cfg);
        let generated = ty("Demo", "<>c__DisplayClass0", true);
        assert!(!filter.type_eligible(&generated, "Demo.<>c__DisplayClass0"));
    }

    #[test]
    fn body_vs_caller_side_eligibility_partition_methods() {
        let cfg = Config::new("App.dll".into());
        let filter = Filter::new(&cfg);

        let normal = method(true, false, false);
        assert!(filter.body_eligible(&normal));
        assert!(!filter.caller_side_eligible(&normal));

        let abstract_method = method(false, true, false);
        assert!(!filter.body_eligible(&abstract_method));
        assert!(filter.caller_side_eligible(&abstract_method));

        let extern_method = method(false, false, false);
        assert!(!filter.body_eligible(&extern_method));
        assert!(filter.caller_side_eligible(&extern_method));
    }
}
