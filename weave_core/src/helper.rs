//! Counter Store Allocator (spec.md §4.3): gets-or-creates the companion
//! helper type for a target type, and the per-method counter field on it.
//!
//! Counters live on a separate non-generic helper type rather than on the
//! method's declaring type because per-instantiation statics would
//! fragment counts across each closed generic instantiation, and the
//! caller may not always know which instantiations exist; one non-generic
//! holder gives one counter per method definition across all
//! instantiations (spec.md §4.3 rationale, verified by S2 in §8).

use std::collections::HashMap;

use dotscope::metadata::token::Token;

use crate::config::{Config, HELPER_SUFFIX};
use crate::error::Result;
use crate::ids::{FieldId, TypeId};

/// `(namespace, sanitized type name)` → helper type, process-scoped to one
/// weave run (spec.md §3 HelperIndex).
#[derive(Default)]
pub struct HelperIndex {
    by_fqn: HashMap<String, TypeId>,
    fields: HashMap<(TypeId, String), FieldId>,
    /// Counts of helper types/fields actually created this run (as opposed
    /// to found pre-existing or already cached), surfaced in
    /// `WeaveSummary::helper_types_created`/`counter_fields_created`.
    helpers_created: usize,
    fields_created: usize,
}

impl HelperIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn helpers_created(&self) -> usize {
        self.helpers_created
    }

    pub fn fields_created(&self) -> usize {
        self.fields_created
    }

    pub fn get_helper(&self, helper_fqn: &str) -> Option<TypeId> {
        self.by_fqn.get(helper_fqn).copied()
    }

    pub fn record_helper(&mut self, helper_fqn: String, id: TypeId) {
        self.by_fqn.insert(helper_fqn, id);
    }

    pub fn get_field(&self, helper: TypeId, field_name: &str) -> Option<FieldId> {
        self.fields.get(&(helper, field_name.to_string())).copied()
    }

    pub fn record_field(&mut self, helper: TypeId, field_name: String, id: FieldId) {
        self.fields.insert((helper, field_name), id);
    }
}

/// Replaces the generic-arity delimiter (backtick) with `_`, preserving the
/// arity digits so `Foo` and `` Foo`1 `` never collide on the same helper
/// name (spec.md §3 invariant "Helper-type naming"). Per spec.md §9 Open
/// Question 2, other punctuation (`<`, `>`, `.`, `|`) is left untouched
/// here — only method names go through the broader sanitizer below.
pub fn sanitize_generic_arity(simple_name: &str) -> String {
    simple_name.replace('`', "_")
}

pub fn helper_type_name(simple_name: &str) -> String {
    format!("{}{}", sanitize_generic_arity(simple_name), HELPER_SUFFIX)
}

pub fn helper_fqn(namespace: &str, simple_name: &str) -> String {
    let name = helper_type_name(simple_name);
    if namespace.is_empty() {
        name
    } else {
        format!("{namespace}.{name}")
    }
}

/// Replaces `<`, `>`, `.`, `|` with `_` (spec.md §3 invariant
/// "Field-naming"). Note (spec.md §9 Open Question 2): this collapses some
/// distinct overload names onto the same sanitized string — e.g. an
/// explicit interface implementation `IFoo.Bar` and a plain `Bar` both
/// sanitize to `Bar`. When that happens `get_or_create_counter_field`
/// returns the pre-existing field, silently merging their counts. This is
/// observed upstream behavior, not a guarantee of correctness.
pub fn sanitize_method_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | '.' | '|' => '_',
            other => other,
        })
        .collect()
}

pub fn counter_field_name(prefix: &str, method_name: &str) -> String {
    format!("{prefix}{}", sanitize_method_name(method_name))
}

/// Thin seam for the mutation dotscope performs when a helper/field must be
/// created. Kept as a trait so `helper::Allocator` can be unit tested
/// against a fake without a real assembly.
pub trait CounterStore {
    /// Returns the existing helper type for `helper_fqn`, checking the
    /// module's existing types before creating a new one.
    fn find_existing_helper(&self, helper_fqn: &str) -> Option<TypeId>;

    /// Creates a new public/sealed/abstract, non-generic helper type in
    /// `namespace`, appended as a top-level type (never nested).
    fn create_helper(&mut self, namespace: &str, helper_simple_name: &str) -> Result<TypeId>;

    fn find_existing_field(&self, helper: TypeId, field_name: &str) -> Option<FieldId>;

    /// Creates a public static `UInt32` field named `field_name` on
    /// `helper`.
    fn create_counter_field(&mut self, helper: TypeId, field_name: &str) -> Result<FieldId>;
}

pub struct Allocator<'a, S: CounterStore> {
    store: &'a mut S,
    index: &'a mut HelperIndex,
    prefix: String,
}

impl<'a, S: CounterStore> Allocator<'a, S> {
    pub fn new(store: &'a mut S, index: &'a mut HelperIndex, config: &Config) -> Self {
        Self {
            store,
            index,
            prefix: config.field_prefix.clone(),
        }
    }

    pub fn get_or_create_helper(&mut self, namespace: &str, simple_name: &str) -> Result<TypeId> {
        let fqn = helper_fqn(namespace, simple_name);

        if let Some(id) = self.index.get_helper(&fqn) {
            return Ok(id);
        }
        if let Some(id) = self.store.find_existing_helper(&fqn) {
            self.index.record_helper(fqn, id);
            return Ok(id);
        }

        let helper_name = helper_type_name(simple_name);
        let id = self.store.create_helper(namespace, &helper_name)?;
        self.index.record_helper(fqn, id);
        self.index.helpers_created += 1;
        Ok(id)
    }

    pub fn get_or_create_counter_field(
        &mut self,
        helper: TypeId,
        method_simple_name: &str,
    ) -> Result<FieldId> {
        let field_name = counter_field_name(&self.prefix, method_simple_name);

        if let Some(id) = self.index.get_field(helper, &field_name) {
            return Ok(id);
        }
        if let Some(id) = self.store.find_existing_field(helper, &field_name) {
            self.index.record_field(helper, field_name, id);
            return Ok(id);
        }

        let id = self.store.create_counter_field(helper, &field_name)?;
        self.index.record_field(helper, field_name, id);
        self.index.fields_created += 1;
        Ok(id)
    }
}
