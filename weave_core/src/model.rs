//! Descriptive, dotscope-independent view of the parts of the metadata
//! graph the weaver reasons about (spec.md §3). `weave_core::cil` builds
//! these from a loaded `dotscope::CilObject`/`CilAssembly`; every other
//! module (`filter`, `helper`, `body`, `caller_side`) works only with this
//! plain model so they stay agnostic of the underlying metadata library.

use crate::ids::{MethodId, TypeId};

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub namespace: String,
    pub simple_name: String,
    pub generic_arity: u32,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub is_compiler_generated: bool,
    pub nested: Vec<TypeInfo>,
    pub methods: Vec<MethodInfo>,
}

impl TypeInfo {
    /// Fully-qualified name, namespace-dotted (spec.md §4.2 matches against
    /// this for namespace include/exclude filtering).
    pub fn fqn(&self) -> String {
        if self.namespace.is_empty() {
            self.simple_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.simple_name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: MethodId,
    pub declaring_type_fqn: String,
    pub simple_name: String,
    pub generic_arity: u32,
    pub is_abstract: bool,
    pub is_compiler_generated: bool,
    pub has_body: bool,
    pub has_any_instructions: bool,
    /// Canonical parameter-type signature strings, used to build the
    /// caller-side canonical callee signature (spec.md §3, §4.5).
    pub param_signature: Vec<String>,
}

/// The canonical callee signature spec.md §4.5 uses to match call-site
/// targets to discovered bodyless methods, independent of which module a
/// reference to the callee originates in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalSignature {
    pub declaring_type_fqn: String,
    pub method_name: String,
    pub param_signature: Vec<String>,
}

impl CanonicalSignature {
    pub fn of(method: &MethodInfo) -> Self {
        CanonicalSignature {
            declaring_type_fqn: method.declaring_type_fqn.clone(),
            method_name: method.simple_name.clone(),
            param_signature: method.param_signature.clone(),
        }
    }
}
