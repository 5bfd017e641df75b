//! Stable arena-style identifiers (spec.md §9: "arena-allocated nodes with
//! stable indices; references between nodes are indices into the arena, not
//! owning pointers"). A metadata token is already exactly that kind of
//! index into dotscope's table arena, so we newtype it rather than invent a
//! parallel numbering scheme.

use dotscope::metadata::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub Token);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub Token);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub Token);

/// Identifies one loaded module among the assembly plus its resolved
/// dependencies (spec.md §3: Module.references table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);
