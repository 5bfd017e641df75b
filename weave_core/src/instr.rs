//! Read-side instruction model (spec.md §3: "Instruction: opcode, operand
//! (constant / metadata reference / branch target), its position in the
//! list"). This is a tagged-variant view over whatever dotscope's
//! disassembler hands back for one CIL instruction — used by the
//! caller-side scanner to recognize call sites and by the body rewriter to
//! replay a method's original instructions after splicing the prelude in
//! front of them.
//!
//! Per spec.md §9's polymorphic-metadata-items note, operands are an
//! explicit discriminated union rather than a trait object.

use dotscope::metadata::token::Token;

use crate::ids::FieldId;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    I32(i32),
    I64(i64),
    /// A metadata token: method, field, type, or string reference.
    Token(Token),
    /// A branch target, given as the *logical index* of the target
    /// instruction within whatever instruction list it currently appears in
    /// — not a byte offset. `cil::AssemblyBodyEditor::read_instructions`
    /// converts the disassembler's real byte offsets into this form as soon
    /// as a body is read; `recompact::recompact` is what turns it back into
    /// a real displacement, once, right before the final write.
    BranchTarget(i32),
    Switch(Vec<i32>),
}

/// The subset of CIL opcodes the weaver cares about by name; everything
/// else round-trips through `Other` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Ldsfld,
    Stsfld,
    LdcI4,
    Add,
    Call,
    Callvirt,
    Ret,
    Br,
    BrS,
    Brtrue,
    Brfalse,
    Other(String),
}

impl Opcode {
    /// Maps a disassembler mnemonic (e.g. `"callvirt"`, `"ldsfld"`) to our
    /// opcode model. Unknown mnemonics are preserved as `Other` so the body
    /// rewriter can still replay them verbatim.
    pub fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic {
            "nop" => Opcode::Nop,
            "ldsfld" => Opcode::Ldsfld,
            "stsfld" => Opcode::Stsfld,
            "ldc.i4" | "ldc.i4.s" => Opcode::LdcI4,
            "add" => Opcode::Add,
            "call" => Opcode::Call,
            "callvirt" => Opcode::Callvirt,
            "ret" => Opcode::Ret,
            "br" => Opcode::Br,
            "br.s" => Opcode::BrS,
            "brtrue" | "brtrue.s" => Opcode::Brtrue,
            "brfalse" | "brfalse.s" => Opcode::Brfalse,
            other => Opcode::Other(other.to_string()),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Opcode::Call | Opcode::Callvirt)
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
    /// Byte offset of this instruction within the original method body.
    pub offset: u32,
}

/// The four-instruction increment sequence spliced at a prelude site
/// (spec.md §4.4, glossary "Prelude"): `ldsfld; ldc.i4 1; add; stsfld`.
pub const PRELUDE_LEN: usize = 4;

pub fn prelude_instructions(counter: FieldId) -> [(Opcode, Operand); PRELUDE_LEN] {
    [
        (Opcode::Ldsfld, Operand::Token(counter.0)),
        (Opcode::LdcI4, Operand::I32(1)),
        (Opcode::Add, Operand::None),
        (Opcode::Stsfld, Operand::Token(counter.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_mnemonics_round_trip_as_other() {
        assert_eq!(Opcode::from_mnemonic("ldloc.0"), Opcode::Other("ldloc.0".to_string()));
    }

    #[test]
    fn callvirt_and_call_are_recognized_as_calls() {
        assert!(Opcode::from_mnemonic("call").is_call());
        assert!(Opcode::from_mnemonic("callvirt").is_call());
        assert!(!Opcode::from_mnemonic("ret").is_call());
    }
}
