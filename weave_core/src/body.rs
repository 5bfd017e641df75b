//! Body Instrumenter (spec.md §4.4): splices the four-instruction prelude
//! in front of a body-eligible method's existing instruction stream.
//!
//! Unlike the other dotscope-facing work in `cil`, splicing into an
//! *existing* method body (rather than assembling a brand-new one with
//! `MethodBuilder`) isn't exercised anywhere in dotscope's own test suite,
//! so the mutation itself sits behind the `BodyEditor` seam below and the
//! offset/branch arithmetic that has to be right regardless of which
//! concrete editor implements it is kept here, independently testable.

use crate::error::Result;
use crate::ids::{FieldId, MethodId};
use crate::instr::{prelude_instructions, Instruction, Operand, PRELUDE_LEN};

/// Mutation seam dotscope's real body editor implements; isolated so the
/// offset-shifting logic below can be unit tested against a fake.
pub trait BodyEditor {
    /// Reads a method's current instruction stream, offsets relative to the
    /// body start.
    fn read_instructions(&self, method: MethodId) -> Result<Vec<Instruction>>;

    /// Reads the method's current `max_stack` header value, before any
    /// splicing, so callers can raise it rather than guess at it (spec.md
    /// §4.4: "evaluation stack depth is recomputed, never assumed
    /// unaffected").
    fn max_stack(&self, method: MethodId) -> Result<u16>;

    /// Replaces a method's instruction stream wholesale. `max_stack` is the
    /// recomputed maximum evaluation-stack depth (spec.md §4.4: "evaluation
    /// stack depth is recomputed, never assumed unaffected"); exception
    /// handler regions are shifted by the caller before this is invoked.
    fn write_instructions(
        &mut self,
        method: MethodId,
        instructions: &[Instruction],
        max_stack: u16,
    ) -> Result<()>;

    /// Shifts every exception handler region (try/catch/filter/finally
    /// offsets) attached to `method` forward by `delta` bytes, for handlers
    /// whose start is at or after `threshold_offset` (spec.md §4.4:
    /// "exception-handler regions that start at the method's first
    /// instruction are shifted forward").
    fn shift_handler_regions(&mut self, method: MethodId, threshold_offset: u32, delta: u32) -> Result<()>;
}

/// Prepends the increment prelude to `method`'s body and rewrites every
/// branch target and handler region so the method's original semantics are
/// unchanged (spec.md §4.4, Invariant "Code-stream integrity").
///
/// Offsets in the returned instruction stream are *not* finalized byte
/// offsets — the re-compaction pass (spec.md §4.4's successor step) assigns
/// final offsets once opcode forms (short vs. long branch encodings) are
/// chosen. This function only establishes ordering and logical branch
/// targets: every original instruction's logical position shifts by
/// `PRELUDE_LEN`, and every branch target that pointed at the method's
/// first instruction (offset 0) now points at the prelude's first
/// instruction instead, so control flow that jumped to the top of the
/// method still lands there — ahead of the prelude, not inside it
/// (spec.md §4.4, "branches that target the original first instruction are
/// redirected to the prelude's first instruction").
pub fn splice_prelude<E: BodyEditor>(
    editor: &mut E,
    method: MethodId,
    counter: FieldId,
) -> Result<()> {
    let original = editor.read_instructions(method)?;
    let original_max_stack = editor.max_stack(method)?;

    let prelude: Vec<Instruction> = prelude_instructions(counter)
        .into_iter()
        .enumerate()
        .map(|(i, (opcode, operand))| Instruction {
            opcode,
            operand,
            offset: i as u32,
        })
        .collect();

    let mut spliced = Vec::with_capacity(original.len() + PRELUDE_LEN);
    spliced.extend(prelude);
    for instr in original {
        let shifted = redirect_branch_to_prelude(instr);
        spliced.push(shifted);
    }
    for (i, instr) in spliced.iter_mut().enumerate() {
        instr.offset = i as u32;
    }

    // `ldsfld`/`stsfld`/`ldc.i4.1`/`add` push at most one value at a time;
    // the prelude never needs more than 2 stack slots, so the method's
    // pre-existing max_stack only needs raising if it was below that.
    let max_stack = original_max_stack.max(PRELUDE_MAX_STACK);
    editor.write_instructions(method, &spliced, max_stack)?;
    editor.shift_handler_regions(method, 0, PRELUDE_LEN as u32)?;
    Ok(())
}

/// The prelude's own peak stack depth — `ldsfld` then `ldc.i4 1` pushes two
/// values before `add` consumes them.
const PRELUDE_MAX_STACK: u16 = 2;

/// Shifts every branch target past the prepended prelude, so a branch that
/// used to land on the method's original first instruction (logical index
/// `0`) lands on the prelude's first instruction instead, and every other
/// branch still targets the same original instruction, now at `target +
/// PRELUDE_LEN` (spec.md §4.4, "branches that target the original first
/// instruction are redirected to the prelude's first instruction").
fn redirect_branch_to_prelude(instr: Instruction) -> Instruction {
    match instr.operand {
        Operand::BranchTarget(0) => Instruction {
            operand: Operand::BranchTarget(0),
            ..instr
        },
        Operand::BranchTarget(target) => Instruction {
            operand: Operand::BranchTarget(target + PRELUDE_LEN as i32),
            ..instr
        },
        _ => instr,
    }
}
