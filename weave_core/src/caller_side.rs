//! Caller-Side Instrumenter (spec.md §4.5): for methods that have no body
//! of their own (abstract methods, interface members, externs), the
//! increment is spliced at every call site instead of inside the callee.
//!
//! Two passes, run across the whole module before any splicing happens,
//! mirror `bsharp_vm_ir`'s build-then-link staging (collect every
//! definition before resolving references against the complete set):
//!
//! * **Pass A (discovery):** walk every caller-side-eligible method found
//!   by the filter and record its `CanonicalSignature` in an
//!   `InstrumentationContext`, allocating (but not yet placing) a counter
//!   field for each one.
//! * **Pass B (site scan):** walk every method body in the module looking
//!   for `call`/`callvirt` instructions whose resolved target signature is
//!   a key in the context; each matching site gets the same 4-instruction
//!   prelude spliced immediately before the call instruction.

use std::collections::HashMap;

use crate::body::BodyEditor;
use crate::error::Result;
use crate::helper::{Allocator, CounterStore};
use crate::ids::{FieldId, MethodId};
use crate::instr::{prelude_instructions, Instruction, Opcode, Operand};
use crate::model::{CanonicalSignature, MethodInfo};

/// Discovered caller-side targets, keyed by canonical callee signature so a
/// call site can be matched regardless of which module the reference to it
/// was resolved through (spec.md §3, §4.5).
#[derive(Default)]
pub struct InstrumentationContext {
    targets: HashMap<CanonicalSignature, FieldId>,
}

impl InstrumentationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_for(&self, sig: &CanonicalSignature) -> Option<FieldId> {
        self.targets.get(sig).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Pass A: registers one counter field per caller-side-eligible method,
/// namespaced under the method's own declaring type's helper (spec.md
/// §4.3: the helper always belongs to the *declaring* type, never the
/// caller's).
pub fn discover<S: CounterStore>(
    store: &mut S,
    index: &mut crate::helper::HelperIndex,
    config: &crate::config::Config,
    declaring_namespace: &HashMap<String, String>,
    methods: &[MethodInfo],
) -> Result<InstrumentationContext> {
    let mut ctx = InstrumentationContext::new();
    let mut alloc = Allocator::new(store, index, config);

    for method in methods {
        let simple_type_name = method
            .declaring_type_fqn
            .rsplit('.')
            .next()
            .unwrap_or(&method.declaring_type_fqn);
        let namespace = declaring_namespace
            .get(&method.declaring_type_fqn)
            .cloned()
            .unwrap_or_default();

        let helper = alloc.get_or_create_helper(&namespace, simple_type_name)?;
        let field = alloc.get_or_create_counter_field(helper, &method.simple_name)?;

        ctx.targets.insert(CanonicalSignature::of(method), field);
    }

    Ok(ctx)
}

/// Pass B: scans one caller method's body for call instructions whose
/// resolved target is a key in `ctx`, and splices the prelude immediately
/// before each matching site (spec.md §4.5). A single body can contain
/// more than one call to the same or different tracked targets; each gets
/// its own prelude.
///
/// Every branch target elsewhere in the body is shifted by however many
/// prelude instructions were inserted strictly before it, so a branch whose
/// original target gained a prelude now lands on that prelude's first
/// instruction, and any other branch still lands on the same original
/// instruction, wherever it ended up (spec.md §4.4's redirection rule
/// applied at each of this pass's possibly-many insertion points, rather
/// than the single fixed one the body splicer handles).
pub fn instrument_call_sites<E: BodyEditor>(
    editor: &mut E,
    caller: MethodId,
    ctx: &InstrumentationContext,
    resolve_target: impl Fn(&Instruction) -> Option<CanonicalSignature>,
) -> Result<usize> {
    let original = editor.read_instructions(caller)?;

    let mut counters: Vec<Option<FieldId>> = Vec::with_capacity(original.len());
    for instr in &original {
        let field = if instr.opcode.is_call() {
            resolve_target(instr).and_then(|sig| ctx.counter_for(&sig))
        } else {
            None
        };
        counters.push(field);
    }

    // `inserted_before[i]` is the number of prelude instructions inserted
    // at indices strictly before original index `i`; a branch landing on
    // index `t` is shifted to `t + inserted_before[t]`, which resolves to
    // the prelude's first instruction when `t` itself gained one.
    let mut inserted_before = Vec::with_capacity(original.len());
    let mut running = 0usize;
    for field in &counters {
        inserted_before.push(running);
        if field.is_some() {
            running += crate::instr::PRELUDE_LEN;
        }
    }

    let mut spliced = Vec::with_capacity(original.len() + running);
    let mut inserted = 0usize;

    for (i, instr) in original.into_iter().enumerate() {
        if let Some(field) = counters[i] {
            for (opcode, operand) in prelude_instructions(field) {
                spliced.push(Instruction { opcode, operand, offset: 0 });
            }
            inserted += 1;
        }
        let shifted = shift_branch_target(instr, &inserted_before);
        spliced.push(shifted);
    }
    for (i, instr) in spliced.iter_mut().enumerate() {
        instr.offset = i as u32;
    }

    if inserted > 0 {
        let original_max_stack = editor.max_stack(caller)?;
        editor.write_instructions(caller, &spliced, original_max_stack.max(2))?;
        editor.shift_handler_regions(caller, 0, (inserted * crate::instr::PRELUDE_LEN) as u32)?;
    }

    Ok(inserted)
}

/// Resolves a `BranchTarget` logical index against `inserted_before`, a
/// per-original-index table of how many prelude instructions were inserted
/// ahead of it. Indices out of range (shouldn't occur for well-formed
/// input) pass through unshifted rather than panicking.
fn shift_branch_target(instr: Instruction, inserted_before: &[usize]) -> Instruction {
    match instr.operand {
        Operand::BranchTarget(target) if target >= 0 => {
            let shift = inserted_before.get(target as usize).copied().unwrap_or(0);
            Instruction {
                operand: Operand::BranchTarget(target + shift as i32),
                ..instr
            }
        }
        _ => instr,
    }
}
