//! Re-optimizer / recompaction pass (spec.md §3 "Code-stream integrity",
//! §4.4 ordering guarantees): after every splice for a method is in place,
//! assigns final byte offsets, picks short vs. long opcode forms for
//! branches, and resolves each `Operand::BranchTarget` from a logical
//! instruction position back into a byte offset.
//!
//! Grounded on `bsharp_vm_ir`'s optimizer stage, which runs a fixed-point
//! pass over an instruction list choosing compact encodings and only
//! finalizing offsets once no further shrink is possible — branch reach
//! depends on the very offsets being decided, so a single forward pass
//! isn't sound in general. This module runs that same fixed point, bounded
//! by the fact CIL only has two branch encoding widths (short, 1-byte
//! signed displacement; long, 4-byte signed displacement) so it converges
//! in at most as many iterations as there are branch instructions.

use crate::instr::{Instruction, Opcode, Operand};

const SHORT_BRANCH_SIZE: u32 = 2;
const LONG_BRANCH_SIZE: u32 = 5;
const SHORT_BRANCH_RANGE: i64 = 127;

fn is_branch(opcode: &Opcode) -> bool {
    matches!(opcode, Opcode::Br | Opcode::BrS | Opcode::Brtrue | Opcode::Brfalse)
}

fn instruction_size(opcode: &Opcode, is_short_form: bool) -> u32 {
    match opcode {
        Opcode::Br | Opcode::BrS => {
            if is_short_form {
                SHORT_BRANCH_SIZE
            } else {
                LONG_BRANCH_SIZE
            }
        }
        Opcode::Brtrue | Opcode::Brfalse => {
            if is_short_form {
                SHORT_BRANCH_SIZE
            } else {
                LONG_BRANCH_SIZE
            }
        }
        Opcode::Ldsfld | Opcode::Stsfld | Opcode::Call | Opcode::Callvirt => 5,
        Opcode::LdcI4 => 5,
        Opcode::Add | Opcode::Ret | Opcode::Nop => 1,
        Opcode::Other(_) => 1,
    }
}

/// Assigns final byte offsets to `instructions` (given in logical, already
/// spliced order) and resolves every `BranchTarget(logical_index)` operand
/// into a real displacement, preferring the short form whenever the
/// resulting displacement fits in a signed byte (spec.md §3). Operands
/// that are `BranchTarget` are expected to carry the *logical index* of
/// the target instruction in `instructions`, not a byte offset — callers
/// upstream of this pass (the body splicer, the caller-side splicer) deal
/// purely in logical order.
pub fn recompact(mut instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut short_form = vec![true; instructions.len()];

    loop {
        let offsets = assign_offsets(&instructions, &short_form);
        let mut changed = false;

        for (i, instr) in instructions.iter().enumerate() {
            if !is_branch(&instr.opcode) || !short_form[i] {
                continue;
            }
            if let Operand::BranchTarget(target_index) = instr.operand {
                let next_offset = offsets[i] + instruction_size(&instr.opcode, true);
                let target_offset = offsets[target_index as usize];
                let displacement = target_offset as i64 - next_offset as i64;
                if displacement < -SHORT_BRANCH_RANGE - 1 || displacement > SHORT_BRANCH_RANGE {
                    short_form[i] = false;
                    changed = true;
                }
            }
        }

        if !changed {
            let final_offsets = offsets;
            for (i, instr) in instructions.iter_mut().enumerate() {
                instr.offset = final_offsets[i];
                if let Operand::BranchTarget(target_index) = instr.operand {
                    let is_short = short_form[i];
                    let next_offset = final_offsets[i] + instruction_size(&instr.opcode, is_short);
                    let target_offset = final_offsets[target_index as usize];
                    instr.operand = Operand::BranchTarget(target_offset as i32 - next_offset as i32);
                }
            }
            return instructions;
        }
    }
}

fn assign_offsets(instructions: &[Instruction], short_form: &[bool]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(instructions.len());
    let mut cursor = 0u32;
    for (i, instr) in instructions.iter().enumerate() {
        offsets.push(cursor);
        cursor += instruction_size(&instr.opcode, short_form[i]);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_code_gets_sequential_offsets() {
        let instrs = vec![
            Instruction { opcode: Opcode::Ldsfld, operand: Operand::None, offset: 0 },
            Instruction { opcode: Opcode::LdcI4, operand: Operand::None, offset: 0 },
            Instruction { opcode: Opcode::Add, operand: Operand::None, offset: 0 },
            Instruction { opcode: Opcode::Ret, operand: Operand::None, offset: 0 },
        ];
        let result = recompact(instrs);
        assert_eq!(result[0].offset, 0);
        assert_eq!(result[1].offset, 5);
        assert_eq!(result[2].offset, 10);
        assert_eq!(result[3].offset, 11);
    }

    #[test]
    fn short_branch_within_range_stays_short() {
        let instrs = vec![
            Instruction { opcode: Opcode::BrS, operand: Operand::BranchTarget(1), offset: 0 },
            Instruction { opcode: Opcode::Ret, operand: Operand::None, offset: 0 },
        ];
        let result = recompact(instrs);
        assert_eq!(result[0].offset, 0);
        assert_eq!(result[1].offset, SHORT_BRANCH_SIZE);
        assert_eq!(result[0].operand, Operand::BranchTarget(0));
    }

    #[test]
    fn branch_spanning_too_far_widens_to_long_form() {
        let mut instrs = vec![Instruction {
            opcode: Opcode::Br,
            operand: Operand::BranchTarget(201),
            offset: 0,
        }];
        for _ in 0..200 {
            instrs.push(Instruction { opcode: Opcode::Nop, operand: Operand::None, offset: 0 });
        }
        instrs.push(Instruction { opcode: Opcode::Ret, operand: Operand::None, offset: 0 });

        let result = recompact(instrs);
        assert_eq!(result[0].offset, 0);
        let target_offset = result[201].offset;
        let displacement = match result[0].operand {
            Operand::BranchTarget(d) => d,
            _ => panic!("expected branch target"),
        };
        assert_eq!(target_offset as i32, displacement + LONG_BRANCH_SIZE as i32);
    }
}
