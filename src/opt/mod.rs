//! Optimización por reutilización de registros.
//!
//! A partir de los intervalos de vida de cada registro virtual se
//! reasignan registros con un recorrido lineal, de modo que registros
//! cuyos intervalos no se traslapan compartan un mismo slot. Las
//! escrituras a registros que nunca se leen desaparecen.
//!
//! Este análisis no considera saltos hacia atrás, por lo cual puede
//! cambiar la semántica de ciclos. Por esa razón es opcional.

use std::collections::BTreeSet;

use crate::ir::{Access, Ir, Reg};

mod lifetime;
mod regs;

pub use lifetime::LifetimeChart;
pub use regs::RegisterAllocation;

/// Reasigna registros de un programa completo.
pub fn optimize(ir: &Ir) -> Ir {
    let lifetimes = LifetimeChart::of(ir);
    let mut regs = RegisterAllocation::default();
    let mut instructions = Vec::with_capacity(ir.instructions.len());

    for (index, instruction) in ir.instructions.iter().enumerate() {
        for &dead in &lifetimes.dead[index] {
            regs.release(dead);
        }

        for &alive in &lifetimes.alive[index] {
            regs.allocate(alive);
        }

        let mut rewritten = instruction.clone();
        let mut unused = false;

        rewritten.visit_mut(|reg, access| match access {
            Access::Write => match regs.write(*reg) {
                Some(slot) => *reg = slot,
                None => unused = true,
            },

            Access::Read => {
                *reg = regs
                    .read(*reg)
                    .expect("register is read outside of its lifetime");
            }
        });

        regs.finish();
        if !unused {
            instructions.push(rewritten);
        }
    }

    let registers: BTreeSet<Reg> = (0..regs.high_water()).map(Reg).collect();
    tracing::debug!(
        before = ir.instructions.len(),
        after = instructions.len(),
        registers = registers.len(),
        "register reuse complete"
    );

    Ir {
        registers,
        instructions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;

    fn imm(dest: usize, value: &str) -> Instruction {
        Instruction::ImmediateAssign {
            dest: Reg(dest),
            value: value.into(),
        }
    }

    fn text(ir: &Ir) -> Vec<String> {
        ir.instructions.iter().map(ToString::to_string).collect()
    }

    /// Repite la asignación paso a paso, verificando que los registros
    /// vivos nunca compartan slot.
    fn assert_sound(ir: &Ir) {
        let lifetimes = LifetimeChart::of(ir);
        let mut regs = RegisterAllocation::default();

        for index in 0..ir.instructions.len() {
            for &dead in &lifetimes.dead[index] {
                regs.release(dead);
            }

            for &alive in &lifetimes.alive[index] {
                regs.allocate(alive);
            }

            regs.finish();

            let slots: Vec<_> = regs.live_slots().collect();
            let distinct: BTreeSet<_> = slots.iter().copied().collect();
            assert_eq!(slots.len(), distinct.len(), "slot shared at instruction {}", index);
        }
    }

    #[test]
    fn disjoint_lifetimes_share_a_slot() {
        let ir = Ir {
            registers: (0..4).map(Reg).collect(),
            instructions: vec![
                imm(0, "1"),
                Instruction::GenericRead {
                    operands: operands!["print", Reg(0)],
                },
                imm(1, "2"),
                Instruction::GenericRead {
                    operands: operands!["print", Reg(1)],
                },
            ],
        };

        let optimized = optimize(&ir);
        assert_eq!(text(&optimized), ["$0 = mov 1", "print $0", "$0 = mov 2", "print $0"]);
        assert_eq!(optimized.registers.len(), 1);
        assert_sound(&ir);
    }

    #[test]
    fn dead_stores_are_dropped() {
        let ir = Ir {
            registers: (0..2).map(Reg).collect(),
            instructions: vec![
                imm(0, "1"),
                imm(1, "2"),
                Instruction::GenericRead {
                    operands: operands!["print", Reg(1)],
                },
            ],
        };

        assert_eq!(text(&optimize(&ir)), ["$0 = mov 2", "print $0"]);
    }

    #[test]
    fn overlapping_lifetimes_get_distinct_slots() {
        let ir = Ir {
            registers: (0..3).map(Reg).collect(),
            instructions: vec![
                imm(0, "1"),
                imm(1, "2"),
                Instruction::GenericWrite {
                    dest: Reg(2),
                    operands: operands!["add", Reg(0), Reg(1)],
                },
                Instruction::GenericRead {
                    operands: operands!["print", Reg(2)],
                },
            ],
        };

        let optimized = optimize(&ir);
        assert_eq!(
            text(&optimized),
            ["$0 = mov 1", "$1 = mov 2", "$1 = add $0 $1", "print $1"]
        );

        assert_sound(&ir);
    }
}
