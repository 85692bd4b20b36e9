use std::collections::BTreeMap;

use crate::ir::{Access, Ir, Reg};

/// Eventos de vida de registros virtuales, uno por instrucción.
///
/// Un intervalo de vida inicia en la escritura de un registro y termina
/// en la última lectura antes de la siguiente escritura. Los intervalos
/// que nunca se leen no aparecen.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LifetimeChart {
    pub alive: Vec<Vec<Reg>>,
    pub dead: Vec<Vec<Reg>>,
}

#[derive(Copy, Clone)]
struct Interval {
    last_write: usize,
    last_read: Option<usize>,
}

impl LifetimeChart {
    /// Analiza la vida de cada registro en un programa lineal.
    ///
    /// Los saltos no se consideran: el programa se trata como si se
    /// ejecutara de principio a fin.
    pub fn of(ir: &Ir) -> Self {
        let length = ir.instructions.len();
        let mut chart = LifetimeChart {
            alive: vec![Vec::new(); length],
            dead: vec![Vec::new(); length],
        };

        let mut intervals: BTreeMap<Reg, Interval> = ir
            .registers
            .iter()
            .map(|&reg| {
                let interval = Interval {
                    last_write: 0,
                    last_read: None,
                };

                (reg, interval)
            })
            .collect();

        for (index, instruction) in ir.instructions.iter().enumerate() {
            instruction.visit(|reg, access| {
                let interval = intervals.entry(reg).or_insert(Interval {
                    last_write: 0,
                    last_read: None,
                });

                match access {
                    Access::Read => interval.last_read = Some(index),
                    Access::Write => chart.close(reg, interval, index),
                }
            });
        }

        for (&reg, interval) in intervals.iter_mut() {
            chart.close(reg, interval, length);
        }

        chart
    }

    fn close(&mut self, reg: Reg, interval: &mut Interval, now: usize) {
        if let Some(last_read) = interval.last_read {
            self.alive[interval.last_write].push(reg);
            self.dead[last_read].push(reg);
        }

        *interval = Interval {
            last_write: now,
            last_read: None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;

    fn imm(dest: usize) -> Instruction {
        Instruction::ImmediateAssign {
            dest: Reg(dest),
            value: "1".into(),
        }
    }

    fn mov(dest: usize, src: usize) -> Instruction {
        Instruction::RegisterAssign {
            dest: Reg(dest),
            src: Reg(src),
        }
    }

    fn ir(registers: usize, instructions: Vec<Instruction>) -> Ir {
        Ir {
            registers: (0..registers).map(Reg).collect(),
            instructions,
        }
    }

    #[test]
    fn intervals_span_write_to_last_read() {
        let chart = LifetimeChart::of(&ir(3, vec![imm(0), imm(1), mov(2, 0), mov(2, 1)]));

        assert_eq!(chart.alive, [vec![Reg(0)], vec![Reg(1)], vec![], vec![]]);
        assert_eq!(chart.dead, [vec![], vec![], vec![Reg(0)], vec![Reg(1)]]);
    }

    #[test]
    fn unread_writes_have_no_interval() {
        let chart = LifetimeChart::of(&ir(1, vec![imm(0), imm(0)]));

        assert!(chart.alive.iter().all(Vec::is_empty));
        assert!(chart.dead.iter().all(Vec::is_empty));
    }

    #[test]
    fn rewrites_split_intervals() {
        // $0 = 1; $1 = $0; $0 = 1; $1 = $0
        let chart = LifetimeChart::of(&ir(2, vec![imm(0), mov(1, 0), imm(0), mov(1, 0)]));

        assert_eq!(chart.alive[0], [Reg(0)]);
        assert_eq!(chart.dead[1], [Reg(0)]);
        assert_eq!(chart.alive[2], [Reg(0)]);
        assert_eq!(chart.dead[3], [Reg(0)]);
    }

    #[test]
    fn reads_without_writes_start_at_zero() {
        let chart = LifetimeChart::of(&ir(2, vec![imm(1), mov(1, 0)]));

        assert_eq!(chart.alive[0], [Reg(0)]);
        assert_eq!(chart.dead[1], [Reg(0)]);
    }
}
