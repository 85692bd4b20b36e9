//! Representación intermedia.
//!
//! El IR es una lista lineal de instrucciones sobre registros virtuales
//! ilimitados. Los primeros registros corresponden a variables del
//! programa, el resto son temporales. Las etiquetas, literales y códigos
//! de operación son átomos de texto sin interpretar.

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
};

/// Registro virtual.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub usize);

impl Display for Reg {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "${}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Atom(String),
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(fmt, "{}", reg),
            Operand::Atom(atom) => fmt.write_str(atom),
        }
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl From<&str> for Operand {
    fn from(atom: &str) -> Self {
        Operand::Atom(atom.to_owned())
    }
}

impl From<&String> for Operand {
    fn from(atom: &String) -> Self {
        Operand::Atom(atom.clone())
    }
}

impl From<String> for Operand {
    fn from(atom: String) -> Self {
        Operand::Atom(atom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `$d = mov valor`
    ImmediateAssign { dest: Reg, value: String },

    /// `$d = mov $s`
    RegisterAssign { dest: Reg, src: Reg },

    /// `$d = op ...`
    GenericWrite { dest: Reg, operands: Vec<Operand> },

    /// `op ...`
    GenericRead { operands: Vec<Operand> },
}

/// Acceso a un registro desde una instrucción.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Instruction {
    /// Registro escrito por la instrucción, si alguno.
    pub fn dest(&self) -> Option<Reg> {
        match self {
            Instruction::ImmediateAssign { dest, .. }
            | Instruction::RegisterAssign { dest, .. }
            | Instruction::GenericWrite { dest, .. } => Some(*dest),
            Instruction::GenericRead { .. } => None,
        }
    }

    /// Visita cada registro, reportando la escritura antes que las lecturas.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(Reg, Access),
    {
        if let Some(dest) = self.dest() {
            visitor(dest, Access::Write);
        }

        match self {
            Instruction::ImmediateAssign { .. } => (),
            Instruction::RegisterAssign { src, .. } => visitor(*src, Access::Read),
            Instruction::GenericWrite { operands, .. } | Instruction::GenericRead { operands } => {
                for operand in operands {
                    if let Operand::Reg(reg) = operand {
                        visitor(*reg, Access::Read);
                    }
                }
            }
        }
    }

    /// Como [`Instruction::visit()`], pero permite reemplazar registros.
    pub fn visit_mut<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Reg, Access),
    {
        match self {
            Instruction::ImmediateAssign { dest, .. } => visitor(dest, Access::Write),
            Instruction::RegisterAssign { dest, src } => {
                visitor(dest, Access::Write);
                visitor(src, Access::Read);
            }

            Instruction::GenericWrite { dest, operands } => {
                visitor(dest, Access::Write);
                visit_operands(operands, visitor);
            }

            Instruction::GenericRead { operands } => visit_operands(operands, visitor),
        }
    }
}

fn visit_operands<F>(operands: &mut [Operand], mut visitor: F)
where
    F: FnMut(&mut Reg, Access),
{
    for operand in operands {
        if let Operand::Reg(reg) = operand {
            visitor(reg, Access::Read);
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = match self {
            Instruction::ImmediateAssign { dest, value } => {
                return write!(fmt, "{} = mov {}", dest, value)
            }

            Instruction::RegisterAssign { dest, src } => return write!(fmt, "{} = mov {}", dest, src),
            Instruction::GenericWrite { dest, operands } => {
                write!(fmt, "{} = ", dest)?;
                operands
            }

            Instruction::GenericRead { operands } => operands,
        };

        let mut operands = operands.iter();
        if let Some(first) = operands.next() {
            write!(fmt, "{}", first)?;
            for operand in operands {
                write!(fmt, " {}", operand)?;
            }
        }

        Ok(())
    }
}

/// Programa completo en IR.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ir {
    pub registers: BTreeSet<Reg>,
    pub instructions: Vec<Instruction>,
}

impl Display for Ir {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "#lang std20")?;
        for instruction in &self.instructions {
            writeln!(fmt, "{}", instruction)?;
        }

        Ok(())
    }
}
