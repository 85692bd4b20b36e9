/// Construye una lista de operandos a partir de registros y átomos.
macro_rules! operands {
    ($($operand:expr),* $(,)?) => {
        vec![$(crate::ir::Operand::from($operand)),*]
    };
}

/// Agrega una instrucción genérica a una secuencia en construcción.
///
/// `emit!(sink, dest => op, ...)` escribe en `dest`, `emit!(sink, op, ...)`
/// solo lee sus operandos.
macro_rules! emit {
    ($sink:expr, $dest:expr => $($operand:expr),+) => {
        $sink.push(crate::ir::Instruction::GenericWrite {
            dest: $dest,
            operands: operands![$($operand),+],
        })
    };

    ($sink:expr, $($operand:expr),+) => {
        $sink.push(crate::ir::Instruction::GenericRead {
            operands: operands![$($operand),+],
        })
    };
}
