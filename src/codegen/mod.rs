//! Generación de IR.
//!
//! Cada expresión se reduce a un registro nuevo que contiene su valor.
//! Las variables ocupan los registros `0..n` según su [`VariableId`] y
//! nunca se reasignan. Los temporales se numeran a partir de allí, en el
//! orden en que se solicitan.
//!
//! El flujo de control se expresa con etiquetas y saltos condicionales
//! `jmpX etiqueta a b`. Un salto incondicional es `jmpe etiqueta 0 0`.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    grammar::Terminal,
    ir::{Instruction, Ir, Reg},
    lex::Token,
    semantic::{SymbolTable, VariableId},
    source::Located,
    syntax::{BinOp, Expr, Statement, UnOp},
};

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoweringError {
    #[error("identifier `{0}` has no resolved variable")]
    Unresolved(String),
}

pub type Lower<T> = Result<T, Located<LoweringError>>;

/// Genera IR para un programa ya validado.
pub fn lower(program: &[Statement], table: &SymbolTable<'_>, text: &str) -> Lower<Ir> {
    let mut lowering = Lowering {
        text,
        table,
        registers: (0..table.variables()).map(Reg).collect(),
        instructions: Vec::new(),
        next_label: 0,
    };

    for statement in program {
        lowering.statement(statement)?;
    }

    let ir = Ir {
        registers: lowering.registers,
        instructions: lowering.instructions,
    };

    tracing::debug!(
        registers = ir.registers.len(),
        instructions = ir.instructions.len(),
        "lowering complete"
    );

    Ok(ir)
}

struct Lowering<'a, 'b> {
    text: &'a str,
    table: &'a SymbolTable<'b>,
    registers: BTreeSet<Reg>,
    instructions: Vec<Instruction>,
    next_label: usize,
}

impl Lowering<'_, '_> {
    fn statement(&mut self, statement: &Statement) -> Lower<()> {
        match statement {
            Statement::VarDef { init: None, .. } => (),

            Statement::VarDef {
                name,
                init: Some(init),
                ..
            } => {
                let var = self.variable(self.table.declaration(name.span()), name)?;
                let value = self.expr(init)?;

                self.assign(var, value);
            }

            Statement::Expr(expr) => {
                self.expr(expr)?;
            }

            Statement::Block(statements) => {
                for statement in statements {
                    self.statement(statement)?;
                }
            }

            Statement::If {
                condition,
                body,
                otherwise,
                ..
            } => {
                let else_label = self.label();
                let end = self.label();

                let condition = self.expr(condition)?;
                emit!(self, "jmpe", &else_label, condition, "0");

                self.statement(body)?;
                emit!(self, "jmpe", &end, "0", "0");
                emit!(self, "label", &else_label);

                if let Some(otherwise) = otherwise {
                    self.statement(otherwise)?;
                }

                emit!(self, "label", &end);
            }

            Statement::While {
                condition, body, ..
            } => {
                let begin = self.label();
                let exit = self.label();

                emit!(self, "label", &begin);
                let condition = self.expr(condition)?;
                emit!(self, "jmpe", &exit, condition, "0");

                self.statement(body)?;
                emit!(self, "jmpe", &begin, "0", "0");
                emit!(self, "label", &exit);
            }
        }

        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Lower<Reg> {
        match expr {
            Expr::Literal(token) => {
                let lexeme = token.lexeme(self.text);
                let value = match token.kind() {
                    Terminal::String => &lexeme[1..lexeme.len() - 1],
                    _ => lexeme,
                };

                let result = self.fresh();
                self.push(Instruction::ImmediateAssign {
                    dest: result,
                    value: value.to_owned(),
                });

                Ok(result)
            }

            Expr::Variable(token) => {
                let var = self.variable(self.table.use_of(token.span()), token)?;
                let result = self.fresh();
                self.assign(result, var);

                Ok(result)
            }

            Expr::Assign { target, value, .. } => {
                let var = self.variable(self.table.use_of(target.span()), target)?;
                let value = self.expr(value)?;
                let result = self.fresh();

                self.assign(var, value);
                self.assign(result, var);

                Ok(result)
            }

            Expr::Unary(operator, operand) => match operator.val() {
                UnOp::Plus => self.expr(operand),

                UnOp::Negate => {
                    let operand = self.expr(operand)?;
                    let result = self.fresh();
                    emit!(self, result => "mul", operand, "-1");

                    Ok(result)
                }

                UnOp::Not => {
                    let operand = self.expr(operand)?;
                    let result = self.fresh();
                    let if_true = self.label();
                    let end = self.label();

                    emit!(self, "jmpe", &if_true, operand, "0");
                    self.boolean_tail(result, &if_true, &end, ["0", "1"]);

                    Ok(result)
                }
            },

            Expr::Binary(left, operator, right) => {
                let result = self.fresh();
                match operator.val() {
                    BinOp::Or | BinOp::And => {
                        let (jump, values) = match operator.val() {
                            BinOp::Or => ("jmpne", ["0", "1"]),
                            _ => ("jmpe", ["1", "0"]),
                        };

                        let decided = self.label();
                        let end = self.label();

                        let left = self.expr(left)?;
                        emit!(self, jump, &decided, left, "0");
                        let right = self.expr(right)?;
                        emit!(self, jump, &decided, right, "0");

                        self.boolean_tail(result, &decided, &end, values);
                    }

                    op => {
                        let left = self.expr(left)?;
                        let right = self.expr(right)?;

                        match arithmetic(*op) {
                            Ok(opcode) => emit!(self, result => opcode, left, right),
                            Err(jump) => {
                                let if_true = self.label();
                                let end = self.label();

                                emit!(self, jump, &if_true, left, right);
                                self.boolean_tail(result, &if_true, &end, ["0", "1"]);
                            }
                        }
                    }
                }

                Ok(result)
            }

            Expr::Call { name, args } => {
                let result = self.fresh();

                let mut operands = operands![name.lexeme(self.text)];
                for arg in args {
                    operands.push(self.expr(arg)?.into());
                }

                self.push(Instruction::GenericWrite {
                    dest: result,
                    operands,
                });

                Ok(result)
            }
        }
    }

    /// Materializa un resultado booleano tras un salto condicional.
    ///
    /// `values` es el par (sin saltar, saltando).
    fn boolean_tail(&mut self, result: Reg, taken: &str, end: &str, values: [&str; 2]) {
        let [fallthrough, jumped] = values;

        self.immediate(result, fallthrough);
        emit!(self, "jmpe", end, "0", "0");
        emit!(self, "label", taken);
        self.immediate(result, jumped);
        emit!(self, "label", end);
    }

    fn variable(&self, id: Option<VariableId>, token: &Token) -> Lower<Reg> {
        match id {
            Some(id) => Ok(Reg(id.index())),
            None => {
                let name = token.lexeme(self.text).to_owned();
                Err(Located::at(LoweringError::Unresolved(name), token.span()))
            }
        }
    }

    fn assign(&mut self, dest: Reg, src: Reg) {
        self.push(Instruction::RegisterAssign { dest, src });
    }

    fn immediate(&mut self, dest: Reg, value: &str) {
        self.push(Instruction::ImmediateAssign {
            dest,
            value: value.to_owned(),
        });
    }

    fn fresh(&mut self) -> Reg {
        let reg = Reg(self.registers.len());
        self.registers.insert(reg);

        reg
    }

    fn label(&mut self) -> String {
        let label = format!("__L{}", self.next_label);
        self.next_label += 1;

        label
    }

    fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }
}

/// Código de operación aritmético, o bien el salto de una comparación.
fn arithmetic(op: BinOp) -> Result<&'static str, &'static str> {
    match op {
        BinOp::Add => Ok("add"),
        BinOp::Sub => Ok("sub"),
        BinOp::Mul => Ok("mul"),
        BinOp::Div => Ok("div"),
        BinOp::Equal => Err("jmpe"),
        BinOp::NotEqual => Err("jmpne"),
        BinOp::Greater => Err("jmpg"),
        BinOp::GreaterEqual => Err("jmpge"),
        BinOp::LessEqual => Err("jmple"),
        BinOp::Less => Err("jmpl"),
        BinOp::Or | BinOp::And => unreachable!("short-circuit operators have no opcode"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, parse, semantic, syntax};

    fn lines(text: &str) -> Vec<String> {
        let tokens = lex::tokenize(text).unwrap();
        let program = syntax::program(&parse::parse(&tokens, text).unwrap());
        let table = semantic::analyze(&program, text, &semantic::BUILTINS).unwrap();

        lower(&program, &table, text)
            .unwrap()
            .instructions
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn definition_with_initializer() {
        assert_eq!(lines("Number x = 5;"), ["$3 = mov 5", "$2 = mov $3"]);
        assert!(lines("Number x;").is_empty());
    }

    #[test]
    fn string_quotes_are_stripped() {
        assert_eq!(lines("String s = \"hola\";"), ["$3 = mov hola", "$2 = mov $3"]);
    }

    #[test]
    fn reads_copy_into_fresh_registers() {
        assert_eq!(
            lines("Number x; Number y = x + 1;"),
            ["$5 = mov $2", "$6 = mov 1", "$4 = add $5 $6", "$3 = mov $4"]
        );
    }

    #[test]
    fn assignment_expression() {
        assert_eq!(
            lines("Number x; x = 7;"),
            ["$3 = mov 7", "$2 = mov $3", "$4 = mov $2"]
        );
    }

    #[test]
    fn unary_operators() {
        assert_eq!(lines("-1;"), ["$2 = mov 1", "$3 = mul $2 -1"]);
        assert_eq!(lines("+1;"), ["$2 = mov 1"]);
        assert_eq!(
            lines("!1;"),
            [
                "$2 = mov 1",
                "jmpe __L0 $2 0",
                "$3 = mov 0",
                "jmpe __L1 0 0",
                "label __L0",
                "$3 = mov 1",
                "label __L1",
            ]
        );
    }

    #[test]
    fn comparisons_materialize_booleans() {
        assert_eq!(
            lines("1 <= 2;"),
            [
                "$3 = mov 1",
                "$4 = mov 2",
                "jmple __L0 $3 $4",
                "$2 = mov 0",
                "jmpe __L1 0 0",
                "label __L0",
                "$2 = mov 1",
                "label __L1",
            ]
        );
    }

    #[test]
    fn logical_and_jumps_to_false() {
        assert_eq!(
            lines("1 && 0;"),
            [
                "$3 = mov 1",
                "jmpe __L0 $3 0",
                "$4 = mov 0",
                "jmpe __L0 $4 0",
                "$2 = mov 1",
                "jmpe __L1 0 0",
                "label __L0",
                "$2 = mov 0",
                "label __L1",
            ]
        );
    }

    #[test]
    fn logical_or_skips_the_right_operand() {
        let text = "Number a = 1 || checkblock(makevec(0, 0, 0), \"stone\");";
        let lines = lines(text);

        let first_jump = lines.iter().position(|line| line.starts_with("jmpne __L0")).unwrap();
        let call = lines.iter().position(|line| line.contains("checkblock")).unwrap();
        let target = lines.iter().position(|line| line == "label __L0").unwrap();

        assert!(first_jump < call);
        assert!(call < target);
    }

    #[test]
    fn if_else_layout() {
        assert_eq!(
            lines("if (1) 2; else 3;"),
            [
                "$2 = mov 1",
                "jmpe __L0 $2 0",
                "$3 = mov 2",
                "jmpe __L1 0 0",
                "label __L0",
                "$4 = mov 3",
                "label __L1",
            ]
        );
    }

    #[test]
    fn while_layout() {
        assert_eq!(
            lines("while (0) { }"),
            [
                "label __L0",
                "$2 = mov 0",
                "jmpe __L1 $2 0",
                "jmpe __L0 0 0",
                "label __L1",
            ]
        );
    }

    #[test]
    fn calls_allocate_their_result_first() {
        assert_eq!(
            lines("print(SELF);"),
            ["$3 = mov $1", "$2 = print $3"]
        );
    }

    #[test]
    fn unresolved_tokens_are_reported() {
        let text = "x;";
        let tokens = lex::tokenize(text).unwrap();
        let program = syntax::program(&parse::parse(&tokens, text).unwrap());

        // Una tabla sin el uso de `x`
        let table = semantic::analyze(&[], text, &semantic::BUILTINS).unwrap();
        let error = lower(&program, &table, text).unwrap_err();

        assert_eq!(error.val(), &LoweringError::Unresolved("x".into()));
    }
}
