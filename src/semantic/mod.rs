//! Análisis semántico.
//!
//! # Ámbitos
//! Cada bloque introduce un ámbito nuevo. Un nombre puede ocultar a otro
//! de un ámbito externo, pero no puede redefinirse dentro del mismo.
//! Las variables predefinidas viven en el ámbito más externo.
//!
//! # Tabla de símbolos
//! Cada variable recibe un [`VariableId`] único y creciente, el cual
//! también funciona como su registro virtual permanente en el IR. El
//! resultado del análisis es una [`SymbolTable`] que asocia cada uso de
//! un identificador, por su rango en el código fuente, con su id.
//!
//! # Tipos
//! No existen conversiones implícitas. Los operadores binarios y las
//! condiciones solo operan sobre `Number`, y las llamadas a funciones
//! integradas deben coincidir exactamente con la firma, excepto por el
//! comodín `Object`. El análisis se detiene en el primer error.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    grammar::Terminal,
    lex::Token,
    source::{Located, Span},
    syntax::{Expr, Statement, UnOp},
};

mod builtins;
mod scope;

pub use builtins::{Builtins, Signature, Type, TypeList, BUILTINS};
pub use scope::Scopes;

/// Identificador único de variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Error semántico.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TypeError {
    #[error("use of undefined variable identifier `{0}`")]
    UndefinedVariable(String),

    #[error("use of undefined function identifier `{0}`")]
    UndefinedFunction(String),

    #[error("redefinition of existing variable identifier `{0}`")]
    Redefinition(String),

    #[error("assign type mismatch (cannot assign {from} into {into})")]
    AssignMismatch { from: Type, into: Type },

    #[error("invalid type for operation (expected {expected} but got {found})")]
    InvalidOperand { expected: Type, found: Type },

    #[error("invalid arguments for function (expected ({expected}) but got ({found}))")]
    InvalidArguments { expected: TypeList, found: TypeList },
}

pub type Semantic<T> = Result<T, Located<TypeError>>;

/// Resultado del análisis semántico.
pub struct SymbolTable<'b> {
    token_to_vid: HashMap<Span, VariableId>,
    declarations: HashMap<Span, VariableId>,
    vid_to_type: Vec<Type>,
    functions: &'b Builtins,
}

impl<'b> SymbolTable<'b> {
    /// Variable referida por el uso de un identificador.
    pub fn use_of(&self, span: Span) -> Option<VariableId> {
        self.token_to_vid.get(&span).copied()
    }

    /// Variable introducida por una definición.
    pub fn declaration(&self, span: Span) -> Option<VariableId> {
        self.declarations.get(&span).copied()
    }

    /// Tipo declarado de una variable.
    pub fn type_of(&self, id: VariableId) -> Type {
        self.vid_to_type[id.index()]
    }

    /// Cantidad total de variables, incluyendo predefinidas.
    pub fn variables(&self) -> usize {
        self.vid_to_type.len()
    }

    /// Cantidad de usos resueltos.
    pub fn uses(&self) -> usize {
        self.token_to_vid.len()
    }

    pub fn functions(&self) -> &'b Builtins {
        self.functions
    }
}

/// Analiza un programa completo.
pub fn analyze<'b>(
    program: &[Statement],
    text: &str,
    builtins: &'b Builtins,
) -> Semantic<SymbolTable<'b>> {
    let mut analyzer = Analyzer {
        text,
        scopes: Scopes::default(),
        table: SymbolTable {
            token_to_vid: HashMap::new(),
            declarations: HashMap::new(),
            vid_to_type: Vec::new(),
            functions: builtins,
        },
    };

    for &(name, typ) in builtins.globals() {
        let id = analyzer
            .scopes
            .define(name)
            .expect("builtin globals must have distinct names");

        analyzer.set_type(id, typ);
    }

    for statement in program {
        analyzer.statement(statement)?;
    }

    let table = analyzer.table;
    tracing::debug!(
        variables = table.variables(),
        uses = table.uses(),
        "semantic analysis complete"
    );

    Ok(table)
}

struct Analyzer<'a, 'b> {
    text: &'a str,
    scopes: Scopes,
    table: SymbolTable<'b>,
}

impl Analyzer<'_, '_> {
    fn statement(&mut self, statement: &Statement) -> Semantic<()> {
        match statement {
            Statement::VarDef { typ, name, init } => {
                let declared = Type::from_name(typ.lexeme(self.text))
                    .expect("lexer only accepts known type names");

                let id_name = name.lexeme(self.text);
                if let Some(init) = init {
                    self.scopes.check_free(id_name).map_err(|e| at(e, name))?;

                    // La variable todavía no es visible en su propio inicializador
                    let found = self.expr(init)?;
                    if found != declared {
                        let error = TypeError::AssignMismatch {
                            from: found,
                            into: declared,
                        };

                        return Err(at(error, name));
                    }
                }

                let id = self.scopes.define(id_name).map_err(|e| at(e, name))?;
                self.set_type(id, declared);
                self.table.declarations.insert(name.span(), id);

                Ok(())
            }

            Statement::Expr(expr) => self.expr(expr).map(|_| ()),

            Statement::Block(statements) => {
                self.scopes.enter();
                for statement in statements {
                    self.statement(statement)?;
                }

                self.scopes.exit();
                Ok(())
            }

            Statement::If {
                keyword,
                condition,
                body,
                otherwise,
            } => {
                self.condition(keyword, condition)?;
                self.statement(body)?;

                match otherwise {
                    Some(otherwise) => self.statement(otherwise),
                    None => Ok(()),
                }
            }

            Statement::While {
                keyword,
                condition,
                body,
            } => {
                self.condition(keyword, condition)?;
                self.statement(body)
            }
        }
    }

    fn condition(&mut self, keyword: &Token, condition: &Expr) -> Semantic<()> {
        let found = self.expr(condition)?;
        expect_number(found, keyword.span())
    }

    fn expr(&mut self, expr: &Expr) -> Semantic<Type> {
        match expr {
            Expr::Assign {
                target,
                operator,
                value,
            } => {
                let id = self.resolve(target)?;
                let into = self.table.type_of(id);

                let from = self.expr(value)?;
                if from != into {
                    let error = TypeError::AssignMismatch { from, into };
                    return Err(at(error, operator));
                }

                Ok(into)
            }

            Expr::Binary(left, operator, right) => {
                expect_number(self.expr(left)?, operator.span())?;
                expect_number(self.expr(right)?, operator.span())?;

                Ok(Type::Number)
            }

            Expr::Unary(operator, operand) => {
                let found = self.expr(operand)?;
                match operator.val() {
                    UnOp::Plus => Ok(found),
                    UnOp::Negate | UnOp::Not => {
                        expect_number(found, operator.span())?;
                        Ok(Type::Number)
                    }
                }
            }

            Expr::Variable(token) => {
                let id = self.resolve(token)?;
                Ok(self.table.type_of(id))
            }

            Expr::Call { name, args } => {
                let function = name.lexeme(self.text);
                let signature = *self.table.functions.function(function).ok_or_else(|| {
                    at(TypeError::UndefinedFunction(function.to_owned()), name)
                })?;

                let found = args
                    .iter()
                    .map(|arg| self.expr(arg))
                    .collect::<Semantic<Vec<_>>>()?;

                if !signature.matches(&found) {
                    let error = TypeError::InvalidArguments {
                        expected: TypeList(signature.args.to_vec()),
                        found: TypeList(found),
                    };

                    return Err(at(error, name));
                }

                Ok(signature.ret)
            }

            Expr::Literal(token) => match token.kind() {
                Terminal::Number => Ok(Type::Number),
                Terminal::String => Ok(Type::String),
                other => unreachable!("{:?} is not a literal", other),
            },
        }
    }

    /// Resuelve un uso y lo registra en la tabla.
    fn resolve(&mut self, token: &Token) -> Semantic<VariableId> {
        let id = self
            .scopes
            .resolve(token.lexeme(self.text))
            .map_err(|error| at(error, token))?;

        self.table.token_to_vid.insert(token.span(), id);
        Ok(id)
    }

    fn set_type(&mut self, id: VariableId, typ: Type) {
        debug_assert_eq!(id.index(), self.table.vid_to_type.len());
        self.table.vid_to_type.push(typ);
    }
}

fn expect_number(found: Type, span: Span) -> Semantic<()> {
    match found {
        Type::Number => Ok(()),
        found => Err(Located::at(
            TypeError::InvalidOperand {
                expected: Type::Number,
                found,
            },
            span,
        )),
    }
}

fn at(error: TypeError, token: &Token) -> Located<TypeError> {
    Located::at(error, token.span())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, parse, syntax};

    fn check(text: &str) -> Semantic<SymbolTable<'static>> {
        let tokens = lex::tokenize(text).unwrap();
        let tree = parse::parse(&tokens, text).unwrap();

        analyze(&syntax::program(&tree), text, &BUILTINS)
    }

    fn rejected(text: &str) -> (TypeError, Span) {
        let (span, error) = match check(text) {
            Ok(_) => panic!("{:?} should not type check", text),
            Err(error) => error.split(),
        };

        (error, span)
    }

    #[test]
    fn globals_take_the_first_ids() {
        let text = "Number x = 1; print(TARGET); print(SELF); print(x);";
        let table = check(text).unwrap();

        assert_eq!(table.variables(), 3);
        assert_eq!(table.use_of(Span::new(20, 6)), Some(VariableId(0)));
        assert_eq!(table.use_of(Span::new(35, 4)), Some(VariableId(1)));
        assert_eq!(table.use_of(Span::new(48, 1)), Some(VariableId(2)));
        assert_eq!(table.declaration(Span::new(7, 1)), Some(VariableId(2)));
        assert_eq!(table.type_of(VariableId(0)), Type::Entity);
    }

    #[test]
    fn out_of_scope_use() {
        let (error, span) = rejected("{ Number x = 1; } x;");

        assert_eq!(error, TypeError::UndefinedVariable("x".into()));
        assert_eq!(span, Span::new(18, 1));
    }

    #[test]
    fn shadowing_in_inner_blocks() {
        let text = "Number x = 1; { String x = \"s\"; print(x); } x = x + 1;";
        let table = check(text).unwrap();

        assert_eq!(table.use_of(Span::new(38, 1)), Some(VariableId(3)));
        assert_eq!(table.use_of(Span::new(44, 1)), Some(VariableId(2)));
    }

    #[test]
    fn redefinition_in_the_same_scope() {
        let (error, span) = rejected("Number x = 1; Number x = 2;");

        assert_eq!(error, TypeError::Redefinition("x".into()));
        assert_eq!(span, Span::new(21, 1));
    }

    #[test]
    fn redefinition_is_checked_before_the_initializer() {
        let (error, _) = rejected("Number x; Number x = y;");
        assert_eq!(error, TypeError::Redefinition("x".into()));
    }

    #[test]
    fn initializer_cannot_see_its_own_variable() {
        let (error, span) = rejected("Number x = x;");

        assert_eq!(error, TypeError::UndefinedVariable("x".into()));
        assert_eq!(span, Span::new(11, 1));
    }

    #[test]
    fn definition_type_mismatch() {
        let (error, span) = rejected("Number x = \"a\";");

        assert_eq!(error.to_string(), "assign type mismatch (cannot assign String into Number)");
        assert_eq!(span, Span::new(7, 1));
    }

    #[test]
    fn assignment_mismatch_points_at_the_operator() {
        let (error, span) = rejected("Vector v; v = 5;");

        assert_eq!(
            error,
            TypeError::AssignMismatch {
                from: Type::Number,
                into: Type::Vector
            }
        );

        assert_eq!(span, Span::new(12, 1));
    }

    #[test]
    fn operands_must_be_numbers() {
        let (error, span) = rejected("Number x = 1 + \"a\";");

        assert_eq!(error.to_string(), "invalid type for operation (expected Number but got String)");
        assert_eq!(span, Span::new(13, 1));

        let (error, span) = rejected("Number x = -makevec(1, 2, 3);");
        assert_eq!(
            error,
            TypeError::InvalidOperand {
                expected: Type::Number,
                found: Type::Vector
            }
        );

        assert_eq!(span, Span::new(11, 1));
    }

    #[test]
    fn conditions_must_be_numbers() {
        let (_, span) = rejected("if (\"s\") { }");
        assert_eq!(span, Span::new(0, 2));

        let (error, span) = rejected("while (makevec(0, 0, 0)) { }");
        assert_eq!(span, Span::new(0, 5));
        assert!(matches!(error, TypeError::InvalidOperand { found: Type::Vector, .. }));
    }

    #[test]
    fn call_arguments() {
        let (error, span) = rejected("vadd(makevec(1, 2, 3));");

        assert_eq!(
            error.to_string(),
            "invalid arguments for function (expected (Vector, Vector) but got (Vector))"
        );

        assert_eq!(span, Span::new(0, 4));

        let (error, _) = rejected("frobnicate(1);");
        assert_eq!(error, TypeError::UndefinedFunction("frobnicate".into()));

        assert!(check("print(makevec(1, 2, 3)); String s = sify(TARGET);").is_ok());
    }

    #[test]
    fn void_results_cannot_be_stored() {
        let (error, _) = rejected("Number x = print(1);");
        assert_eq!(
            error,
            TypeError::AssignMismatch {
                from: Type::Void,
                into: Type::Number
            }
        );
    }

    #[test]
    fn assignment_expression_has_the_target_type() {
        assert!(check("Number a; Number b; a = b = 3; print(a = 4);").is_ok());
    }
}
