//! Vista tipada del árbol sintáctico.
//!
//! El parser produce un árbol concreto que refleja la gramática regla
//! por regla, incluyendo capas de precedencia, paréntesis y listas
//! recursivas. Las fases posteriores no necesitan nada de eso. Este
//! módulo decodifica el árbol concreto, en un solo lugar, hacia
//! sentencias y expresiones.
//!
//! Un árbol que no corresponda a la gramática es una inconsistencia
//! interna del parser y provoca pánico.

use crate::{
    grammar::{NonTerminal, Terminal},
    lex::Token,
    parse::Tree,
    source::{Located, Span},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `T x;` o `T x = e;`.
    VarDef {
        typ: Token,
        name: Token,
        init: Option<Expr>,
    },

    /// Expresión evaluada por sus efectos.
    Expr(Expr),

    Block(Vec<Statement>),

    If {
        keyword: Token,
        condition: Expr,
        body: Box<Statement>,
        otherwise: Option<Box<Statement>>,
    },

    While {
        keyword: Token,
        condition: Expr,
        body: Box<Statement>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// `x = e`, con el token `=` como operador.
    Assign {
        target: Token,
        operator: Token,
        value: Box<Expr>,
    },

    Binary(Box<Expr>, Located<BinOp>, Box<Expr>),
    Unary(Located<UnOp>, Box<Expr>),
    Variable(Token),

    Call {
        name: Token,
        args: Vec<Expr>,
    },

    /// Número o cadena.
    Literal(Token),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Equal,
    NotEqual,
    LessEqual,
    Less,
    GreaterEqual,
    Greater,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Negate,
    Not,
    Plus,
}

impl BinOp {
    fn from_terminal(terminal: Terminal) -> Self {
        match terminal {
            Terminal::LogicalOr => BinOp::Or,
            Terminal::LogicalAnd => BinOp::And,
            Terminal::Equal => BinOp::Equal,
            Terminal::NotEqual => BinOp::NotEqual,
            Terminal::LessEqual => BinOp::LessEqual,
            Terminal::Less => BinOp::Less,
            Terminal::GreaterEqual => BinOp::GreaterEqual,
            Terminal::Greater => BinOp::Greater,
            Terminal::Plus => BinOp::Add,
            Terminal::Minus => BinOp::Sub,
            Terminal::Star => BinOp::Mul,
            Terminal::Slash => BinOp::Div,
            other => unreachable!("{:?} is not a binary operator", other),
        }
    }
}

impl Expr {
    /// Rango cubierto por la expresión completa, sin paréntesis externos.
    pub fn span(&self) -> Span {
        match self {
            Expr::Assign { target, value, .. } => target.span().to(value.span()),
            Expr::Binary(left, _, right) => left.span().to(right.span()),
            Expr::Unary(operator, operand) => operator.span().to(operand.span()),
            Expr::Variable(token) | Expr::Literal(token) => token.span(),
            Expr::Call { name, args } => match args.last() {
                Some(last) => name.span().to(last.span()),
                None => name.span(),
            },
        }
    }
}

/// Decodifica el árbol completo de un programa.
pub fn program(tree: &Tree) -> Vec<Statement> {
    match children(tree, NonTerminal::Start) {
        [statements] => statement_list(statements),
        _ => malformed(tree),
    }
}

fn statement_list(mut tree: &Tree) -> Vec<Statement> {
    // `Statements` es recursivo por la izquierda, se recorre iterativamente
    let mut statements = Vec::new();
    loop {
        match children(tree, NonTerminal::Statements) {
            [] => break,
            [rest, last] => {
                statements.push(statement(last));
                tree = rest;
            }

            _ => malformed(tree),
        }
    }

    statements.reverse();
    statements
}

fn statement(tree: &Tree) -> Statement {
    match children(tree, NonTerminal::Statement) {
        [def, _] if is(def, NonTerminal::VarDef) => var_def(def),
        [value, _] => Statement::Expr(expr(value)),
        [block] => match children(block, NonTerminal::Block) {
            [_, statements, _] => Statement::Block(statement_list(statements)),
            _ => malformed(block),
        },

        [keyword, _, condition, _, body, continuation] => {
            let otherwise = match children(continuation, NonTerminal::IfContinuation) {
                [] => None,
                [_, otherwise] => Some(Box::new(statement(otherwise))),
                _ => malformed(continuation),
            };

            Statement::If {
                keyword: leaf(keyword),
                condition: expr(condition),
                body: Box::new(statement(body)),
                otherwise,
            }
        }

        [keyword, _, condition, _, body] => Statement::While {
            keyword: leaf(keyword),
            condition: expr(condition),
            body: Box::new(statement(body)),
        },

        _ => malformed(tree),
    }
}

fn var_def(tree: &Tree) -> Statement {
    match children(tree, NonTerminal::VarDef) {
        [typ, name] => Statement::VarDef {
            typ: leaf(typ),
            name: leaf(name),
            init: None,
        },

        [typ, name, _, init] => Statement::VarDef {
            typ: leaf(typ),
            name: leaf(name),
            init: Some(expr(init)),
        },

        _ => malformed(tree),
    }
}

/// Decodifica cualquier capa de expresión.
fn expr(tree: &Tree) -> Expr {
    let symbol = match tree {
        Tree::Branch { symbol, .. } => *symbol,
        Tree::Leaf(_) => malformed(tree),
    };

    match (symbol, tree.children()) {
        (NonTerminal::Assignment, [target, operator, value]) => Expr::Assign {
            target: leaf(target),
            operator: leaf(operator),
            value: Box::new(expr(value)),
        },

        (
            NonTerminal::LogicalOr
            | NonTerminal::LogicalAnd
            | NonTerminal::Equality
            | NonTerminal::Relational
            | NonTerminal::Additive
            | NonTerminal::Multiplicative,
            [left, operator, right],
        ) => {
            let operator = leaf(operator);
            let op = Located::at(BinOp::from_terminal(operator.kind()), operator.span());

            Expr::Binary(Box::new(expr(left)), op, Box::new(expr(right)))
        }

        (NonTerminal::Unary, [_, inner, _]) => expr(inner),

        (NonTerminal::Unary, [operator, operand]) => {
            let operator = leaf(operator);
            let op = match operator.kind() {
                Terminal::Minus => UnOp::Negate,
                Terminal::Exclaim => UnOp::Not,
                Terminal::Plus => UnOp::Plus,
                _ => malformed(tree),
            };

            Expr::Unary(Located::at(op, operator.span()), Box::new(expr(operand)))
        }

        (NonTerminal::Primary, [name]) => Expr::Variable(leaf(name)),
        (NonTerminal::Primary, [name, _, args, _]) => Expr::Call {
            name: leaf(name),
            args: arguments(args),
        },

        (NonTerminal::Literal, [literal]) => Expr::Literal(leaf(literal)),

        // Capas sin operador de por medio
        (_, [inner]) => expr(inner),

        _ => malformed(tree),
    }
}

fn arguments(tree: &Tree) -> Vec<Expr> {
    let mut args = Vec::new();
    let mut next = match children(tree, NonTerminal::ArgsOpt) {
        [] => return args,
        [list] => list,
        _ => malformed(tree),
    };

    loop {
        match children(next, NonTerminal::Args) {
            [arg] => {
                args.push(expr(arg));
                break args;
            }

            [arg, _, rest] => {
                args.push(expr(arg));
                next = rest;
            }

            _ => malformed(next),
        }
    }
}

fn is(tree: &Tree, expected: NonTerminal) -> bool {
    matches!(tree, Tree::Branch { symbol, .. } if *symbol == expected)
}

fn children(tree: &Tree, expected: NonTerminal) -> &[Tree] {
    match tree {
        Tree::Branch { symbol, children, .. } if *symbol == expected => children,
        _ => malformed(tree),
    }
}

fn leaf(tree: &Tree) -> Token {
    tree.token().unwrap_or_else(|| malformed(tree))
}

fn malformed(tree: &Tree) -> ! {
    panic!("parse tree does not match the grammar at {:?}", tree.symbol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, parse};

    fn decode(text: &str) -> Vec<Statement> {
        let tokens = lex::tokenize(text).unwrap();
        program(&parse::parse(&tokens, text).unwrap())
    }

    fn single_expr(text: &str) -> Expr {
        match decode(text).as_slice() {
            [Statement::Expr(expr)] => expr.clone(),
            other => panic!("not a single expression: {:?}", other),
        }
    }

    #[test]
    fn statements_keep_source_order() {
        let statements = decode("Number a; a = 1; { a; } while (a) a;");
        assert_eq!(statements.len(), 4);
        assert!(matches!(statements[0], Statement::VarDef { init: None, .. }));
        assert!(matches!(statements[1], Statement::Expr(Expr::Assign { .. })));
        assert!(matches!(&statements[2], Statement::Block(inner) if inner.len() == 1));
        assert!(matches!(statements[3], Statement::While { .. }));
    }

    #[test]
    fn precedence_layers_collapse() {
        let expr = single_expr("1 + 2 * 3;");
        match expr {
            Expr::Binary(left, op, right) => {
                assert_eq!(*op.val(), BinOp::Add);
                assert!(matches!(*left, Expr::Literal(_)));
                assert!(matches!(*right, Expr::Binary(_, ref mul, _) if *mul.val() == BinOp::Mul));
            }

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parentheses_are_transparent() {
        let expr = single_expr("(((x)));");
        assert!(matches!(expr, Expr::Variable(_)));
    }

    #[test]
    fn call_arguments_are_in_order() {
        let text = "f(a, 1, \"s\");";
        match single_expr(text) {
            Expr::Call { name, args } => {
                assert_eq!(name.lexeme(text), "f");
                let lexemes: Vec<_> = args.iter().map(|arg| arg.span().slice(text)).collect();
                assert_eq!(lexemes, ["a", "1", "\"s\""]);
            }

            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(single_expr("g();"), Expr::Call { args, .. } if args.is_empty()));
    }

    #[test]
    fn else_branch_is_optional() {
        let statements = decode("if (a) b; else c; if (a) b;");
        assert!(matches!(&statements[0], Statement::If { otherwise: Some(_), .. }));
        assert!(matches!(&statements[1], Statement::If { otherwise: None, .. }));
    }
}
