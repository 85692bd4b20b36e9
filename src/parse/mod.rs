//! Análisis sintáctico.
//!
//! # Earley
//! El parser es un reconocedor de Earley sobre la gramática fija de
//! [`crate::grammar`]. Se construye un chart con una columna por cada
//! frontera entre tokens. Cada columna contiene estados parciales
//! `(regla, punto, origen)` sin repetir; cuando dos derivaciones llegan
//! al mismo estado sus backpointers se fusionan.
//!
//! # Reconstrucción
//! Si la última columna contiene la regla inicial completa, el árbol
//! concreto se reconstruye siguiendo backpointers desde ese estado. Ver
//! [`Tree`].
//!
//! # Errores
//! Si la entrada es rechazada, se ubica la columna más lejana en la que
//! algún estado logró progresar y se reporta el símbolo que ese estado
//! esperaba. Esto localiza el error en el primer token que ninguna
//! derivación pudo aceptar.

use std::fmt::{self, Display};

use thiserror::Error;

use crate::{
    grammar::{NonTerminal, Symbol},
    lex::Token,
    source::{Located, Span},
};

mod chart;
mod tree;

pub use chart::{Backpointer, Chart, Column, State};
pub use tree::Tree;

/// Posición relativa del token señalado por un error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Context {
    Before,
    After,
}

impl Display for Context {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            Context::Before => "before",
            Context::After => "after",
        })
    }
}

/// Error de sintaxis.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} {context} `{found}`")]
    Expected {
        expected: Symbol,
        context: Context,
        found: String,
    },

    #[error("unexpected token after {}", .after.label())]
    Unexpected { after: NonTerminal },
}

/// Parsea una secuencia de tokens.
///
/// Los tokens descartables se ignoran. `text` es el texto del cual se
/// obtuvieron los tokens.
pub fn parse(tokens: &[Token], text: &str) -> Result<Tree, Located<ParseError>> {
    let tokens: Vec<Token> = tokens
        .iter()
        .copied()
        .filter(|token| !token.kind().is_skippable())
        .collect();

    let chart = Chart::build(&tokens);
    tracing::debug!(
        tokens = tokens.len(),
        states = chart.columns().iter().map(Column::len).sum::<usize>(),
        "chart built"
    );

    match chart.accepted() {
        Some(index) => {
            let builder = tree::Builder {
                chart: &chart,
                tokens: &tokens,
                end_of_text: text.len(),
            };

            Ok(builder.build(tokens.len(), index))
        }

        None => Err(diagnose(&chart, &tokens, text)),
    }
}

/// Determina el error más informativo para una entrada rechazada.
fn diagnose(chart: &Chart, tokens: &[Token], text: &str) -> Located<ParseError> {
    // La columna cero siempre progresa, pues `Statements` es anulable
    let (boundary, column) = chart
        .columns()
        .iter()
        .enumerate()
        .rev()
        .find(|(_, column)| column.states().iter().any(|state| state.dot() > 0))
        .expect("first chart column never progresses");

    let progressed = || column.states().iter().rev().filter(|state| state.dot() > 0);
    let state = progressed()
        .find(|state| !state.is_complete())
        .or_else(|| progressed().next())
        .expect("column was chosen for having progress");

    let (context, span) = match tokens.get(boundary) {
        Some(token) => (Context::Before, token.span()),
        None => match tokens.last() {
            Some(token) => (Context::After, token.span()),
            None => (Context::After, Span::empty(text.len())),
        },
    };

    let error = match state.next_symbol() {
        Some(expected) => ParseError::Expected {
            expected,
            context,
            found: span.slice(text).to_owned(),
        },

        None => ParseError::Unexpected {
            after: state.rule().lhs,
        },
    };

    Located::at(error, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::Terminal, lex};

    fn parse_text(text: &str) -> Result<Tree, Located<ParseError>> {
        parse(&lex::tokenize(text).unwrap(), text)
    }

    fn chart_for(text: &str) -> Chart {
        let tokens: Vec<_> = lex::tokenize(text)
            .unwrap()
            .into_iter()
            .filter(|token| !token.kind().is_skippable())
            .collect();

        Chart::build(&tokens)
    }

    /// Hojas del árbol, de izquierda a derecha.
    fn leaves(tree: &Tree) -> Vec<Token> {
        match tree {
            Tree::Leaf(token) => vec![*token],
            Tree::Branch { children, .. } => children.iter().flat_map(leaves).collect(),
        }
    }

    fn find<'t>(tree: &'t Tree, symbol: NonTerminal, out: &mut Vec<&'t Tree>) {
        if tree.symbol() == Symbol::N(symbol) {
            out.push(tree);
        }

        for child in tree.children() {
            find(child, symbol, out);
        }
    }

    const CORPUS: &[&str] = &[
        "",
        "Number x = 5;",
        "Number x; x = 3 + 4 * 2 - 1 / 7;",
        "Vector v = makevec(1, 2, 3); print(sify(vx(v)));",
        "Number a = 1; Number b = 2; a = b = a + b;",
        "if (a < b && !c || d == e) { x; } else { y; }",
        "while (i <= 10) { i = i + 1; if (i != 3) { print(i); } }",
        "{ { Number x = -(+1); } String s = \"hola\"; }",
        "print(); explode(entpos(TARGET), 2.5);",
        "if (x) { } else if (y) { z; } else { w; }",
        "Number z = ((1 + 2) * 3) >= 4 > 5; // fin",
    ];

    #[test]
    fn corpus_is_accepted() {
        for text in CORPUS {
            let tree = parse_text(text).unwrap_or_else(|error| panic!("{:?}: {}", text, error));
            let expected: Vec<_> = lex::tokenize(text)
                .unwrap()
                .into_iter()
                .filter(|token| !token.kind().is_skippable())
                .collect();

            assert_eq!(leaves(&tree), expected);
        }
    }

    #[test]
    fn corpus_is_unambiguous() {
        for text in CORPUS {
            assert!(chart_for(text).ambiguities().is_empty(), "{:?} is ambiguous", text);
        }
    }

    #[test]
    fn reconstruction_is_deterministic() {
        for text in CORPUS {
            assert_eq!(parse_text(text).unwrap(), parse_text(text).unwrap());
        }
    }

    #[test]
    fn operators_associate_to_the_left() {
        let tree = parse_text("x = 1 - 2 - 3;").unwrap();
        let mut additive = Vec::new();
        find(&tree, NonTerminal::Additive, &mut additive);

        // El nodo más externo cubre toda la resta, su hijo izquierdo `1 - 2`
        let outer = additive[0];
        assert_eq!(outer.span(), Span::new(4, 9));
        assert_eq!(outer.children()[0].span(), Span::new(4, 5));
    }

    #[test]
    fn dangling_else_binds_to_the_nearest_if() {
        let text = "if (a) if (b) x; else y;";
        assert!(!chart_for(text).ambiguities().is_empty());

        let tree = parse_text(text).unwrap();
        let mut continuations = Vec::new();
        find(&tree, NonTerminal::IfContinuation, &mut continuations);

        // En preorden, la continuación del `if` interno aparece primero
        assert_eq!(continuations.len(), 2);
        assert_eq!(continuations[0].children()[0].token().map(|t| t.kind()), Some(Terminal::Else));
        assert!(continuations[1].children().is_empty());
    }

    #[test]
    fn empty_branches_have_empty_spans() {
        let tree = parse_text("print();").unwrap();
        let mut args = Vec::new();
        find(&tree, NonTerminal::ArgsOpt, &mut args);

        assert_eq!(args[0].span(), Span::empty(6));
    }

    #[test]
    fn missing_expression_is_reported_at_the_semicolon() {
        let error = parse_text("Number x = ;").unwrap_err();

        assert_eq!(error.span(), Span::new(11, 1));
        assert_eq!(error.to_string(), "expected expression before `;`");
    }

    #[test]
    fn truncated_input_is_reported_after_the_last_token() {
        let error = parse_text("Number x = 5").unwrap_err();

        assert_eq!(error.span(), Span::new(11, 1));
        assert_eq!(error.to_string(), "expected semicolon after `5`");
    }

    #[test]
    fn stray_token_expects_a_statement() {
        let error = parse_text("x; }").unwrap_err();

        assert_eq!(error.span(), Span::new(3, 1));
        assert_eq!(error.to_string(), "expected statement before `}`");
    }
}
