//! Reconstrucción del árbol de derivación a partir del chart.

use super::chart::{Backpointer, Chart, State};
use crate::{
    grammar::{NonTerminal, Symbol},
    lex::Token,
    source::Span,
};

/// Árbol sintáctico concreto.
///
/// Cada nodo interno corresponde a exactamente una regla de la gramática,
/// con un hijo por cada símbolo de su lado derecho.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tree {
    Leaf(Token),
    Branch {
        symbol: NonTerminal,
        rule: usize,
        span: Span,
        children: Vec<Tree>,
    },
}

impl Tree {
    /// Rango cubierto por el nodo.
    pub fn span(&self) -> Span {
        match self {
            Tree::Leaf(token) => token.span(),
            Tree::Branch { span, .. } => *span,
        }
    }

    /// Símbolo gramatical de este nodo.
    pub fn symbol(&self) -> Symbol {
        match self {
            Tree::Leaf(token) => Symbol::T(token.kind()),
            Tree::Branch { symbol, .. } => Symbol::N(*symbol),
        }
    }

    /// Hijos en orden, vacío para hojas.
    pub fn children(&self) -> &[Tree] {
        match self {
            Tree::Leaf(_) => &[],
            Tree::Branch { children, .. } => children,
        }
    }

    /// Token de una hoja.
    pub fn token(&self) -> Option<Token> {
        match self {
            Tree::Leaf(token) => Some(*token),
            Tree::Branch { .. } => None,
        }
    }
}

pub(super) struct Builder<'a> {
    pub chart: &'a Chart,
    pub tokens: &'a [Token],
    pub end_of_text: usize,
}

impl Builder<'_> {
    /// Construye el subárbol de un estado completo.
    pub fn build(&self, column: usize, index: usize) -> Tree {
        let state = self.chart.state(column, index);

        let mut picks = Vec::new();
        let picks = self
            .walk(state, 0, state.origin(), column, &mut picks)
            .then(|| picks)
            .expect("completed chart state has no consistent derivation");

        let mut picks = picks.into_iter();
        let mut cursor = state.origin();

        let children = state
            .rule()
            .rhs
            .iter()
            .map(|symbol| match symbol {
                Symbol::T(_) => {
                    let token = self.tokens[cursor];
                    cursor += 1;

                    Tree::Leaf(token)
                }

                Symbol::N(_) => {
                    let pick = picks.next().expect("derivation is missing a backpointer");
                    cursor = pick.column;

                    self.build(pick.column, pick.index)
                }
            })
            .collect();

        let span = if state.origin() < column {
            let first = self.tokens[state.origin()].span();
            let last = self.tokens[column - 1].span();

            first.to(last)
        } else {
            Span::empty(self.offset(column))
        };

        Tree::Branch {
            symbol: state.rule().lhs,
            rule: state.rule_id(),
            span,
            children,
        }
    }

    /// Busca una asignación de subestados a posiciones no terminales que
    /// cubra exactamente `cursor..end`.
    ///
    /// Se prueban primero los subestados más largos, de forma que ante
    /// ambigüedad gana la derivación que consume más tokens lo antes posible.
    fn walk(
        &self,
        state: &State,
        dot: usize,
        cursor: usize,
        end: usize,
        picks: &mut Vec<Backpointer>,
    ) -> bool {
        match state.rule().at(dot) {
            None => cursor == end,

            Some(Symbol::T(terminal)) => {
                self.tokens.get(cursor).map(Token::kind) == Some(terminal)
                    && self.walk(state, dot + 1, cursor + 1, end, picks)
            }

            Some(Symbol::N(_)) => {
                let mut candidates: Vec<Backpointer> = state
                    .backpointers()
                    .iter()
                    .filter(|pick| pick.dot == dot && pick.column <= end)
                    .filter(|pick| self.chart.state(pick.column, pick.index).origin() == cursor)
                    .copied()
                    .collect();

                candidates.sort_by(|a, b| b.column.cmp(&a.column));

                for pick in candidates {
                    picks.push(pick);
                    if self.walk(state, dot + 1, pick.column, end, picks) {
                        return true;
                    }

                    picks.pop();
                }

                false
            }
        }
    }

    fn offset(&self, position: usize) -> usize {
        self.tokens
            .get(position)
            .map_or(self.end_of_text, |token| token.span().start())
    }
}
