//! Construcción del chart de Earley.

use std::collections::{BTreeSet, HashMap};

use crate::{
    grammar::{self, NonTerminal, ProductionRule, Symbol, GRAMMAR, START_RULE},
    lex::Token,
};

/// Referencia desde una posición de una regla hacia el subestado
/// completo que la satisfizo.
///
/// Los subestados viven en columnas iguales o anteriores, por lo cual
/// basta con un par (columna, índice) en lugar de una referencia.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Backpointer {
    pub dot: usize,
    pub column: usize,
    pub index: usize,
}

/// Estado parcial de Earley.
///
/// La posición actual de un estado es la columna que lo contiene.
#[derive(Clone, Debug)]
pub struct State {
    rule: usize,
    dot: usize,
    origin: usize,
    backpointers: BTreeSet<Backpointer>,
}

impl State {
    fn new(rule: usize, dot: usize, origin: usize) -> Self {
        State {
            rule,
            dot,
            origin,
            backpointers: BTreeSet::new(),
        }
    }

    /// Índice de la regla en [`GRAMMAR`].
    pub fn rule_id(&self) -> usize {
        self.rule
    }

    /// Regla de producción.
    pub fn rule(&self) -> &'static ProductionRule {
        &GRAMMAR[self.rule]
    }

    /// Cantidad de símbolos ya reconocidos.
    pub fn dot(&self) -> usize {
        self.dot
    }

    /// Columna donde inició este estado.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Subestados que satisfacen las posiciones no terminales ya reconocidas.
    pub fn backpointers(&self) -> &BTreeSet<Backpointer> {
        &self.backpointers
    }

    /// Siguiente símbolo esperado, `None` si el estado está completo.
    pub fn next_symbol(&self) -> Option<Symbol> {
        self.rule().at(self.dot)
    }

    /// Determina si se reconoció todo el lado derecho.
    pub fn is_complete(&self) -> bool {
        self.dot == self.rule().rhs.len()
    }

    fn key(&self) -> (usize, usize, usize) {
        (self.rule, self.dot, self.origin)
    }

    /// El mismo estado con un símbolo más reconocido.
    fn advance(&self) -> State {
        State {
            rule: self.rule,
            dot: self.dot + 1,
            origin: self.origin,
            backpointers: self.backpointers.clone(),
        }
    }
}

/// Conjunto deduplicado de estados alcanzados tras consumir una
/// cantidad fija de tokens.
#[derive(Default, Debug)]
pub struct Column {
    states: Vec<State>,
    index: HashMap<(usize, usize, usize), usize>,
}

impl Column {
    /// Agrega un estado, o fusiona sus backpointers si uno igual ya existe.
    fn append(&mut self, state: State) -> usize {
        match self.index.get(&state.key()) {
            Some(&existing) => {
                self.states[existing]
                    .backpointers
                    .extend(state.backpointers);

                existing
            }

            None => {
                let position = self.states.len();
                self.index.insert(state.key(), position);
                self.states.push(state);

                position
            }
        }
    }

    /// Estados en orden de inserción.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Cantidad de estados.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Determina si la columna no tiene estados.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Chart de Earley: una columna por cada posición `0..=n`.
#[derive(Debug)]
pub struct Chart {
    columns: Vec<Column>,
}

impl Chart {
    /// Construye el chart completo para una entrada sin tokens descartables.
    pub fn build(input: &[Token]) -> Self {
        let mut chart = Chart {
            columns: (0..=input.len()).map(|_| Column::default()).collect(),
        };

        chart.columns[0].append(State::new(START_RULE, 0, 0));

        for k in 0..=input.len() {
            // La columna crece mientras se procesa, hasta alcanzar un punto fijo
            let mut i = 0;
            while i < chart.columns[k].len() {
                let state = &chart.columns[k].states[i];
                match state.next_symbol() {
                    Some(Symbol::N(nonterminal)) => chart.predict(k, i, nonterminal),
                    Some(Symbol::T(terminal)) => {
                        if input.get(k).map(Token::kind) == Some(terminal) {
                            let advanced = state.advance();
                            chart.columns[k + 1].append(advanced);
                        }
                    }

                    None => chart.complete(k, i),
                }

                i += 1;
            }

            tracing::trace!(column = k, states = chart.columns[k].len(), "column closed");
        }

        chart
    }

    /// Columnas del chart.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Obtiene un estado por columna e índice.
    pub fn state(&self, column: usize, index: usize) -> &State {
        &self.columns[column].states[index]
    }

    /// Busca un estado inicial completo en la última columna.
    pub fn accepted(&self) -> Option<usize> {
        let last = self.columns.last()?;
        last.states.iter().position(|state| {
            state.rule == START_RULE && state.origin == 0 && state.is_complete()
        })
    }

    /// Estados donde alguna posición quedó satisfecha por más de un subestado.
    ///
    /// Esto solo ocurre cuando una misma subcadena admite más de una
    /// derivación, es decir, ante ambigüedad en la gramática.
    pub fn ambiguities(&self) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        for (column_index, column) in self.columns.iter().enumerate() {
            for (index, state) in column.states.iter().enumerate() {
                let dots: Vec<_> = state.backpointers.iter().map(|bp| bp.dot).collect();
                if dots.windows(2).any(|pair| pair[0] == pair[1]) {
                    found.push((column_index, index));
                }
            }
        }

        found
    }

    /// Predicción: estados nuevos para cada regla del no terminal esperado.
    fn predict(&mut self, k: usize, i: usize, nonterminal: NonTerminal) {
        for (rule, _) in grammar::rules_for(nonterminal) {
            self.columns[k].append(State::new(rule, 0, k));
        }

        // Si el no terminal ya se derivó como vacío en esta misma columna,
        // la compleción correspondiente ya ocurrió y no volverá a ver a este
        // estado. Se avanza aquí directamente.
        let nullable: Vec<usize> = self.columns[k]
            .states
            .iter()
            .enumerate()
            .filter(|(_, done)| {
                done.origin == k && done.is_complete() && done.rule().lhs == nonterminal
            })
            .map(|(index, _)| index)
            .collect();

        for index in nullable {
            let waiting = &self.columns[k].states[i];
            let mut advanced = waiting.advance();
            advanced.backpointers.insert(Backpointer {
                dot: waiting.dot,
                column: k,
                index,
            });

            self.columns[k].append(advanced);
        }
    }

    /// Compleción: avanza todo estado que esperaba al no terminal reconocido.
    fn complete(&mut self, k: usize, i: usize) {
        let done = &self.columns[k].states[i];
        let (lhs, origin) = (done.rule().lhs, done.origin);

        let advanced: Vec<State> = self.columns[origin]
            .states
            .iter()
            .filter(|waiting| waiting.next_symbol() == Some(Symbol::N(lhs)))
            .map(|waiting| {
                let mut advanced = waiting.advance();
                advanced.backpointers.insert(Backpointer {
                    dot: waiting.dot,
                    column: k,
                    index: i,
                });

                advanced
            })
            .collect();

        for state in advanced {
            self.columns[k].append(state);
        }
    }
}
