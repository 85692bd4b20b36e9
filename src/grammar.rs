//! Gramática del lenguaje.
//!
//! La gramática es una tabla fija y ordenada de reglas de producción.
//! La identidad de una regla es su índice en [`GRAMMAR`], y la regla
//! cero es siempre la regla inicial. Esta tabla la consumen tanto el
//! parser como la generación de mensajes de error sintáctico.

use std::fmt::{self, Display};

/// Símbolos terminales, es decir, clases de tokens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminal {
    Space,
    Comment,
    Semicolon,
    If,
    Else,
    LParen,
    RParen,
    LBrace,
    RBrace,
    While,
    Type,
    Number,
    String,
    Id,
    Assign,
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    LessEqual,
    Less,
    GreaterEqual,
    Greater,
    Plus,
    Minus,
    Star,
    Slash,
    Exclaim,
    Period,
    Comma,
}

impl Terminal {
    /// Determina si los tokens de esta clase se descartan antes de parsear.
    pub fn is_skippable(self) -> bool {
        matches!(self, Terminal::Space | Terminal::Comment)
    }

    /// Nombre legible para diagnósticos.
    pub fn label(self) -> &'static str {
        use Terminal::*;

        match self {
            Space => "space",
            Comment => "comment",
            Semicolon => "semicolon",
            If => "if",
            Else => "else",
            LParen => "left parenthesis",
            RParen => "right parenthesis",
            LBrace => "left brace",
            RBrace => "right brace",
            While => "while",
            Type => "type",
            Number => "number",
            String => "string",
            Id => "identifier",
            Assign => "assignment",
            LogicalOr => "logical or",
            LogicalAnd => "logical and",
            Equal => "equal",
            NotEqual => "not equal",
            LessEqual => "less or equal",
            Less => "less than",
            GreaterEqual => "greater or equal",
            Greater => "greater than",
            Plus => "plus",
            Minus => "minus",
            Star => "multiplication",
            Slash => "division",
            Exclaim => "exclamation",
            Period => "period",
            Comma => "comma",
        }
    }
}

/// Símbolos no terminales.
///
/// Las capas de expresión siguen el orden de precedencia, desde la
/// asignación (más débil) hasta los operadores unarios.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NonTerminal {
    Start,
    Statements,
    Statement,
    Block,
    IfContinuation,
    VarDef,
    Expr,
    Assignment,
    LogicalOr,
    LogicalAnd,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Primary,
    ArgsOpt,
    Args,
    Literal,
}

impl NonTerminal {
    /// Nombre legible para diagnósticos.
    pub fn label(self) -> &'static str {
        use NonTerminal::*;

        match self {
            Start => "start",
            Statements => "statements",
            Statement => "statement",
            Block => "block",
            IfContinuation => "else branch",
            VarDef => "variable definition",
            Expr | Assignment | LogicalOr | LogicalAnd | Equality | Relational | Additive
            | Multiplicative | Unary => "expression",
            Primary => "variable id",
            ArgsOpt | Args => "arguments",
            Literal => "literal",
        }
    }
}

/// Un símbolo en el lado derecho de una regla.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    T(Terminal),
    N(NonTerminal),
}

impl Symbol {
    /// Nombre legible para diagnósticos.
    pub fn label(self) -> &'static str {
        match self {
            Symbol::T(terminal) => terminal.label(),
            Symbol::N(nonterminal) => nonterminal.label(),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.label())
    }
}

/// Regla de producción `lhs → rhs`.
#[derive(Debug)]
pub struct ProductionRule {
    pub lhs: NonTerminal,
    pub rhs: &'static [Symbol],
}

impl ProductionRule {
    /// Símbolo esperado en la posición `dot`, si la regla no ha terminado.
    pub fn at(&self, dot: usize) -> Option<Symbol> {
        self.rhs.get(dot).copied()
    }
}

/// Índice de la regla inicial.
pub const START_RULE: usize = 0;

macro_rules! rules {
    ($($lhs:ident => [$($kind:ident($symbol:ident)),*];)*) => {
        &[$(ProductionRule {
            lhs: NonTerminal::$lhs,
            rhs: &[$(rules!(@symbol $kind $symbol)),*],
        }),*]
    };

    (@symbol t $symbol:ident) => { Symbol::T(Terminal::$symbol) };
    (@symbol n $symbol:ident) => { Symbol::N(NonTerminal::$symbol) };
}

/// La gramática completa del lenguaje.
pub const GRAMMAR: &[ProductionRule] = rules! {
    Start          => [n(Statements)];
    Statements     => [n(Statements), n(Statement)];
    Statements     => [];
    Statement      => [n(VarDef), t(Semicolon)];
    Statement      => [n(Expr), t(Semicolon)];
    Statement      => [n(Block)];
    Statement      => [t(If), t(LParen), n(Expr), t(RParen), n(Statement), n(IfContinuation)];
    Statement      => [t(While), t(LParen), n(Expr), t(RParen), n(Statement)];
    Block          => [t(LBrace), n(Statements), t(RBrace)];
    IfContinuation => [t(Else), n(Statement)];
    IfContinuation => [];
    VarDef         => [t(Type), t(Id)];
    VarDef         => [t(Type), t(Id), t(Assign), n(Expr)];
    Expr           => [n(Assignment)];
    Assignment     => [t(Id), t(Assign), n(Assignment)];
    Assignment     => [n(LogicalOr)];
    LogicalOr      => [n(LogicalOr), t(LogicalOr), n(LogicalAnd)];
    LogicalOr      => [n(LogicalAnd)];
    LogicalAnd     => [n(LogicalAnd), t(LogicalAnd), n(Equality)];
    LogicalAnd     => [n(Equality)];
    Equality       => [n(Equality), t(Equal), n(Relational)];
    Equality       => [n(Equality), t(NotEqual), n(Relational)];
    Equality       => [n(Relational)];
    Relational     => [n(Relational), t(LessEqual), n(Additive)];
    Relational     => [n(Relational), t(Less), n(Additive)];
    Relational     => [n(Relational), t(GreaterEqual), n(Additive)];
    Relational     => [n(Relational), t(Greater), n(Additive)];
    Relational     => [n(Additive)];
    Additive       => [n(Additive), t(Plus), n(Multiplicative)];
    Additive       => [n(Additive), t(Minus), n(Multiplicative)];
    Additive       => [n(Multiplicative)];
    Multiplicative => [n(Multiplicative), t(Star), n(Unary)];
    Multiplicative => [n(Multiplicative), t(Slash), n(Unary)];
    Multiplicative => [n(Unary)];
    Unary          => [t(LParen), n(Expr), t(RParen)];
    Unary          => [t(Minus), n(Unary)];
    Unary          => [t(Plus), n(Unary)];
    Unary          => [t(Exclaim), n(Unary)];
    Unary          => [n(Primary)];
    Unary          => [n(Literal)];
    Literal        => [t(String)];
    Literal        => [t(Number)];
    Primary        => [t(Id)];
    Primary        => [t(Id), t(LParen), n(ArgsOpt), t(RParen)];
    ArgsOpt        => [];
    ArgsOpt        => [n(Args)];
    Args           => [n(Expr)];
    Args           => [n(Expr), t(Comma), n(Args)];
};

/// Itera las reglas que definen a un no terminal, en orden de declaración.
pub fn rules_for(lhs: NonTerminal) -> impl Iterator<Item = (usize, &'static ProductionRule)> {
    GRAMMAR
        .iter()
        .enumerate()
        .filter(move |(_, rule)| rule.lhs == lhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_rule_comes_first() {
        assert_eq!(GRAMMAR[START_RULE].lhs, NonTerminal::Start);
        assert!(GRAMMAR[1..].iter().all(|rule| rule.lhs != NonTerminal::Start));
    }

    #[test]
    fn grammar_never_mentions_skippable_terminals() {
        let mentions_skippable = GRAMMAR
            .iter()
            .flat_map(|rule| rule.rhs.iter())
            .any(|symbol| matches!(symbol, Symbol::T(terminal) if terminal.is_skippable()));

        assert!(!mentions_skippable);
    }

    #[test]
    fn every_nonterminal_is_defined() {
        let used = GRAMMAR.iter().flat_map(|rule| rule.rhs.iter()).filter_map(|symbol| match symbol {
            Symbol::N(nonterminal) => Some(*nonterminal),
            Symbol::T(_) => None,
        });

        for nonterminal in used {
            assert!(rules_for(nonterminal).next().is_some(), "{:?} has no rules", nonterminal);
        }
    }
}
