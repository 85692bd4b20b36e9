//! Análisis léxico.
//!
//! # Tokenización
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Cada token emitido está
//! asociado a un rango de bytes en el código fuente original, lo cual
//! permite rastrear errores tanto en los tokens como en constructos
//! más elevados de fases posteriores.
//!
//! # Maximal munch
//! En cada posición se evalúan todas las reglas léxicas contra el resto
//! de la entrada. Gana la coincidencia más larga y los empates se
//! resuelven a favor de la regla declarada primero, por lo cual `if`
//! es una palabra clave pero `iffy` es un identificador.
//!
//! # Espacios en blanco y comentarios
//! A diferencia de otros lexers, los espacios en blanco y comentarios
//! no se descartan aquí. Se emiten como tokens ordinarios y el parser
//! los filtra por medio de [`Terminal::is_skippable()`]. Así la secuencia
//! de tokens cubre exactamente todos los bytes de la entrada.

use crate::{
    grammar::Terminal,
    source::{Located, Span},
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScanError {
    /// Ninguna regla léxica reconoce la entrada en esta posición.
    #[error("unrecognized character {0:?}")]
    Unrecognized(char),
}

/// Objeto resultante del análisis léxico.
///
/// Los tokens no copian su lexema, solo apuntan al texto original.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token {
    kind: Terminal,
    span: Span,
}

impl Token {
    /// Construye un token.
    pub fn new(kind: Terminal, span: Span) -> Self {
        Token { kind, span }
    }

    /// Clase del token.
    pub fn kind(&self) -> Terminal {
        self.kind
    }

    /// Rango en el texto original.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Obtiene el lexema a partir del texto original.
    pub fn lexeme<'a>(&self, text: &'a str) -> &'a str {
        self.span.slice(text)
    }
}

/// Forma de un lexema.
enum Pattern {
    /// Texto literal exacto.
    Exact(&'static str),

    /// Cualquiera de varias palabras exactas.
    AnyOf(&'static [&'static str]),

    /// Una o más secuencias de espacios en blanco.
    Whitespace,

    /// `//` hasta el final de la línea.
    LineComment,

    /// Dígitos con parte fraccionaria opcional.
    Number,

    /// Cadena entre comillas dobles en una sola línea.
    String,

    /// Identificador estilo C.
    Identifier,
}

impl Pattern {
    /// Longitud en bytes de la coincidencia al inicio de `input`, cero si no hay.
    fn longest_match(&self, input: &str) -> usize {
        match self {
            Pattern::Exact(exact) => exact_len(input, exact),

            Pattern::AnyOf(words) => words
                .iter()
                .map(|word| exact_len(input, word))
                .max()
                .unwrap_or(0),

            Pattern::Whitespace => prefix_len(input, char::is_whitespace),

            Pattern::LineComment => match input.strip_prefix("//") {
                Some(rest) => 2 + prefix_len(rest, |c| c != '\n'),
                None => 0,
            },

            Pattern::Number => {
                let integer = prefix_len(input, |c| c.is_ascii_digit());
                if integer == 0 {
                    return 0;
                }

                // La parte fraccionaria requiere al menos un dígito tras el punto
                let rest = &input[integer..];
                match rest.strip_prefix('.') {
                    Some(fraction) => match prefix_len(fraction, |c| c.is_ascii_digit()) {
                        0 => integer,
                        digits => integer + 1 + digits,
                    },

                    None => integer,
                }
            }

            Pattern::String => match input.strip_prefix('"') {
                Some(rest) => match rest.find(|c: char| c == '"' || c == '\n') {
                    Some(close) if rest[close..].starts_with('"') => close + 2,
                    _ => 0,
                },

                None => 0,
            },

            Pattern::Identifier => {
                let mut chars = input.chars();
                match chars.next() {
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        1 + prefix_len(chars.as_str(), |c| c.is_ascii_alphanumeric() || c == '_')
                    }

                    _ => 0,
                }
            }
        }
    }
}

/// Reglas léxicas en orden de prioridad para desempates.
const RULES: &[(Terminal, Pattern)] = &[
    (Terminal::Space, Pattern::Whitespace),
    (Terminal::Comment, Pattern::LineComment),
    (Terminal::Semicolon, Pattern::Exact(";")),
    (Terminal::If, Pattern::Exact("if")),
    (Terminal::Else, Pattern::Exact("else")),
    (Terminal::LParen, Pattern::Exact("(")),
    (Terminal::RParen, Pattern::Exact(")")),
    (Terminal::LBrace, Pattern::Exact("{")),
    (Terminal::RBrace, Pattern::Exact("}")),
    (Terminal::While, Pattern::Exact("while")),
    (
        Terminal::Type,
        Pattern::AnyOf(&["Entity", "Number", "Vector", "String"]),
    ),
    (Terminal::Number, Pattern::Number),
    (Terminal::String, Pattern::String),
    (Terminal::Id, Pattern::Identifier),
    (Terminal::Assign, Pattern::Exact("=")),
    (Terminal::LogicalOr, Pattern::Exact("||")),
    (Terminal::LogicalAnd, Pattern::Exact("&&")),
    (Terminal::Equal, Pattern::Exact("==")),
    (Terminal::NotEqual, Pattern::Exact("!=")),
    (Terminal::LessEqual, Pattern::Exact("<=")),
    (Terminal::Less, Pattern::Exact("<")),
    (Terminal::GreaterEqual, Pattern::Exact(">=")),
    (Terminal::Greater, Pattern::Exact(">")),
    (Terminal::Plus, Pattern::Exact("+")),
    (Terminal::Minus, Pattern::Exact("-")),
    (Terminal::Star, Pattern::Exact("*")),
    (Terminal::Slash, Pattern::Exact("/")),
    (Terminal::Exclaim, Pattern::Exact("!")),
    (Terminal::Period, Pattern::Exact(".")),
    (Terminal::Comma, Pattern::Exact(",")),
];

/// Lexer sobre un texto completo en memoria.
///
/// Emite tokens hasta agotar la entrada o hasta el primer error,
/// después de lo cual no emite nada más.
pub struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    /// Crea un lexer al inicio de un texto.
    pub fn new(text: &'a str) -> Self {
        Lexer {
            text,
            offset: 0,
            failed: false,
        }
    }

    /// Intenta construir el siguiente token en la posición actual.
    fn lex(&self) -> Result<Token, Located<ScanError>> {
        let rest = &self.text[self.offset..];

        // `max_by_key()` se queda con el último máximo, por lo cual
        // se recorre en reversa para favorecer la primera regla
        let best = RULES
            .iter()
            .rev()
            .map(|(kind, pattern)| (*kind, pattern.longest_match(rest)))
            .filter(|&(_, len)| len > 0)
            .max_by_key(|&(_, len)| len);

        match best {
            Some((kind, len)) => Ok(Token::new(kind, Span::new(self.offset, len))),
            None => {
                // `rest` no está vacío, de lo contrario no se habría llamado a lex()
                let c = rest.chars().next().unwrap_or('\0');
                let span = Span::new(self.offset, c.len_utf8());

                Err(Located::at(ScanError::Unrecognized(c), span))
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, Located<ScanError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.text.len() {
            return None;
        }

        let result = self.lex();
        match &result {
            Ok(token) => self.offset = token.span().end(),
            Err(_) => self.failed = true,
        }

        Some(result)
    }
}

/// Reduce un texto a una secuencia de tokens, fallando en el primer error.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Located<ScanError>> {
    let tokens = Lexer::new(text).collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(tokens = tokens.len(), "scan complete");

    Ok(tokens)
}

fn exact_len(input: &str, exact: &str) -> usize {
    if input.starts_with(exact) {
        exact.len()
    } else {
        0
    }
}

fn prefix_len<P>(input: &str, mut predicate: P) -> usize
where
    P: FnMut(char) -> bool,
{
    input
        .char_indices()
        .find(|&(_, c)| !predicate(c))
        .map_or(input.len(), |(index, _)| index)
}
