//! Errores de compilación y su presentación.

use std::fmt::{self, Display};

use thiserror::Error;

use crate::{
    codegen::LoweringError,
    lex::ScanError,
    parse::ParseError,
    semantic::TypeError,
    source::{Located, Source, Span},
};

/// Error de cualquiera de las fases, siempre asociado a un rango.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] Located<ScanError>),

    #[error(transparent)]
    Parse(#[from] Located<ParseError>),

    #[error(transparent)]
    Type(#[from] Located<TypeError>),

    #[error(transparent)]
    Compile(#[from] Located<LoweringError>),
}

impl CompileError {
    /// Nombre de la fase que falló.
    pub fn stage(&self) -> &'static str {
        match self {
            CompileError::Scan(_) => "scan",
            CompileError::Parse(_) => "parse",
            CompileError::Type(_) => "type",
            CompileError::Compile(_) => "compile",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Scan(error) => error.span(),
            CompileError::Parse(error) => error.span(),
            CompileError::Type(error) => error.span(),
            CompileError::Compile(error) => error.span(),
        }
    }
}

/// Un error listo para mostrarse junto con el código que lo causó.
pub struct Diagnostic<'a> {
    source: &'a Source,
    error: &'a CompileError,
}

impl<'a> Diagnostic<'a> {
    pub fn new(source: &'a Source, error: &'a CompileError) -> Self {
        Diagnostic { source, error }
    }
}

impl Display for Diagnostic<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostic { source, error } = self;
        let span = error.span();
        let position = source.position(span.start());

        writeln!(
            fmt,
            "{}:{}: {} error: {}",
            source.name(),
            position,
            error.stage(),
            error
        )?;

        let excerpt = source.excerpt(span);
        let line = position.line().to_string();

        writeln!(
            fmt,
            " {} | {}{}{}",
            line, excerpt.before, excerpt.marked, excerpt.after
        )?;

        // Un error al final de la entrada no cubre ningún carácter
        let skip = excerpt.before.chars().count();
        let highlight = excerpt.marked.chars().count().max(1);

        writeln!(
            fmt,
            " {:digits$} | {:skip$}{:^<highlight$}",
            "",
            "",
            "",
            digits = line.len(),
            skip = skip,
            highlight = highlight
        )
    }
}
