//! Compilador para std20.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente.
//! Este archivo se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. El flujo de tokens se
//! dispone en un árbol de derivación por medio de un parser de Earley
//! en [`parse`], a partir de la gramática fija de [`grammar`]. El árbol
//! se decodifica en [`syntax`] y es procesado por análisis semántico en
//! [`semantic`], de lo cual resulta una tabla de símbolos.
//!
//! # Back end
//! La tabla de símbolos y el programa validado se reducen a la
//! representación intermedia descrita en [`ir`]. Opcionalmente, [`opt`]
//! reutiliza registros virtuales cuyos intervalos de vida no se
//! traslapan. El resultado final es el texto del IR.
//!
//! # Errores
//! Cada fase falla en su primer error, el cual siempre se asocia a un
//! rango del código fuente. Ver [`error`].

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod grammar;
pub mod ir;
pub mod lex;
pub mod opt;
pub mod parse;
pub mod semantic;
pub mod source;
pub mod syntax;

use bitflags::bitflags;

use crate::{error::CompileError, ir::Ir, source::Source};

bitflags! {
    /// Fases opcionales de la compilación.
    pub struct Passes: u32 {
        /// Reutilizar registros virtuales según su intervalo de vida.
        ///
        /// Los ciclos pueden alterarse, ya que el análisis de vida no
        /// sigue saltos hacia atrás.
        const OPTIMIZE = 0x01;
    }
}

/// Compila una unidad completa hasta IR.
pub fn compile(source: &Source, passes: Passes) -> Result<Ir, CompileError> {
    let text = source.text();

    let tokens = lex::tokenize(text)?;
    let tree = parse::parse(&tokens, text)?;
    let program = syntax::program(&tree);

    let table = semantic::analyze(&program, text, &semantic::BUILTINS)?;
    let ir = codegen::lower(&program, &table, text)?;

    let ir = match passes.contains(Passes::OPTIMIZE) {
        true => opt::optimize(&ir),
        false => ir,
    };

    tracing::debug!(source = source.name(), "compilation finished");
    Ok(ir)
}
