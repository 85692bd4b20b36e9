//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de bytes en el código fuente
//! original, lo cual permite determinar un punto exacto en donde
//! ocurre un error de abstracción arbitraria. Las posiciones
//! línea-columna solo se calculan al momento de reportar un error.

use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};

/// Cantidad máxima de caracteres de contexto a cada lado de un extracto.
const EXCERPT_CONTEXT: usize = 10;

/// Un rango de bytes en el texto original.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    /// Construye un rango a partir de un desplazamiento y una longitud.
    pub fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    /// Rango vacío en una posición.
    pub fn empty(at: usize) -> Self {
        Span { start: at, len: 0 }
    }

    /// Desplazamiento del primer byte.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Longitud en bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Determina si el rango no cubre ningún byte.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Desplazamiento inmediatamente posterior al último byte.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Unifica dos rangos. Se asume que `self` no inicia después de `to`.
    pub fn to(self, to: Span) -> Span {
        Span {
            start: self.start,
            len: to.end().max(self.end()) - self.start,
        }
    }

    /// Obtiene el lexema cubierto por este rango.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end()]
    }
}

impl Display for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}..{}", self.start, self.end())
    }
}

/// Un objeto cualquiera con un rango original asociado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    span: Span,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Span, T) {
        (self.span, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, span: Span) -> Self {
        Located { value, span }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            span: self.span,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, formatter)
    }
}

impl<E: Error> Error for Located<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.value.source()
    }
}

/// Una posición línea-columna en un archivo, ambas con base 1.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Unidad de compilación: nombre de origen y texto completo.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye a partir de un nombre y el contenido del archivo.
    pub fn new<N, T>(name: N, text: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Nombre de origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Calcula línea y columna de un desplazamiento.
    ///
    /// Se recorre el texto desde el inicio contando saltos de línea,
    /// por lo cual esto es lineal en el tamaño del archivo. Solo se
    /// invoca al reportar errores.
    pub fn position(&self, offset: usize) -> Position {
        let offset = clamp_to_boundary(&self.text, offset);

        self.text[..offset]
            .chars()
            .fold(Position::default(), |position, c| match c {
                '\n' => Position {
                    line: position.line + 1,
                    column: 1,
                },

                _ => Position {
                    line: position.line,
                    column: position.column + 1,
                },
            })
    }

    /// Extrae el contexto inmediato de un rango sin cruzar saltos de línea.
    pub fn excerpt(&self, span: Span) -> Excerpt<'_> {
        let text = self.text.as_str();
        let start = clamp_to_boundary(text, span.start());
        let end = clamp_to_boundary(text, span.end().max(start));

        let before_start = text[..start]
            .char_indices()
            .rev()
            .take_while(|&(_, c)| c != '\n')
            .take(EXCERPT_CONTEXT)
            .last()
            .map_or(start, |(index, _)| index);

        let after_end = text[end..]
            .char_indices()
            .take_while(|&(_, c)| c != '\n')
            .take(EXCERPT_CONTEXT)
            .last()
            .map_or(end, |(index, c)| end + index + c.len_utf8());

        // Un error puede abarcar varias líneas; solo se marca la primera
        let marked = &text[start..end];
        let marked = marked.split('\n').next().unwrap_or(marked);

        Excerpt {
            before: &text[before_start..start],
            marked,
            after: if marked.len() == end - start {
                &text[end..after_end]
            } else {
                ""
            },
        }
    }
}

/// Fragmento de una línea alrededor de un rango marcado.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Excerpt<'a> {
    pub before: &'a str,
    pub marked: &'a str,
    pub after: &'a str,
}

fn clamp_to_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    offset
}
