//! Tipos del lenguaje y biblioteca de funciones integradas.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use lazy_static::lazy_static;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    String,
    Number,
    Entity,
    Vector,
    Void,

    /// Comodín, solo aparece en firmas de funciones integradas.
    Object,
}

impl Type {
    /// Interpreta el lexema de un token de tipo.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "String" => Some(Type::String),
            "Number" => Some(Type::Number),
            "Entity" => Some(Type::Entity),
            "Vector" => Some(Type::Vector),
            _ => None,
        }
    }

    /// Compatibilidad de argumentos, donde `Object` acepta cualquier tipo.
    pub fn accepts(self, other: Type) -> bool {
        self == other || self == Type::Object || other == Type::Object
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            Type::String => "String",
            Type::Number => "Number",
            Type::Entity => "Entity",
            Type::Vector => "Vector",
            Type::Void => "Void",
            Type::Object => "Object",
        })
    }
}

/// Lista de tipos separada por comas, para diagnósticos.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeList(pub Vec<Type>);

impl Display for TypeList {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types = self.0.iter();
        if let Some(first) = types.next() {
            write!(fmt, "{}", first)?;
            for typ in types {
                write!(fmt, ", {}", typ)?;
            }
        }

        Ok(())
    }
}

/// Firma de una función integrada.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub args: &'static [Type],
    pub ret: Type,
}

impl Signature {
    /// Determina si una lista de argumentos satisface la firma.
    pub fn matches(&self, args: &[Type]) -> bool {
        self.args.len() == args.len()
            && self
                .args
                .iter()
                .zip(args)
                .all(|(expected, found)| expected.accepts(*found))
    }
}

/// Entorno predefinido: funciones y variables globales.
pub struct Builtins {
    functions: HashMap<&'static str, Signature>,
    globals: &'static [(&'static str, Type)],
}

impl Builtins {
    /// Firma de una función, si existe.
    pub fn function(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    /// Variables predefinidas, en el orden en que reciben sus ids.
    pub fn globals(&self) -> &[(&'static str, Type)] {
        self.globals
    }

    fn new() -> Self {
        use Type::*;

        const SIGNATURES: &[(&str, &[Type], Type)] = &[
            ("round", &[Number], Number),
            ("sqrt", &[Number], Number),
            ("sin", &[Number], Number),
            ("cos", &[Number], Number),
            ("makevec", &[Number, Number, Number], Vector),
            ("vx", &[Vector], Number),
            ("vy", &[Vector], Number),
            ("vz", &[Vector], Number),
            ("vadd", &[Vector, Vector], Vector),
            ("vsub", &[Vector, Vector], Vector),
            ("vmul", &[Vector, Number], Vector),
            ("vdiv", &[Vector, Number], Vector),
            ("vdist", &[Vector], Number),
            ("vnorm", &[Vector], Vector),
            ("vdot", &[Vector, Vector], Number),
            ("vcross", &[Vector, Vector], Vector),
            ("slength", &[String], Number),
            ("scharat", &[String, Number], String),
            ("scodeat", &[String, Number], Number),
            ("ssubstr", &[String, Number, Number], String),
            ("sconcat", &[String, String], String),
            ("ssearch", &[String, String], Number),
            ("scmp", &[String, String], Number),
            ("sify", &[Object], String),
            ("sifyd", &[Object], String),
            ("print", &[Object], Void),
            ("findent", &[Vector, Number], Entity),
            ("entpos", &[Entity], Vector),
            ("entvel", &[Entity], Vector),
            ("entfacing", &[Entity], Vector),
            ("checkblock", &[Vector, String], Number),
            ("accelent", &[Entity, Vector], Void),
            ("damageent", &[Entity, Number], Void),
            ("mountent", &[Entity, Entity], Void),
            ("fireballpwr", &[Entity, Number], Void),
            ("explode", &[Vector, Number], Void),
            ("placeblock", &[Vector, String], Void),
            ("destroyblock", &[Vector], Void),
            ("lightning", &[Vector], Void),
            ("summon", &[Vector, String], Entity),
            ("wait", &[Number], Void),
        ];

        let functions = SIGNATURES
            .iter()
            .map(|&(name, args, ret)| (name, Signature { args, ret }))
            .collect();

        Builtins {
            functions,
            globals: &[("TARGET", Entity), ("SELF", Entity)],
        }
    }
}

lazy_static! {
    /// Tabla única e inmutable de funciones integradas.
    pub static ref BUILTINS: Builtins = Builtins::new();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_matches_anything() {
        let print = BUILTINS.function("print").unwrap();

        assert!(print.matches(&[Type::Vector]));
        assert!(print.matches(&[Type::Void]));
        assert!(!print.matches(&[]));
        assert!(!print.matches(&[Type::Number, Type::Number]));
    }

    #[test]
    fn argument_positions_are_checked() {
        let checkblock = BUILTINS.function("checkblock").unwrap();

        assert!(checkblock.matches(&[Type::Vector, Type::String]));
        assert!(!checkblock.matches(&[Type::String, Type::Vector]));
        assert_eq!(checkblock.ret, Type::Number);
    }

    #[test]
    fn type_lists_are_comma_separated() {
        assert_eq!(TypeList(vec![]).to_string(), "");
        assert_eq!(TypeList(vec![Type::Vector, Type::Number]).to_string(), "Vector, Number");
    }

    #[test]
    fn globals_come_first() {
        let names: Vec<_> = BUILTINS.globals().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["TARGET", "SELF"]);
    }
}
