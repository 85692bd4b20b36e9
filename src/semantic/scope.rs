use std::collections::HashMap;

use super::{TypeError, VariableId};

/// Pila explícita de ámbitos léxicos.
///
/// El ámbito más externo nunca se descarta. Los ids se asignan en
/// orden creciente sin reutilizarse, incluso entre ámbitos hermanos.
pub struct Scopes {
    stack: Vec<HashMap<String, VariableId>>,
    next_id: usize,
}

impl Scopes {
    pub fn enter(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        assert!(self.stack.len() > 1, "attempted to exit the outermost scope");
        self.stack.pop();
    }

    /// Falla si el nombre ya existe en el ámbito actual.
    pub fn check_free(&self, name: &str) -> Result<(), TypeError> {
        match self.current().contains_key(name) {
            true => Err(TypeError::Redefinition(name.to_owned())),
            false => Ok(()),
        }
    }

    /// Define un nombre en el ámbito actual.
    pub fn define(&mut self, name: &str) -> Result<VariableId, TypeError> {
        self.check_free(name)?;

        let id = VariableId(self.next_id);
        self.next_id += 1;

        self.stack
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_owned(), id);

        Ok(id)
    }

    /// Busca un nombre desde el ámbito más interno hacia afuera.
    pub fn resolve(&self, name: &str) -> Result<VariableId, TypeError> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| TypeError::UndefinedVariable(name.to_owned()))
    }

    /// Cantidad de ids asignados hasta ahora.
    pub fn defined(&self) -> usize {
        self.next_id
    }

    fn current(&self) -> &HashMap<String, VariableId> {
        self.stack.last().expect("scope stack is never empty")
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes {
            stack: vec![HashMap::new()],
            next_id: 0,
        }
    }
}
