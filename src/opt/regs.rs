use std::collections::HashMap;

use crate::ir::Reg;

/// Estado de la reasignación de registros.
///
/// Cada registro virtual vivo ocupa un slot. Los slots liberados se
/// reutilizan en orden LIFO y solo se crean slots nuevos cuando no hay
/// ninguno libre.
pub struct RegisterAllocation {
    mapping: HashMap<Reg, Reg>,
    retiring: HashMap<Reg, Reg>,
    deferred: Vec<Reg>,
    free: Vec<Reg>,
    high_water: usize,
}

impl RegisterAllocation {
    /// Libera el slot de un registro cuyo intervalo termina aquí.
    ///
    /// La instrucción actual todavía puede leer el registro, por lo cual
    /// su slot queda retirado hasta [`RegisterAllocation::finish()`]. Si
    /// el registro aún no tiene slot, su intervalo también inicia en esta
    /// instrucción y la liberación se pospone hasta después de reescribirla.
    pub fn release(&mut self, reg: Reg) {
        match self.mapping.remove(&reg) {
            Some(slot) => {
                tracing::trace!(%reg, %slot, "slot freed");

                self.retiring.insert(reg, slot);
                self.free.push(slot);
            }

            None => self.deferred.push(reg),
        }
    }

    /// Asigna un slot a un registro cuyo intervalo inicia aquí.
    pub fn allocate(&mut self, reg: Reg) {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = Reg(self.high_water);
                self.high_water += 1;

                slot
            }
        };

        tracing::trace!(%reg, %slot, "slot allocated");
        self.mapping.insert(reg, slot);
    }

    /// Slot para una lectura en la instrucción actual.
    pub fn read(&self, reg: Reg) -> Option<Reg> {
        self.retiring
            .get(&reg)
            .or_else(|| self.mapping.get(&reg))
            .copied()
    }

    /// Slot para una escritura en la instrucción actual.
    pub fn write(&self, reg: Reg) -> Option<Reg> {
        self.mapping.get(&reg).copied()
    }

    /// Concluye la instrucción actual.
    pub fn finish(&mut self) {
        self.retiring.clear();

        for reg in std::mem::take(&mut self.deferred) {
            if let Some(slot) = self.mapping.remove(&reg) {
                tracing::trace!(%reg, %slot, "slot freed");
                self.free.push(slot);
            }
        }
    }

    /// Slots ocupados por registros vivos.
    pub fn live_slots(&self) -> impl Iterator<Item = Reg> + '_ {
        self.mapping.values().copied()
    }

    /// Cantidad de slots distintos que han existido.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

impl Default for RegisterAllocation {
    fn default() -> Self {
        RegisterAllocation {
            mapping: HashMap::new(),
            retiring: HashMap::new(),
            deferred: Vec::new(),
            free: vec![Reg(0)],
            high_water: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slots_are_reused_last_in_first_out() {
        let mut regs = RegisterAllocation::default();
        regs.allocate(Reg(10));
        regs.allocate(Reg(11));
        regs.allocate(Reg(12));
        assert_eq!(regs.high_water(), 3);

        regs.release(Reg(10));
        regs.release(Reg(12));
        regs.finish();

        regs.allocate(Reg(13));
        assert_eq!(regs.write(Reg(13)), Some(Reg(2)));
        regs.allocate(Reg(14));
        assert_eq!(regs.write(Reg(14)), Some(Reg(0)));
        assert_eq!(regs.high_water(), 3);
    }

    #[test]
    fn retiring_registers_are_still_readable() {
        let mut regs = RegisterAllocation::default();
        regs.allocate(Reg(5));

        regs.release(Reg(5));
        regs.allocate(Reg(5));

        // La lectura ve el valor anterior y la escritura el slot nuevo
        assert_eq!(regs.read(Reg(5)), Some(Reg(0)));
        assert_eq!(regs.write(Reg(5)), Some(Reg(0)));

        regs.finish();
        assert_eq!(regs.read(Reg(5)), Some(Reg(0)));
    }

    #[test]
    fn same_instruction_lifetimes_are_deferred() {
        let mut regs = RegisterAllocation::default();

        regs.release(Reg(7));
        regs.allocate(Reg(7));
        assert_eq!(regs.write(Reg(7)), Some(Reg(0)));

        regs.finish();
        assert_eq!(regs.write(Reg(7)), None);
        assert_eq!(regs.live_slots().count(), 0);
    }
}
