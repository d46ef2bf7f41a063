use core::fmt;

use crate::{
    codec,
    map::{Field, Register, RegisterMap},
    store::{RegAddr, RegisterStateStore},
    Error,
};

use super::format_hex;

/// What an editor currently points at
///
/// The only transitions are `Unselected -> Register -> Field -> Register`,
/// and back to `Unselected` when a new map is loaded or the selection is
/// cleared. None of them touches the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected
    #[default]
    Unselected,
    /// A whole register
    Register(RegAddr),
    /// One field of a register
    Field {
        /// The register holding the field
        register: RegAddr,
        /// The field name
        name: String,
    },
}

/// A loaded register map with live values and a selection
///
/// Every map load gets a fresh [`RegisterStateStore`], so values never leak
/// from one map into the next.
pub struct Session {
    map: RegisterMap,
    store: RegisterStateStore,
    selection: Selection,
}

impl Session {
    /// Opens a session on `map`
    pub fn new(map: RegisterMap) -> Self {
        log::info!("session opened with {} registers", map.len());

        Session {
            map,
            store: RegisterStateStore::new(),
            selection: Selection::Unselected,
        }
    }

    /// Replaces the map, starting over with an empty store and no selection
    pub fn load(&mut self, map: RegisterMap) {
        log::info!(
            "loading {} registers, dropping {} stored values",
            map.len(),
            self.store.len()
        );

        self.map = map;
        self.store = RegisterStateStore::new();
        self.selection = Selection::Unselected;
    }

    /// The register map
    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// The live values
    pub fn store(&self) -> &RegisterStateStore {
        &self.store
    }

    /// The live values, for transports that refresh them
    pub fn store_mut(&mut self) -> &mut RegisterStateStore {
        &mut self.store
    }

    /// The current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Splits the session into its map and store
    pub fn into_parts(self) -> (RegisterMap, RegisterStateStore) {
        (self.map, self.store)
    }

    /// Selects a whole register
    ///
    /// Also used to step back from a field to its register.
    pub fn select_register(&mut self, addr: impl Into<RegAddr>) -> Result<&Register, Error> {
        let addr = addr.into();
        let index = self
            .map
            .iter()
            .position(|register| register.key() == addr)
            .ok_or(Error::UnknownRegister(addr.clone()))?;

        log::debug!("selected register {}", addr);
        self.selection = Selection::Register(addr);

        Ok(&self.map.registers()[index])
    }

    /// Selects a field of the selected register
    pub fn select_field(&mut self, name: &str) -> Result<&Field, Error> {
        let register = match &self.selection {
            Selection::Unselected => return Err(Error::NoSelection),
            Selection::Register(register) | Selection::Field { register, .. } => register.clone(),
        };
        let field = lookup_field(&self.map, &register, name)?;

        log::debug!("selected field {}.{}", register, name);
        self.selection = Selection::Field {
            register,
            name: name.to_owned(),
        };

        Ok(field)
    }

    /// Steps back from a field to its register
    pub fn deselect_field(&mut self) {
        if let Selection::Field { register, .. } = &self.selection {
            self.selection = Selection::Register(register.clone());
        }
    }

    /// Drops the selection
    pub fn clear_selection(&mut self) {
        self.selection = Selection::Unselected;
    }

    /// Value of the selection: the whole register, or just the field
    pub fn current_value(&self) -> Result<u32, Error> {
        match &self.selection {
            Selection::Unselected => Err(Error::NoSelection),
            Selection::Register(addr) => self.register_value(addr.clone()),
            Selection::Field { register, name } => self.field_value(register.clone(), name),
        }
    }

    /// Writes `value` to the selection, returns the new register value
    ///
    /// A selected register is overwritten. A selected field is inserted into
    /// the register, leaving every other bit as it was.
    pub fn edit(&mut self, value: u32) -> Result<u32, Error> {
        match self.selection.clone() {
            Selection::Unselected => Err(Error::NoSelection),
            Selection::Register(addr) => {
                log::debug!("{} = {}", addr, format_hex(value));
                self.store.set(addr, value);
                Ok(value)
            }
            Selection::Field { register, name } => {
                let fallback = lookup_register(&self.map, &register)?.default_value;
                let field = lookup_field(&self.map, &register, &name)?;
                let (upper, lower) = (field.upper_bit, field.lower_bit);

                if value > field.max_value() {
                    log::warn!(
                        "{} does not fit into {}.{} [{}], truncating",
                        value,
                        register,
                        name,
                        field.bit_range_text()
                    );
                }
                Ok(self.store.set_field(register, upper, lower, value, fallback))
            }
        }
    }

    /// Sets or clears one register bit, returns the new register value
    ///
    /// With a register selected any of the 32 bits can be changed. With a
    /// field selected only bits inside the field are accepted.
    pub fn set_bit(&mut self, bit: u8, on: bool) -> Result<u32, Error> {
        let (register, field) = match self.selection.clone() {
            Selection::Unselected => return Err(Error::NoSelection),
            Selection::Register(register) => (register, None),
            Selection::Field { register, name } => (register, Some(name)),
        };
        let default = lookup_register(&self.map, &register)?.default_value;
        let (upper, lower) = match &field {
            Some(name) => {
                let field = lookup_field(&self.map, &register, name)?;
                (field.upper_bit, field.lower_bit)
            }
            None => (codec::MSB, 0),
        };
        if bit < lower || bit > upper {
            return Err(Error::BitOutOfRange { bit, upper, lower });
        }

        let on = u32::from(on);
        log::debug!("{} bit {} <- {}", register, bit, on);
        let value = match field {
            Some(_) => self.store.set_field(register, bit, bit, on, default),
            None => {
                let current = self.store.get_or_default(register.clone(), default);
                let value = codec::insert(current, on, bit, bit);
                self.store.set(register, value);
                value
            }
        };

        Ok(value)
    }

    /// Parses `text` as decimal or `0x` hex and writes it to the selection
    pub fn edit_text(&mut self, text: &str) -> Result<u32, Error> {
        let value = super::parse_value(text)?;
        self.edit(value)
    }

    /// Restores the default of the selection, returns the new register value
    pub fn reset_to_default(&mut self) -> Result<u32, Error> {
        let value = match &self.selection {
            Selection::Unselected => return Err(Error::NoSelection),
            Selection::Register(addr) => lookup_register(&self.map, addr)?.default_value,
            Selection::Field { register, name } => {
                lookup_field(&self.map, register, name)?.default_value
            }
        };

        self.edit(value)
    }

    /// Current value of a register, its default if never written
    pub fn register_value(&self, addr: impl Into<RegAddr>) -> Result<u32, Error> {
        let addr = addr.into();
        let register = lookup_register(&self.map, &addr)?;

        Ok(self.store.get_or_default(addr, register.default_value))
    }

    /// Current value of one field
    pub fn field_value(&self, addr: impl Into<RegAddr>, name: &str) -> Result<u32, Error> {
        let addr = addr.into();
        let field = lookup_field(&self.map, &addr, name)?;
        let word = self.register_value(addr)?;

        Ok(codec::extract(word, field.upper_bit, field.lower_bit))
    }

    /// Tree label of a register: `"<address> <description> = 0x........"`
    pub fn register_label(&self, addr: impl Into<RegAddr>) -> Result<String, Error> {
        let addr = addr.into();
        let register = lookup_register(&self.map, &addr)?;
        let value = self.store.get_or_default(addr, register.default_value);

        Ok(format!(
            "{} {} = {}",
            register.address,
            register.description,
            format_hex(value)
        ))
    }

    /// Tree labels of a register's fields: `"<name> [<bit_range>] = <value>"`
    pub fn tree_labels(&self, addr: impl Into<RegAddr>) -> Result<Vec<String>, Error> {
        let addr = addr.into();
        let register = lookup_register(&self.map, &addr)?;
        let word = self.store.get_or_default(addr, register.default_value);

        Ok(register
            .fields
            .iter()
            .map(|field| {
                format!(
                    "{} [{}] = {}",
                    field.name,
                    field.bit_range_text(),
                    field.extract(word)
                )
            })
            .collect())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Session {{ registers: {}, stored: {}, selection: {:?} }}",
            self.map.len(),
            self.store.len(),
            self.selection
        )
    }
}

fn lookup_register<'m>(map: &'m RegisterMap, addr: &RegAddr) -> Result<&'m Register, Error> {
    map.get(addr.clone())
        .ok_or_else(|| Error::UnknownRegister(addr.clone()))
}

fn lookup_field<'m>(map: &'m RegisterMap, addr: &RegAddr, name: &str) -> Result<&'m Field, Error> {
    lookup_register(map, addr)?
        .field(name)
        .ok_or_else(|| Error::UnknownField {
            register: addr.clone(),
            name: name.to_owned(),
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::test::sample_sheet;

    fn session() -> Session {
        Session::new(RegisterMap::build(&sample_sheet()))
    }

    #[test]
    fn starts_unselected() {
        let mut session = session();

        assert_eq!(session.selection(), &Selection::Unselected);
        assert!(matches!(session.current_value(), Err(Error::NoSelection)));
        assert!(matches!(session.edit(1), Err(Error::NoSelection)));
        assert!(matches!(session.select_field("EN_TX"), Err(Error::NoSelection)));
        assert!(session.store().is_empty());
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut session = session();

        assert!(matches!(
            session.select_register("0x55"),
            Err(Error::UnknownRegister(_))
        ));
        session.select_register("0x01").unwrap();
        assert!(matches!(
            session.select_field("NOPE"),
            Err(Error::UnknownField { .. })
        ));
        assert_eq!(session.selection(), &Selection::Register(RegAddr::new("01")));
    }

    #[test]
    fn field_edit_keeps_other_bits() {
        let mut session = session();
        session.select_register("1").unwrap();
        session.select_field("TX_SEL130").unwrap();

        assert_eq!(session.current_value().unwrap(), 0x2a);
        assert_eq!(session.edit(0x15).unwrap(), 0x8015);
        assert_eq!(session.current_value().unwrap(), 0x15);

        session.deselect_field();
        assert_eq!(session.current_value().unwrap(), 0x8015);
        assert_eq!(session.field_value("0x01", "EN_VCM").unwrap(), 1);
    }

    #[test]
    fn register_edit_overwrites() {
        let mut session = session();
        session.select_register("0x2B").unwrap();

        assert_eq!(session.edit_text("0xFFFF8000").unwrap(), 0xffff_8000);
        assert_eq!(session.register_value("0x2B").unwrap(), 0xffff_8000);
        assert_eq!(session.field_value("2b", "bit_15").unwrap(), 1);
        assert_eq!(session.field_value("2b", "bit_14").unwrap(), 0);
    }

    #[test]
    fn bit_toggle_on_register() {
        let mut session = session();
        session.select_register("0x01").unwrap();

        assert_eq!(session.set_bit(31, true).unwrap(), 0x8000_802a);
        assert_eq!(session.set_bit(15, false).unwrap(), 0x8000_002a);
        assert_eq!(session.register_value("0x01").unwrap(), 0x8000_002a);
        assert!(matches!(
            session.set_bit(32, true),
            Err(Error::BitOutOfRange { bit: 32, .. })
        ));
    }

    #[test]
    fn bit_toggle_on_field() {
        let mut session = session();
        session.select_register("0x01").unwrap();
        session.select_field("TX_SEL130").unwrap();

        assert_eq!(session.set_bit(13, true).unwrap(), 0xa02a);
        assert_eq!(session.set_bit(1, false).unwrap(), 0xa028);
        assert_eq!(session.current_value().unwrap(), 0x2028);
    }

    #[test]
    fn bit_toggle_outside_field_is_rejected() {
        let mut session = session();
        session.select_register("0x01").unwrap();
        session.select_field("TX_SEL130").unwrap();

        assert!(matches!(
            session.set_bit(15, false),
            Err(Error::BitOutOfRange { bit: 15, upper: 13, lower: 0 })
        ));
        assert!(session.store().is_empty());

        session.clear_selection();
        assert!(matches!(session.set_bit(0, true), Err(Error::NoSelection)));
    }

    #[test]
    fn changing_selection_does_not_touch_values() {
        let mut session = session();
        session.select_register("0x01").unwrap();
        session.edit(0x1234).unwrap();

        session.select_register("0x2B").unwrap();
        session.select_field("bit_15").unwrap();
        session.clear_selection();

        assert_eq!(session.register_value("0x01").unwrap(), 0x1234);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn reset_to_default() {
        let mut session = session();
        session.select_register("0x01").unwrap();
        session.edit(0).unwrap();
        session.select_field("EN_VCM").unwrap();

        assert_eq!(session.reset_to_default().unwrap(), 0x8000);

        session.deselect_field();
        assert_eq!(session.reset_to_default().unwrap(), 0x802a);
    }

    #[test]
    fn labels_follow_the_store() {
        let mut session = session();

        assert_eq!(
            session.tree_labels("0x01").unwrap(),
            ["EN_VCM [15] = 1", "EN_TX [14] = 0", "TX_SEL130 [13:0] = 42"]
        );
        assert_eq!(
            session.register_label("0x01").unwrap(),
            "0x01 Enable Register = 0x0000802A"
        );

        session.store_mut().set("0x01", 0x4000);

        assert_eq!(
            session.tree_labels("0x01").unwrap(),
            ["EN_VCM [15] = 0", "EN_TX [14] = 1", "TX_SEL130 [13:0] = 0"]
        );
    }

    #[test]
    fn load_starts_over() {
        let mut session = session();
        session.select_register("0x01").unwrap();
        session.edit(7).unwrap();

        session.load(RegisterMap::build(&sample_sheet()));

        assert_eq!(session.selection(), &Selection::Unselected);
        assert!(session.store().is_empty());
        assert_eq!(session.register_value("0x01").unwrap(), 0x802a);
    }
}
