//! Register map model
//!
//! A [`RegisterMap`] is built from a [`Grid`] in one pass and replaced
//! wholesale whenever a new sheet is loaded. With the `serde` feature it can be
//! persisted in the established record layout:
//!
//! ```text
//! {"registers":[{"address":str,"description":str,
//!   "fields":[{"name":str,"bit_range":"U:L"|"N","upper_bit":int,
//!              "lower_bit":int,"default_value":str(decimal),"meaning":str}],
//!   "default_value":int}]}
//! ```

use crate::{
    codec::{self, FieldSpec},
    configs::LayoutConfig,
    extract::{FieldExtractor, RegisterTable},
    grid::{self, Grid, MergedRegions},
    meaning::Meanings,
    store::RegAddr,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Address of the placeholder register of an empty map
pub const PLACEHOLDER_ADDRESS: &str = "0x00";

/// A named bit range of a register
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "record::FieldRecord", try_from = "record::FieldRecord")
)]
pub struct Field {
    /// Normalized identifier, unique within its register
    pub name: String,
    /// Most significant bit, inclusive
    pub upper_bit: u8,
    /// Least significant bit, inclusive
    pub lower_bit: u8,
    /// Default value, right-aligned and masked to the field width
    pub default_value: u32,
    /// Human-readable description
    pub meaning: String,
}

impl Field {
    /// Creates a field
    ///
    /// An inverted range is swapped, bits above 31 are clamped, and
    /// `default_value` is masked to the resulting width.
    pub fn new(
        name: impl Into<String>,
        upper_bit: u8,
        lower_bit: u8,
        default_value: u32,
        meaning: impl Into<String>,
    ) -> Self {
        let (upper_bit, lower_bit) = if upper_bit < lower_bit {
            (lower_bit, upper_bit)
        } else {
            (upper_bit, lower_bit)
        };
        let (upper_bit, lower_bit) = (upper_bit.min(codec::MSB), lower_bit.min(codec::MSB));

        Field {
            name: name.into(),
            upper_bit,
            lower_bit,
            default_value: default_value & codec::width_mask(upper_bit, lower_bit),
            meaning: meaning.into(),
        }
    }

    /// Field width in bits
    pub fn width(&self) -> u8 {
        self.upper_bit - self.lower_bit + 1
    }

    /// Largest value the field can hold
    pub fn max_value(&self) -> u32 {
        codec::width_mask(self.upper_bit, self.lower_bit)
    }

    /// The bit range as `"U:L"`, or `"N"` for a single bit
    pub fn bit_range_text(&self) -> String {
        codec::format_bit_range(self.upper_bit, self.lower_bit)
    }

    /// Reads this field out of a register word
    pub fn extract(&self, word: u32) -> u32 {
        codec::extract(word, self.upper_bit, self.lower_bit)
    }

    /// Writes `value` into this field of a register word
    pub fn insert(&self, word: u32, value: u32) -> u32 {
        codec::insert(word, value, self.upper_bit, self.lower_bit)
    }
}

impl FieldSpec for Field {
    fn bit_range(&self) -> (u8, u8) {
        (self.upper_bit, self.lower_bit)
    }

    fn default_value(&self) -> u32 {
        self.default_value
    }
}

/// One register and its fields
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "record::RegisterRecord", try_from = "record::RegisterRecord")
)]
pub struct Register {
    /// Address text as found on the sheet, e.g. `"0x01"`
    pub address: String,
    /// Register description
    pub description: String,
    /// Fields in discovery order
    pub fields: Vec<Field>,
    /// Default value composed from the field defaults
    pub default_value: u32,
}

impl Register {
    /// Creates a register, composing its default from `fields`
    pub fn new(
        address: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<Field>,
    ) -> Self {
        let default_value = codec::compose(&fields);

        Register {
            address: address.into(),
            description: description.into(),
            fields,
            default_value,
        }
    }

    /// The canonical store key of this register
    pub fn key(&self) -> RegAddr {
        RegAddr::new(&self.address)
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl From<RegisterTable> for Register {
    fn from(table: RegisterTable) -> Self {
        Register::new(table.address, table.description, table.fields)
    }
}

/// All registers of a sheet, in discovery order
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterMap {
    registers: Vec<Register>,
}

impl RegisterMap {
    /// Builds the map of `grid` using the default layout
    pub fn build<G: Grid + ?Sized>(grid: &G) -> Self {
        Self::build_with(grid, &LayoutConfig::default())
    }

    /// Builds the map of `grid`
    ///
    /// Every register anchor is handed to the [`FieldExtractor`]; anchors that
    /// yield no fields are skipped. If nothing at all is found and
    /// [`LayoutConfig::placeholder_register`] is set, the map gets a single
    /// placeholder register so consumers never see an empty map.
    pub fn build_with<G: Grid + ?Sized>(grid: &G, config: &LayoutConfig) -> Self {
        let merged = MergedRegions::of(grid);
        let meanings = Meanings::collect(grid, config);
        log::debug!(
            "grid {}x{}: {} merged cells, {} meanings",
            grid.rows(),
            grid.cols(),
            merged.len(),
            meanings.len()
        );

        let extractor = FieldExtractor::new(grid, config, &merged, &meanings);
        let mut registers: Vec<Register> = grid::scan(grid, &config.register_anchor)
            .filter_map(|(row, col)| extractor.extract(row, col))
            .map(Register::from)
            .collect();

        if registers.is_empty() && config.placeholder_register {
            log::warn!(
                "no registers found, inserting placeholder register {}",
                PLACEHOLDER_ADDRESS
            );
            registers.push(Self::placeholder(config));
        }

        log::info!("extracted {} registers", registers.len());
        RegisterMap { registers }
    }

    /// The register that stands in for an empty sheet
    fn placeholder(config: &LayoutConfig) -> Register {
        let top = config.top_bit();
        let name = format!("FIELD_{}_0", top);
        let meaning = format!("{} bits {}:0", name, top);

        Register::new(
            PLACEHOLDER_ADDRESS,
            "Placeholder",
            vec![Field::new(name, top, 0, 0, meaning)],
        )
    }

    /// Creates a map from already extracted registers
    pub fn from_registers(registers: Vec<Register>) -> Self {
        RegisterMap { registers }
    }

    /// The registers in discovery order
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Iterates over the registers
    pub fn iter(&self) -> std::slice::Iter<'_, Register> {
        self.registers.iter()
    }

    /// Number of registers
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Returns `true` if the map holds no register
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Looks up a register by address, in any spelling
    pub fn get(&self, addr: impl Into<RegAddr>) -> Option<&Register> {
        let addr = addr.into();
        self.registers.iter().find(|register| register.key() == addr)
    }
}

impl<'a> IntoIterator for &'a RegisterMap {
    type Item = &'a Register;
    type IntoIter = std::slice::Iter<'a, Register>;

    fn into_iter(self) -> Self::IntoIter {
        self.registers.iter()
    }
}

#[cfg(feature = "serde")]
impl RegisterMap {
    /// Serializes the map to compact JSON
    pub fn to_json(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the map to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a map from JSON
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the map to `path` as indented JSON
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), crate::Error> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!("saved {} registers to {}", self.len(), path.display());

        Ok(())
    }

    /// Reads a map from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let map = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("loaded {} registers from {}", map.len(), path.display());

        Ok(map)
    }
}

#[cfg(feature = "serde")]
mod record {
    //! On-disk record layout
    //!
    //! Field defaults are stored as decimal text and bit ranges are stored
    //! twice, as text and as numbers. Older files may carry hex defaults
    //! (`"0x2A"`) or omit the numeric bounds, so both are accepted on input.

    use serde::{Deserialize, Serialize};

    use super::{Field, Register};
    use crate::codec;

    #[derive(Serialize, Deserialize)]
    pub struct FieldRecord {
        name: String,
        #[serde(default)]
        bit_range: String,
        #[serde(default)]
        upper_bit: Option<u8>,
        #[serde(default)]
        lower_bit: Option<u8>,
        #[serde(default)]
        default_value: DefaultValue,
        #[serde(default)]
        meaning: String,
    }

    /// A default given as decimal/hex text or as a plain number
    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum DefaultValue {
        Number(u32),
        Text(String),
    }

    impl Default for DefaultValue {
        fn default() -> Self {
            DefaultValue::Number(0)
        }
    }

    impl DefaultValue {
        fn value(&self) -> Result<u32, String> {
            match self {
                DefaultValue::Number(value) => Ok(*value),
                DefaultValue::Text(text) => {
                    let text = text.trim();
                    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                        Some(hex) => u32::from_str_radix(hex, 16),
                        None if text.is_empty() => Ok(0),
                        None => text.parse(),
                    };
                    parsed.map_err(|_| format!("invalid default value {:?}", text))
                }
            }
        }
    }

    impl From<Field> for FieldRecord {
        fn from(field: Field) -> Self {
            FieldRecord {
                bit_range: field.bit_range_text(),
                upper_bit: Some(field.upper_bit),
                lower_bit: Some(field.lower_bit),
                default_value: DefaultValue::Text(field.default_value.to_string()),
                name: field.name,
                meaning: field.meaning,
            }
        }
    }

    impl TryFrom<FieldRecord> for Field {
        type Error = String;

        fn try_from(record: FieldRecord) -> Result<Self, Self::Error> {
            let (upper, lower) = match (record.upper_bit, record.lower_bit) {
                (Some(upper), Some(lower)) => (upper, lower),
                _ => codec::parse_bit_range(&record.bit_range),
            };
            if !codec::is_valid_range(upper, lower) {
                return Err(format!(
                    "field {} has invalid bit range {}:{}",
                    record.name, upper, lower
                ));
            }

            let default_value = record.default_value.value()?;
            let meaning = if record.meaning.is_empty() {
                match upper == lower {
                    true => format!("{} bit {}", record.name, upper),
                    false => format!("{} bits {}:{}", record.name, upper, lower),
                }
            } else {
                record.meaning
            };

            Ok(Field::new(record.name, upper, lower, default_value, meaning))
        }
    }

    #[derive(Serialize, Deserialize)]
    pub struct RegisterRecord {
        address: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        fields: Vec<Field>,
        #[serde(default)]
        default_value: Option<u32>,
    }

    impl From<Register> for RegisterRecord {
        fn from(register: Register) -> Self {
            RegisterRecord {
                address: register.address,
                description: register.description,
                fields: register.fields,
                default_value: Some(register.default_value),
            }
        }
    }

    impl TryFrom<RegisterRecord> for Register {
        type Error = String;

        fn try_from(record: RegisterRecord) -> Result<Self, Self::Error> {
            let mut register = Register::new(record.address, record.description, record.fields);
            if let Some(default_value) = record.default_value {
                register.default_value = default_value;
            }

            Ok(register)
        }
    }
}
