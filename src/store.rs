//! Live register values
//!
//! [`RegisterStateStore`] is the single source of truth for the current value
//! of every register. Presentation layers read from it, transports read and
//! write through it, and nothing reconstructs a value from its own rendered
//! output.
//!
//! Entries are created lazily: reading with a fallback never stores
//! anything, only a write does. Field edits must go through
//! [`RegisterStateStore::set_field`], which preserves all bits outside the
//! field.

use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use crate::codec;

/// Canonical register address key
///
/// Register addresses show up spelled in several ways (`"0x02"`, `"02"`,
/// `"2"`). Every key is canonicalized on the way in: surrounding whitespace
/// and a `0x`/`0X` prefix are dropped, and hex digits are rendered as
/// uppercase with at least two digits. Text that is not hex is kept as
/// uppercase text, so a mis-spelled address still becomes its own entry.
///
/// ``` rust
/// use regsheet::store::RegAddr;
///
/// assert_eq!(RegAddr::new("0x2"), RegAddr::new("02"));
/// assert_eq!(RegAddr::new(" 0x2b ").as_str(), "2B");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RegAddr(String);

impl RegAddr {
    /// Canonicalizes `text`
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);

        match u32::from_str_radix(digits, 16) {
            Ok(value) if !digits.starts_with('+') => RegAddr(format!("{:02X}", value)),
            _ => RegAddr(digits.to_uppercase()),
        }
    }

    /// Creates the key for a numeric address
    pub fn from_value(value: u32) -> Self {
        RegAddr(format!("{:02X}", value))
    }

    /// The canonical text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric address, if the key is hex
    pub fn value(&self) -> Option<u32> {
        u32::from_str_radix(&self.0, 16).ok()
    }
}

impl fmt::Display for RegAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

impl From<&str> for RegAddr {
    fn from(text: &str) -> Self {
        RegAddr::new(text)
    }
}

impl From<&String> for RegAddr {
    fn from(text: &String) -> Self {
        RegAddr::new(text)
    }
}

impl From<u32> for RegAddr {
    fn from(value: u32) -> Self {
        RegAddr::from_value(value)
    }
}

/// Current 32-bit value of every register touched so far
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterStateStore {
    values: HashMap<RegAddr, u32>,
}

/// A store shared between several actors
///
/// [`RegisterStateStore::set_field`] is a read-modify-write, so concurrent
/// editors must hold the lock across the whole call.
pub type SharedStore = Arc<Mutex<RegisterStateStore>>;

impl RegisterStateStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the store for sharing
    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Returns the stored value, or `fallback` if there is none
    ///
    /// The fallback is not stored.
    pub fn get_or_default(&self, addr: impl Into<RegAddr>, fallback: u32) -> u32 {
        self.get(addr).unwrap_or(fallback)
    }

    /// Returns the stored value, if any
    pub fn get(&self, addr: impl Into<RegAddr>) -> Option<u32> {
        self.values.get(&addr.into()).copied()
    }

    /// Overwrites the whole register
    pub fn set(&mut self, addr: impl Into<RegAddr>, value: u32) {
        let addr = addr.into();
        log::trace!("{} <- 0x{:08X}", addr, value);
        self.values.insert(addr, value);
    }

    /// Writes one field, preserving every other bit of the register
    ///
    /// The current value is read via [`get_or_default`](Self::get_or_default),
    /// so the first edit of a register starts from `fallback`, usually the
    /// register's default. `field_value` is truncated to the field width.
    /// Returns the new register value.
    pub fn set_field(
        &mut self,
        addr: impl Into<RegAddr>,
        upper: u8,
        lower: u8,
        field_value: u32,
        fallback: u32,
    ) -> u32 {
        let addr = addr.into();
        let current = self.get_or_default(addr.clone(), fallback);
        let value = codec::insert(current, field_value, upper, lower);

        log::trace!(
            "{}[{}] <- {} (0x{:08X} -> 0x{:08X})",
            addr,
            codec::format_bit_range(upper, lower),
            field_value,
            current,
            value
        );
        self.values.insert(addr, value);

        value
    }

    /// Reads one field out of the register
    pub fn field(&self, addr: impl Into<RegAddr>, upper: u8, lower: u8, fallback: u32) -> u32 {
        codec::extract(self.get_or_default(addr, fallback), upper, lower)
    }

    /// Drops the entry for `addr`, so the next read falls back again
    pub fn remove(&mut self, addr: impl Into<RegAddr>) -> Option<u32> {
        self.values.remove(&addr.into())
    }

    /// Returns `true` if `addr` has been written
    pub fn contains(&self, addr: impl Into<RegAddr>) -> bool {
        self.values.contains_key(&addr.into())
    }

    /// Number of written registers
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over written registers in address order
    ///
    /// Numeric addresses come first, ordered by value. Keys that are not hex
    /// follow in text order.
    pub fn iter(&self) -> impl Iterator<Item = (&RegAddr, u32)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(addr, value)| (addr, *value))
            .collect();
        entries.sort_by(|(a, _), (b, _)| match (a.value(), b.value()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        entries.into_iter()
    }
}
