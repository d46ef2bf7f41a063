//! Bit-field codec
//!
//! Pure functions for moving field values in and out of a 32-bit register
//! word. Nothing in here allocates (apart from [`format_bit_range`]), fails or
//! touches shared state; invalid input degrades to a documented fallback
//! instead.
//!
//! Bit ranges are inclusive and written MSB first, the way register
//! documentation usually spells them: `15:8` covers bits 8 through 15.

/// Highest valid bit index of a register word
pub const MSB: u8 = 31;

/// Anything that occupies a bit range and carries a default value
///
/// Implemented for [`Field`] and for plain `(upper, lower, default)` tuples,
/// so [`compose`] can be fed either.
///
/// [`Field`]: ../map/struct.Field.html
pub trait FieldSpec {
    /// The inclusive `(upper, lower)` bit range
    fn bit_range(&self) -> (u8, u8);

    /// The field's default value, right-aligned
    fn default_value(&self) -> u32;
}

impl FieldSpec for (u8, u8, u32) {
    fn bit_range(&self) -> (u8, u8) {
        (self.0, self.1)
    }

    fn default_value(&self) -> u32 {
        self.2
    }
}

impl<T: FieldSpec + ?Sized> FieldSpec for &T {
    fn bit_range(&self) -> (u8, u8) {
        (**self).bit_range()
    }

    fn default_value(&self) -> u32 {
        (**self).default_value()
    }
}

/// Returns `true` if `lower <= upper <= 31`
#[inline]
pub fn is_valid_range(upper: u8, lower: u8) -> bool {
    lower <= upper && upper <= MSB
}

/// Mask of `upper - lower + 1` low bits
///
/// Returns 0 for an invalid range.
#[inline]
pub fn width_mask(upper: u8, lower: u8) -> u32 {
    if !is_valid_range(upper, lower) {
        return 0;
    }

    u32::MAX >> (MSB - (upper - lower))
}

/// Mask of the bits `[lower, upper]` in their register position
#[inline]
pub fn field_mask(upper: u8, lower: u8) -> u32 {
    width_mask(upper, lower) << (lower & MSB)
}

/// Parses `"U:L"` or a bare `"N"` into `(upper, lower)`
///
/// Malformed input yields `(0, 0)`. That is also a perfectly valid range
/// (bit 0), so callers must not treat `(0, 0)` as proof of valid data.
///
/// ``` rust
/// use regsheet::codec::parse_bit_range;
///
/// assert_eq!(parse_bit_range("15:0"), (15, 0));
/// assert_eq!(parse_bit_range(" 7 "), (7, 7));
/// assert_eq!(parse_bit_range("x:1"), (0, 0));
/// ```
pub fn parse_bit_range(text: &str) -> (u8, u8) {
    let text = text.trim();

    let parsed = match text.split_once(':') {
        Some((upper, lower)) => upper
            .trim()
            .parse::<u8>()
            .and_then(|upper| Ok((upper, lower.trim().parse::<u8>()?))),
        None => text.parse::<u8>().map(|bit| (bit, bit)),
    };

    match parsed {
        Ok(range) => range,
        Err(_) => {
            log::debug!("malformed bit range {:?}, using 0:0", text);
            (0, 0)
        }
    }
}

/// Renders a bit range as `"U:L"`, or `"N"` for a single bit
pub fn format_bit_range(upper: u8, lower: u8) -> String {
    if upper == lower {
        format!("{}", upper)
    } else {
        format!("{}:{}", upper, lower)
    }
}

/// Reads the field `[lower, upper]` out of `word`
///
/// Returns 0 if the range is inverted or reaches past bit 31.
#[inline]
pub fn extract(word: u32, upper: u8, lower: u8) -> u32 {
    if !is_valid_range(upper, lower) {
        return 0;
    }

    (word & field_mask(upper, lower)) >> lower
}

/// Writes `value` into the field `[lower, upper]` of `word`
///
/// `value` is truncated to the field width. Bits outside the field are left
/// as they were. An invalid range leaves `word` untouched.
#[inline]
pub fn insert(word: u32, value: u32, upper: u8, lower: u8) -> u32 {
    if !is_valid_range(upper, lower) {
        log::debug!("ignoring insert into invalid range {}:{}", upper, lower);
        return word;
    }

    (word & !field_mask(upper, lower)) | ((value & width_mask(upper, lower)) << lower)
}

/// Folds the defaults of `fields` into a register word
///
/// Fields whose default is exactly 0 are skipped, so reserved bits come out
/// as zero without special handling.
pub fn compose<I>(fields: I) -> u32
where
    I: IntoIterator,
    I::Item: FieldSpec,
{
    fields
        .into_iter()
        .filter(|field| field.default_value() != 0)
        .fold(0, |word, field| {
            let (upper, lower) = field.bit_range();
            insert(word, field.default_value(), upper, lower)
        })
}

#[cfg(test)]
mod test {
    use super::*;

    const WORDS: [u32; 6] = [
        0x0000_0000,
        0xffff_ffff,
        0xdead_beef,
        0x8000_0001,
        0x1234_5678,
        0x5555_aaaa,
    ];

    fn all_ranges() -> impl Iterator<Item = (u8, u8)> {
        (0..=MSB).flat_map(|upper| (0..=upper).map(move |lower| (upper, lower)))
    }

    #[test]
    fn parse_bit_range_forms() {
        assert_eq!(parse_bit_range("15:0"), (15, 0));
        assert_eq!(parse_bit_range("7"), (7, 7));
        assert_eq!(parse_bit_range(""), (0, 0));
        assert_eq!(parse_bit_range(" 13 : 4 "), (13, 4));
        assert_eq!(parse_bit_range("a:b"), (0, 0));
        assert_eq!(parse_bit_range("3:"), (0, 0));
        assert_eq!(parse_bit_range("-1"), (0, 0));
    }

    #[test]
    fn format_bit_range_forms() {
        assert_eq!(format_bit_range(15, 0), "15:0");
        assert_eq!(format_bit_range(7, 7), "7");
    }

    #[test]
    fn extract_rejects_invalid_ranges() {
        assert_eq!(extract(0xffff_ffff, 3, 4), 0);
        assert_eq!(extract(0xffff_ffff, 32, 0), 0);
        assert_eq!(extract(0xffff_ffff, 31, 0), 0xffff_ffff);
    }

    #[test]
    fn insert_truncates_value() {
        assert_eq!(insert(0, 0xff, 3, 0), 0xf);
        assert_eq!(insert(0, 0x3, 31, 30), 0xc000_0000);
        assert_eq!(insert(0x1234, 0xffff_ffff, 40, 0), 0x1234);
    }

    #[test]
    fn insert_then_extract_returns_value() {
        for (upper, lower) in all_ranges() {
            let max = width_mask(upper, lower);
            for value in [0, 1, max / 3, max >> 1, max] {
                let word = insert(0, value, upper, lower);
                assert_eq!(extract(word, upper, lower), value, "{}:{}", upper, lower);
            }
        }
    }

    #[test]
    fn insert_of_extracted_value_is_identity() {
        for (upper, lower) in all_ranges() {
            for word in WORDS {
                let field = extract(word, upper, lower);
                assert_eq!(insert(word, field, upper, lower), word);
            }
        }
    }

    #[test]
    fn insert_leaves_other_bits_alone() {
        for (upper, lower) in all_ranges() {
            let outside = !field_mask(upper, lower);
            for word in WORDS {
                for value in [0, 0xffff_ffff, 0x1357_9bdf] {
                    let written = insert(word, value, upper, lower);
                    assert_eq!(written & outside, word & outside);
                }
            }
        }
    }

    #[test]
    fn compose_empty_and_zero_defaults() {
        assert_eq!(compose(Vec::<(u8, u8, u32)>::new()), 0);
        let reserved: [(u8, u8, u32); 2] = [(15, 8, 0), (7, 0, 0)];
        assert_eq!(compose(reserved), 0);
    }

    #[test]
    fn compose_enable_register() {
        let fields: [(u8, u8, u32); 3] = [(15, 15, 1), (14, 14, 0), (13, 0, 0x2a)];

        assert_eq!(compose(fields), 0x802a);
    }

    #[test]
    fn compose_later_fields_win_on_overlap() {
        let fields: [(u8, u8, u32); 2] = [(7, 0, 0xff), (3, 0, 0x1)];
        assert_eq!(compose(fields), 0xf1);
    }
}
