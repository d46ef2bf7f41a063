use crate::Error;

/// Renders a register value as `0x` followed by eight hex digits
pub fn format_hex(value: u32) -> String {
    format!("0x{:08X}", value)
}

/// Renders a value in decimal
pub fn format_dec(value: u32) -> String {
    value.to_string()
}

/// Reads a value typed by a user, either decimal or `0x` hex
///
/// ``` rust
/// use regsheet::hl::parse_value;
///
/// assert_eq!(parse_value("42").unwrap(), 42);
/// assert_eq!(parse_value(" 0x2A ").unwrap(), 42);
/// assert!(parse_value("forty-two").is_err());
/// ```
pub fn parse_value(text: &str) -> Result<u32, Error> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };

    parsed.map_err(|_| Error::InvalidValue(text.to_owned()))
}
