use core::fmt::{self, Display, Formatter};

use crate::store::RegAddr;

/// An error that can occur when loading, saving or editing a register map
pub enum Error {
    /// Error occured while reading or writing a file
    Io(std::io::Error),

    /// A map or sheet could not be (de)serialized
    #[cfg(feature = "serde")]
    Json(serde_json::Error),

    /// No register with this address is known
    UnknownRegister(RegAddr),

    /// The register has no field with this name
    UnknownField {
        /// Register that was searched
        register: RegAddr,
        /// Requested field name
        name: String,
    },

    /// An edit was requested while nothing was selected
    NoSelection,

    /// Text could not be read as a decimal or `0x` hex value
    InvalidValue(String),

    /// A bit outside the selected register or field was addressed
    BitOutOfRange {
        /// Requested bit
        bit: u8,
        /// Most significant bit of the selection
        upper: u8,
        /// Least significant bit of the selection
        lower: u8,
    },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "I/O error: {}", error),
            #[cfg(feature = "serde")]
            Error::Json(error) => write!(f, "JSON error: {}", error),
            Error::UnknownRegister(addr) => write!(f, "unknown register {}", addr),
            Error::UnknownField { register, name } => {
                write!(f, "register {} has no field {}", register, name)
            }
            Error::NoSelection => write!(f, "no register or field selected"),
            Error::InvalidValue(text) => write!(f, "invalid value {:?}", text),
            Error::BitOutOfRange { bit, upper, lower } => {
                write!(f, "bit {} is outside {}:{}", bit, upper, lower)
            }
        }
    }
}

// Written out by hand to keep the output in line with `ll::Error`.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(error) => write!(f, "Io({:?})", error),
            #[cfg(feature = "serde")]
            Error::Json(error) => write!(f, "Json({:?})", error),
            Error::UnknownRegister(addr) => write!(f, "UnknownRegister({})", addr),
            Error::UnknownField { register, name } => write!(
                f,
                "UnknownField {{ register: {}, name: {:?} }}",
                register, name
            ),
            Error::NoSelection => write!(f, "NoSelection"),
            Error::InvalidValue(text) => write!(f, "InvalidValue({:?})", text),
            Error::BitOutOfRange { bit, upper, lower } => write!(
                f,
                "BitOutOfRange {{ bit: {}, upper: {}, lower: {} }}",
                bit, upper, lower
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            #[cfg(feature = "serde")]
            Error::Json(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_names_the_register() {
        let error = Error::UnknownField {
            register: RegAddr::new("0x2b"),
            name: "EN".into(),
        };

        assert_eq!(error.to_string(), "register 0x2B has no field EN");
        assert_eq!(
            format!("{:?}", error),
            "UnknownField { register: 0x2B, name: \"EN\" }"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        let error = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));

        assert!(std::error::Error::source(&error).is_some());
        assert!(matches!(error, Error::Io(_)));
    }
}
