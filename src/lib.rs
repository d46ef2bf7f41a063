//! Register maps from spreadsheet layouts
//!
//! Hardware register documentation is often kept as a worksheet: one table
//! per register, bit numbers across the top, field names below them (merged
//! across the bits of multi-bit fields) and per-bit reset values underneath.
//! This crate turns such a [`Grid`] into a [`RegisterMap`], composes and
//! splits register words with the [bit-field codec], and keeps live values in
//! a [`RegisterStateStore`].
//!
//! The recommended way to work with a map is the [high-level interface]. To
//! move values to and from a device, use the [register-level interface],
//! which is built on top of [`embedded-hal`].
//!
//! ``` rust
//! use regsheet::{grid::Sheet, RegisterMap};
//!
//! let mut sheet = Sheet::new();
//! sheet.set(0, 0, "Addr").set(0, 1, "0x01").set(0, 2, "Control");
//! sheet.set_row(1, 1, (0..16u32).rev());
//! sheet.set_row(2, 1, ["EN"]);
//! sheet.set_row(3, 1, [1u32]);
//!
//! let map = RegisterMap::build(&sheet);
//! assert_eq!(map.get("1").unwrap().default_value, 0x8000);
//! ```
//!
//! [bit-field codec]: codec/index.html
//! [high-level interface]: hl/index.html
//! [register-level interface]: ll/index.html
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#[cfg(feature = "async")]
use maybe_async::must_be_async as maybe_async_attr;
#[cfg(not(feature = "async"))]
use maybe_async::must_be_sync as maybe_async_attr;

#[cfg(not(feature = "async"))]
use embedded_hal as spi_type;
#[cfg(feature = "async")]
use embedded_hal_async as spi_type;

pub mod codec;
pub mod configs;
pub mod extract;
pub mod grid;
pub mod hl;
pub mod ll;
pub mod map;
pub mod meaning;
pub mod store;

mod error;

pub use crate::{
    codec::FieldSpec,
    configs::LayoutConfig,
    error::Error,
    grid::{Grid, Sheet},
    hl::{Selection, Session},
    ll::RegisterBus,
    map::{Field, Register, RegisterMap},
    store::{RegAddr, RegisterStateStore, SharedStore},
};
