//! High-level interface to a register map
//!
//! The entry point to this API is the [Session] struct. It owns the current
//! [`RegisterMap`], the [`RegisterStateStore`] holding live values and the
//! selection of an editor or tree view. All reads go through the store, so
//! what is shown is always derived from the model.
//!
//! If you only need to move values between a store and a device, the
//! [register-level interface] is enough.
//!
//! [register-level interface]: ../ll/index.html
//! [`RegisterMap`]: crate::map::RegisterMap
//! [`RegisterStateStore`]: crate::store::RegisterStateStore

pub use format::*;
pub use session::*;

mod format;
mod session;
