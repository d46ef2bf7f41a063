//! Register-level access to a device described by a register map
//!
//! This module moves 32-bit register values over SPI. Every access is one
//! 5-byte transfer: a header byte `(rw << 7) | (address & 0x7F)`, where `rw`
//! is 1 for a read and 0 for a write, followed by the data word in big-endian
//! order. On a read the device shifts the word out in the last four bytes.
//!
//! [`RegisterBus::write_all`] and [`RegisterBus::read_all`] synchronize a
//! whole [`RegisterStateStore`] with the device. They only ever use
//! [`RegisterStateStore::get_or_default`] and [`RegisterStateStore::set`], so
//! the store stays the single owner of the values.
//!
//! **NOTE**: Addresses wider than seven bits are masked, with a warning.

use core::fmt;

use byte::{ctx::BE, BytesExt as _};

use crate::{
    codec, maybe_async_attr,
    map::RegisterMap,
    spi_type,
    store::{RegAddr, RegisterStateStore},
};

/// Length of one frame: header byte plus data word
pub const FRAME_LEN: usize = 5;

/// Largest address the header can carry
pub const MAX_ADDRESS: u8 = 0x7F;

/// Moves register values between a [`RegisterStateStore`] and a device
pub struct RegisterBus<SPI> {
    spi: SPI,
}

impl<SPI> RegisterBus<SPI> {
    /// Create a new instance of `RegisterBus`
    ///
    /// Requires the SPI device the registers live behind.
    pub fn new(spi: SPI) -> Self {
        RegisterBus { spi }
    }

    /// Allow access to the SPI bus
    pub fn bus(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Releases the SPI device
    pub fn free(self) -> SPI {
        self.spi
    }
}

impl<SPI> RegisterBus<SPI>
where
    SPI: spi_type::spi::SpiDevice<u8>,
{
    /// Read one register
    #[maybe_async_attr]
    pub async fn read(&mut self, addr: impl Into<RegAddr>) -> Result<u32, Error<SPI>> {
        let addr = addr.into();
        let mut buffer = [0; FRAME_LEN];
        init_header(false, bus_address(&addr)?, &mut buffer);

        self.spi
            .transfer_in_place(&mut buffer)
            .await
            .map_err(Error::Spi)?;

        let value = buffer[..].read_with::<u32>(&mut 1, BE).map_err(Error::Frame)?;
        log::trace!("read {} = 0x{:08X}", addr, value);

        Ok(value)
    }

    /// Write one register
    #[maybe_async_attr]
    pub async fn write(&mut self, addr: impl Into<RegAddr>, value: u32) -> Result<(), Error<SPI>> {
        let addr = addr.into();
        let mut buffer = [0; FRAME_LEN];
        init_header(true, bus_address(&addr)?, &mut buffer);
        buffer[..]
            .write_with::<u32>(&mut 1, value, BE)
            .map_err(Error::Frame)?;

        self.spi
            .transfer_in_place(&mut buffer)
            .await
            .map_err(Error::Spi)?;
        log::trace!("wrote {} = 0x{:08X}", addr, value);

        Ok(())
    }

    /// Modify one field of a register on the device
    ///
    /// Reads the register, inserts `value` into `upper:lower` and writes the
    /// result back. Returns the value written.
    #[maybe_async_attr]
    pub async fn modify_field(
        &mut self,
        addr: impl Into<RegAddr>,
        upper: u8,
        lower: u8,
        value: u32,
    ) -> Result<u32, Error<SPI>> {
        let addr = addr.into();
        let current = self.read(addr.clone()).await?;
        let updated = codec::insert(current, value, upper, lower);
        self.write(addr, updated).await?;

        Ok(updated)
    }

    /// Writes every register of `map`, taking values from `store`
    ///
    /// Registers never written in the store are sent with their default.
    /// Returns the number of registers written.
    #[maybe_async_attr]
    pub async fn write_all(
        &mut self,
        map: &RegisterMap,
        store: &RegisterStateStore,
    ) -> Result<usize, Error<SPI>> {
        for register in map {
            let addr = register.key();
            let value = store.get_or_default(addr.clone(), register.default_value);
            self.write(addr, value).await?;
        }

        log::debug!("wrote {} registers", map.len());
        Ok(map.len())
    }

    /// Reads every register of `map` from the device into `store`
    ///
    /// Returns the number of registers read.
    #[maybe_async_attr]
    pub async fn read_all(
        &mut self,
        map: &RegisterMap,
        store: &mut RegisterStateStore,
    ) -> Result<usize, Error<SPI>> {
        for register in map {
            let addr = register.key();
            let value = self.read(addr.clone()).await?;
            store.set(addr, value);
        }

        log::debug!("read {} registers", map.len());
        Ok(map.len())
    }
}

/// An error that can occur when talking to the device
pub enum Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
{
    /// SPI error occured during a transfer transaction
    Spi(SPI::Error),

    /// The register address is not a hex number
    InvalidAddress(RegAddr),

    /// The data word could not be framed
    Frame(byte::Error),
}

// We can't derive this implementation, as the compiler will complain that the
// associated error type doesn't implement `Debug`.
impl<SPI> fmt::Debug for Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
    SPI::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Spi(error) => write!(f, "Spi({:?})", error),
            Error::InvalidAddress(addr) => write!(f, "InvalidAddress({})", addr),
            Error::Frame(error) => write!(f, "Frame({:?})", error),
        }
    }
}

impl<SPI> fmt::Display for Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
    SPI::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl<SPI> std::error::Error for Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
    SPI::Error: fmt::Debug,
{
}

/// Turns a register key into the seven header address bits
fn bus_address<SPI>(addr: &RegAddr) -> Result<u8, Error<SPI>>
where
    SPI: spi_type::spi::ErrorType,
{
    let value = addr
        .value()
        .ok_or_else(|| Error::InvalidAddress(addr.clone()))?;

    if value > u32::from(MAX_ADDRESS) {
        log::warn!(
            "address {} does not fit the header, using 0x{:02X}",
            addr,
            value & u32::from(MAX_ADDRESS)
        );
    }

    Ok((value & u32::from(MAX_ADDRESS)) as u8)
}

/// Initializes the frame header
///
/// The first bit selects the direction, the remaining seven carry the
/// register address.
#[inline(always)]
fn init_header(write: bool, addr: u8, buffer: &mut [u8]) {
    buffer[0] = ((!write as u8) << 7) | (addr & MAX_ADDRESS);
}

#[cfg(all(test, feature = "async"))]
mod test {
    use super::*;

    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    use crate::map::{Field, Register};

    fn frame(request: Vec<u8>, response: Vec<u8>) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer_in_place(request, response),
            SpiTransaction::transaction_end(),
        ]
    }

    fn map() -> RegisterMap {
        RegisterMap::from_registers(vec![
            Register::new("0x01", "Enable", vec![Field::new("EN_VCM", 15, 15, 1, "")]),
            Register::new("0x2B", "Status", vec![Field::new("BIT0", 0, 0, 0, "")]),
        ])
    }

    #[test]
    fn header() {
        let mut buffer = [0; FRAME_LEN];

        init_header(false, 0x2b, &mut buffer);
        assert_eq!(buffer[0], 0xab);

        init_header(true, 0x2b, &mut buffer);
        assert_eq!(buffer[0], 0x2b);
    }

    #[tokio::test]
    async fn read_register() {
        let spi = SpiMock::new(&frame(vec![0x81, 0, 0, 0, 0], vec![0, 0, 0, 0x80, 0x2a]));
        let mut bus = RegisterBus::new(spi);

        assert_eq!(bus.read("0x01").await.unwrap(), 0x802a);

        bus.free().done();
    }

    #[tokio::test]
    async fn write_register() {
        let spi = SpiMock::new(&frame(vec![0x2b, 0x12, 0x34, 0x56, 0x78], vec![0; 5]));
        let mut bus = RegisterBus::new(spi);

        bus.write("2b", 0x1234_5678).await.unwrap();

        bus.free().done();
    }

    #[tokio::test]
    async fn modify_field_keeps_other_bits() {
        let mut transactions = frame(vec![0x82, 0, 0, 0, 0], vec![0, 0, 0, 0x80, 0x2a]).to_vec();
        transactions.extend(frame(vec![0x02, 0, 0, 0x80, 0x15], vec![0; 5]));
        let mut bus = RegisterBus::new(SpiMock::new(&transactions));

        assert_eq!(bus.modify_field("0x02", 13, 0, 0x15).await.unwrap(), 0x8015);

        bus.free().done();
    }

    #[tokio::test]
    async fn write_all_uses_store_then_defaults() {
        let mut transactions = frame(vec![0x01, 0, 0, 0x80, 0], vec![0; 5]).to_vec();
        transactions.extend(frame(vec![0x2b, 0, 0, 0, 0x07], vec![0; 5]));
        let mut bus = RegisterBus::new(SpiMock::new(&transactions));
        let mut store = RegisterStateStore::new();
        store.set("0x2b", 7);

        assert_eq!(bus.write_all(&map(), &store).await.unwrap(), 2);
        assert_eq!(store.len(), 1);

        bus.free().done();
    }

    #[tokio::test]
    async fn read_all_fills_store() {
        let mut transactions = frame(vec![0x81, 0, 0, 0, 0], vec![0, 0, 0, 0, 1]).to_vec();
        transactions.extend(frame(vec![0xab, 0, 0, 0, 0], vec![0, 0xde, 0xad, 0xbe, 0xef]));
        let mut bus = RegisterBus::new(SpiMock::new(&transactions));
        let mut store = RegisterStateStore::new();

        bus.read_all(&map(), &mut store).await.unwrap();

        assert_eq!(store.get("01"), Some(1));
        assert_eq!(store.get("2B"), Some(0xdead_beef));

        bus.free().done();
    }

    #[tokio::test]
    async fn wide_addresses_are_masked() {
        let spi = SpiMock::new(&frame(vec![0x00, 0, 0, 0, 1], vec![0; 5]));
        let mut bus = RegisterBus::new(spi);

        bus.write("0x80", 1).await.unwrap();

        bus.free().done();
    }

    #[tokio::test]
    async fn invalid_address_sends_nothing() {
        let mut bus = RegisterBus::new(SpiMock::new(&[]));

        let result = bus.read("0xZZ").await;

        assert!(matches!(result, Err(Error::InvalidAddress(_))));
        bus.free().done();
    }
}
