//! Host side of the AHC1EC0 embedded controller interface
//!
//! The EC is reached through two I/O ports: a command port (which also reports
//! the IBF/OBF status bits) and a data port. Every access is a short handshake
//! of command, index, data and response bytes, and no two of them may
//! interleave. All access therefore goes through a [`ControllerHandle`], which
//! owns the port pair behind a single lock. Holding the lock is represented by
//! a [`Transaction`].
//!
//! - HW RAM: [`ControllerHandle::read_ram`], [`ControllerHandle::write_ram`], ...
//! - Indexed protocols: AD, GPIO, ACPI RAM, one key recovery, OEM status
//! - SMBus pass-through: [`ControllerHandle::smbus_read_byte`], ...
//! - Dynamic control table: [`ControllerHandle::enumerate_dynamic_table`]

use alloc::string::String;
use core::fmt;
use core::time::Duration;

use std::sync::{Mutex, PoisonError};

mod dynamic_table;
mod indexed;
#[cfg(any(feature = "linux_pio", feature = "raw_pio"))]
pub mod portio;
pub mod protocol;
mod ram;
#[cfg(test)]
pub(crate) mod sim;
pub mod smbus;
pub mod transaction;

pub use dynamic_table::{DynamicEntry, DynamicTable};
pub use indexed::GpioRegister;
pub use smbus::SmbusRequest;
pub use transaction::{Selected, Step, Transaction};

use protocol::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcError {
    /// Waiting for IBF clear or OBF set exceeded the retry budget
    Timeout,
    /// EC echoed 0xFF when selecting this pin
    InvalidPin(u8),
    /// EC echoed 0xFF for this dynamic table item
    InvalidIndex(u8),
    /// SMBus pass-through finished with this status instead of 0x80
    SmbusError(u8),
    /// Request was rejected before touching the ports
    InvalidArgument(&'static str),
    /// Ports couldn't be attached
    DeviceError(String),
}
pub type EcResult<T> = Result<T, EcError>;

impl fmt::Display for EcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EcError::Timeout => write!(f, "Timed out waiting for the EC"),
            EcError::InvalidPin(pin) => write!(f, "Pin {:#04X} is not defined", pin),
            EcError::InvalidIndex(index) => write!(f, "Table item {} is not defined", index),
            EcError::SmbusError(status) => write!(f, "SMBus error, status {:#04X}", status),
            EcError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            EcError::DeviceError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EcError {}

/// Answer of the EC to an index select
///
/// The EC signals "not defined" with 0xFF, which can't be told apart from a
/// genuine 0xFF echo. Keep the comparison in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(u8),
    Undefined,
}

impl Lookup {
    pub fn from_echo(byte: u8) -> Self {
        if byte == EC_UNDEFINED {
            Lookup::Undefined
        } else {
            Lookup::Found(byte)
        }
    }

    pub fn found_or(self, err: EcError) -> EcResult<u8> {
        match self {
            Lookup::Found(byte) => Ok(byte),
            Lookup::Undefined => Err(err),
        }
    }
}

/// The two ports of the EC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Opcodes are written here, the status byte is read from here
    Command,
    /// Index, data and responses
    Data,
}

impl Port {
    pub fn address(self) -> u16 {
        match self {
            Port::Command => EC_COMMAND_PORT,
            Port::Data => EC_STATUS_PORT,
        }
    }
}

/// Byte access to the EC port pair
///
/// Implemented with port I/O on real hardware and by a simulated controller in tests.
pub trait PortIo {
    fn inb(&mut self, port: Port) -> u8;
    fn outb(&mut self, port: Port, value: u8);
}

/// Retry budgets and poll delay shared by every protocol of one controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcTiming {
    /// Status polls when waiting for IBF clear or OBF set
    pub max_retries: u32,
    /// Delay between two polls. Zero means don't sleep at all
    pub poll_delay: Duration,
    /// Polls of the SMBus protocol cell
    pub smbus_retries: u32,
}

impl Default for EcTiming {
    fn default() -> Self {
        EcTiming {
            max_retries: EC_MAX_TIMEOUT_COUNT,
            poll_delay: Duration::from_micros(EC_UDELAY_TIME),
            smbus_retries: EC_SMBUS_RETRY_COUNT,
        }
    }
}

/// Exclusive owner of the EC port pair
///
/// Every operation locks the port pair for its whole command sequence, so
/// the handle can be shared between threads (e.g. in an `Arc`).
pub struct ControllerHandle<P: PortIo> {
    ports: Mutex<P>,
    timing: EcTiming,
}

impl<P: PortIo> ControllerHandle<P> {
    pub fn new(ports: P) -> Self {
        Self::with_timing(ports, EcTiming::default())
    }

    pub fn with_timing(ports: P, timing: EcTiming) -> Self {
        ControllerHandle {
            ports: Mutex::new(ports),
            timing,
        }
    }

    pub fn timing(&self) -> &EcTiming {
        &self.timing
    }

    /// Take the lock on the port pair
    ///
    /// Blocks (sleeping) until no other transaction is in flight. The lock is
    /// released when the returned transaction is dropped. A transaction that
    /// panicked leaves the ports usable, every sequence starts from a fresh
    /// IBF wait.
    pub fn lock(&self) -> Transaction<'_, P> {
        let ports = self.ports.lock().unwrap_or_else(PoisonError::into_inner);
        Transaction::new(ports, &self.timing)
    }

    /// Give up the controller and get back the port pair
    pub fn into_ports(self) -> P {
        self.ports.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
