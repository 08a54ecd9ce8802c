//! Port addresses, status bits and opcodes of the AHC1EC0 host interface.
//!
//! These have to match the controller firmware byte for byte.

use num_derive::FromPrimitive;

// I/O addresses for the EC handshake
/// Commands are written here, the status byte is read from here
pub const EC_COMMAND_PORT: u16 = 0x29A;
/// Index, data and response bytes go through here
pub const EC_STATUS_PORT: u16 = 0x299;

// Command port status byte masks
/// EC has written data but host hasn't consumed it yet
pub const EC_STATUS_OBF: u8 = 0x01;
/// Host has written data/command but EC hasn't consumed it yet
pub const EC_STATUS_IBF: u8 = 0x02;

/// Polls of the status byte before giving up on IBF/OBF
pub const EC_MAX_TIMEOUT_COUNT: u32 = 5000;
/// Delay between two status polls in microseconds
pub const EC_UDELAY_TIME: u64 = 50;
/// Polls of the SMBus protocol cell before giving up on a pass-through transfer
pub const EC_SMBUS_RETRY_COUNT: u32 = 1000;

/// Echoed by the EC when a selected index (pin, table item) is not defined
pub const EC_UNDEFINED: u8 = 0xFF;

/// Number of entries in the dynamic control table. Item numbers are 0 to 31
pub const EC_MAX_TBL_NUM: u8 = 32;

/// Opcodes written to the command port
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum EcCommand {
    /// Select a GPIO pin. EC echoes the pin or 0xFF
    GpioIndexWrite = 0x10,
    GpioStatusRead = 0x11,
    GpioStatusWrite = 0x12,
    /// Select an AD channel by HW pin. EC echoes the pin or 0xFF
    AdIndexWrite = 0x15,
    AdLsbRead = 0x16,
    GpioDirRead = 0x1D,
    GpioDirWrite = 0x1E,
    AdMsbRead = 0x1F,
    /// Select an item of the dynamic control table. EC echoes the item or 0xFF
    TblWriteItem = 0x20,
    /// HW pin number of the selected table item
    TblGetPin = 0x21,
    /// Device ID of the selected table item
    TblGetDevId = 0x22,
    /// Standard ACPI EC read (shadow RAM)
    AcpiRamRead = 0x80,
    /// Standard ACPI EC write (shadow RAM)
    AcpiRamWrite = 0x81,
    HwExtendRamRead = 0x86,
    HwExtendRamWrite = 0x87,
    HwRamRead = 0x88,
    HwRamWrite = 0x89,
    /// One key recovery functions
    OneKeyFlag = 0x9C,
    /// ASG OEM status, followed by an [`OemSubCommand`]
    AsgOem = 0xEA,
}

/// Second byte of an [`EcCommand::AsgOem`] sequence, sent to the data port
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum OemSubCommand {
    Read = 0x00,
    Write = 0x01,
}

// HW RAM cells of the SMBus pass-through engine.
// Same layout as the ACPI SMBus host controller interface.
/// Writing a protocol code here arms the engine. Reads back 0 once it's done
pub const EC_SMBUS_PROTOCOL: u8 = 0x00;
pub const EC_SMBUS_STATUS: u8 = 0x01;
pub const EC_SMBUS_SLV_ADDR: u8 = 0x02;
/// Register of the downstream chip
pub const EC_SMBUS_CMD: u8 = 0x03;
pub const EC_SMBUS_DATA: u8 = 0x04;
pub const EC_SMBUS_CHANNEL: u8 = 0x2B;

/// Data cell `n` of the SMBus engine. Word transfers use offset 0 (MSB) and 1 (LSB)
pub const fn ec_smbus_dat_offset(n: u8) -> u8 {
    EC_SMBUS_DATA + n
}

/// Status cell value after a transfer completed without error
pub const SMBUS_STATUS_DONE: u8 = 0x80;

/// Protocol codes written to [`EC_SMBUS_PROTOCOL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum SmbusProtocol {
    ByteWrite = 0x06,
    ByteRead = 0x07,
    WordWrite = 0x08,
    WordRead = 0x09,
}

impl SmbusProtocol {
    pub fn is_read(self) -> bool {
        matches!(self, SmbusProtocol::ByteRead | SmbusProtocol::WordRead)
    }

    pub fn is_word(self) -> bool {
        matches!(self, SmbusProtocol::WordRead | SmbusProtocol::WordWrite)
    }
}
