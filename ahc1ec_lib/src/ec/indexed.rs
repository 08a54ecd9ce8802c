//! Indexed subsystem protocols: select an index, then read or write its value
//!
//! AD and GPIO verify the select echo, ACPI RAM, one key recovery and OEM
//! status have no "not defined" sentinel.

use super::protocol::{EcCommand, OemSubCommand};
use super::transaction::{Selected, Step};
use super::{ControllerHandle, EcResult, PortIo};

/// Bits of the AD converter result
const AD_VALUE_MASK: u16 = 0x03FF;
/// Fixed factor applied on top of the caller's multiplier
const AD_SCALE: u32 = 100;

/// Per-pin GPIO register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioRegister {
    /// Pin level
    Status,
    /// Pin direction
    Direction,
}

impl GpioRegister {
    fn read_cmd(self) -> EcCommand {
        match self {
            GpioRegister::Status => EcCommand::GpioStatusRead,
            GpioRegister::Direction => EcCommand::GpioDirRead,
        }
    }

    fn write_cmd(self) -> EcCommand {
        match self {
            GpioRegister::Status => EcCommand::GpioStatusWrite,
            GpioRegister::Direction => EcCommand::GpioDirWrite,
        }
    }
}

impl<P: PortIo> ControllerHandle<P> {
    /// Sample the AD channel on a HW pin
    ///
    /// Returns the 10-bit conversion result scaled by `multiplier * 100`.
    pub fn read_ad_value(&self, pin: u8, multiplier: u8) -> EcResult<u32> {
        let data = self.lock().run(
            "read_ad_value",
            &[
                Step::command(EcCommand::AdIndexWrite),
                Step::Write(pin),
                Step::Verify(Selected::Pin(pin)),
                Step::command(EcCommand::AdLsbRead),
                Step::Read,
                Step::command(EcCommand::AdMsbRead),
                Step::Read,
            ],
        )?;
        let raw = u16::from_le_bytes([data[0], data[1]]) & AD_VALUE_MASK;
        Ok(u32::from(raw) * u32::from(multiplier) * AD_SCALE)
    }

    pub fn read_gpio(&self, pin: u8, register: GpioRegister) -> EcResult<u8> {
        let data = self.lock().run(
            "read_gpio",
            &[
                Step::command(EcCommand::GpioIndexWrite),
                Step::Write(pin),
                Step::Verify(Selected::Pin(pin)),
                Step::command(register.read_cmd()),
                Step::Read,
            ],
        )?;
        Ok(data[0])
    }

    pub fn write_gpio(&self, pin: u8, register: GpioRegister, value: u8) -> EcResult<()> {
        self.lock().run(
            "write_gpio",
            &[
                Step::command(EcCommand::GpioIndexWrite),
                Step::Write(pin),
                Step::Verify(Selected::Pin(pin)),
                Step::command(register.write_cmd()),
                Step::Write(value),
            ],
        )?;
        Ok(())
    }

    pub fn read_gpio_status(&self, pin: u8) -> EcResult<u8> {
        self.read_gpio(pin, GpioRegister::Status)
    }

    pub fn write_gpio_status(&self, pin: u8, value: u8) -> EcResult<()> {
        self.write_gpio(pin, GpioRegister::Status, value)
    }

    pub fn read_gpio_dir(&self, pin: u8) -> EcResult<u8> {
        self.read_gpio(pin, GpioRegister::Direction)
    }

    pub fn write_gpio_dir(&self, pin: u8, value: u8) -> EcResult<()> {
        self.write_gpio(pin, GpioRegister::Direction, value)
    }

    /// Read a byte of the ACPI shadow RAM
    pub fn read_acpi_value(&self, addr: u8) -> EcResult<u8> {
        let data = self.lock().run(
            "read_acpi_value",
            &[
                Step::command(EcCommand::AcpiRamRead),
                Step::Write(addr),
                Step::Read,
            ],
        )?;
        Ok(data[0])
    }

    pub fn write_acpi_value(&self, addr: u8, value: u8) -> EcResult<()> {
        self.lock().run(
            "write_acpi_value",
            &[
                Step::command(EcCommand::AcpiRamWrite),
                Step::Write(addr),
                Step::Write(value),
            ],
        )?;
        Ok(())
    }

    /// Get the status of a one key recovery function
    pub fn read_onekey_status(&self, addr: u8) -> EcResult<u8> {
        let data = self.lock().run(
            "read_onekey_status",
            &[
                Step::command(EcCommand::OneKeyFlag),
                Step::Write(addr),
                Step::Read,
            ],
        )?;
        debug!("read_onekey_status({:#04X}) = {:#04X}", addr, data[0]);
        Ok(data[0])
    }

    /// Trigger a one key recovery function
    ///
    /// The address alone selects what to set, there is no data phase.
    pub fn write_onekey_status(&self, addr: u8) -> EcResult<()> {
        self.lock().run(
            "write_onekey_status",
            &[Step::command(EcCommand::OneKeyFlag), Step::Write(addr)],
        )?;
        debug!("write_onekey_status({:#04X})", addr);
        Ok(())
    }

    pub fn oem_get_status(&self, addr: u8) -> EcResult<u8> {
        let data = self.lock().run(
            "oem_get_status",
            &[
                Step::command(EcCommand::AsgOem),
                Step::Write(OemSubCommand::Read as u8),
                Step::Write(addr),
                Step::Read,
            ],
        )?;
        debug!("oem_get_status({:#04X}) = {:#04X}", addr, data[0]);
        Ok(data[0])
    }

    pub fn oem_set_status(&self, addr: u8, value: u8) -> EcResult<()> {
        self.lock().run(
            "oem_set_status",
            &[
                Step::command(EcCommand::AsgOem),
                Step::Write(OemSubCommand::Write as u8),
                Step::Write(addr),
                Step::Write(value),
            ],
        )?;
        debug!("oem_set_status({:#04X}, {:#04X})", addr, value);
        Ok(())
    }
}
