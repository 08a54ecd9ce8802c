//! HW RAM access, the primitive most other subsystems are built on

use super::protocol::EcCommand;
use super::transaction::Step;
use super::{ControllerHandle, EcResult, PortIo, Transaction};

const fn read_steps(cmd: EcCommand, addr: u8) -> [Step; 3] {
    [Step::command(cmd), Step::Write(addr), Step::Read]
}

const fn write_steps(cmd: EcCommand, addr: u8, data: u8) -> [Step; 3] {
    [Step::command(cmd), Step::Write(addr), Step::Write(data)]
}

/// HW RAM access from within a transaction that already holds the lock
impl<'a, P: PortIo> Transaction<'a, P> {
    pub fn read_ram(&mut self, addr: u8) -> EcResult<u8> {
        let data = self.run("read_ram", &read_steps(EcCommand::HwRamRead, addr))?;
        Ok(data[0])
    }

    pub fn write_ram(&mut self, addr: u8, data: u8) -> EcResult<()> {
        self.run("write_ram", &write_steps(EcCommand::HwRamWrite, addr, data))?;
        Ok(())
    }
}

impl<P: PortIo> ControllerHandle<P> {
    /// Read one byte of EC HW RAM
    pub fn read_ram(&self, addr: u8) -> EcResult<u8> {
        self.lock().read_ram(addr)
    }

    /// Write one byte of EC HW RAM
    ///
    /// No response follows the data byte, so this doesn't wait for OBF.
    pub fn write_ram(&self, addr: u8, data: u8) -> EcResult<()> {
        self.lock().write_ram(addr, data)
    }

    pub fn read_extended_ram(&self, addr: u8) -> EcResult<u8> {
        let data = self
            .lock()
            .run("read_extended_ram", &read_steps(EcCommand::HwExtendRamRead, addr))?;
        Ok(data[0])
    }

    pub fn write_extended_ram(&self, addr: u8, data: u8) -> EcResult<()> {
        self.lock().run(
            "write_extended_ram",
            &write_steps(EcCommand::HwExtendRamWrite, addr, data),
        )?;
        Ok(())
    }

    /// Send a bare opcode to the command port, without index or data phase
    pub fn write_raw_command(&self, cmd: u8) -> EcResult<()> {
        self.lock().run("write_raw_command", &[Step::Command(cmd)])?;
        Ok(())
    }
}
