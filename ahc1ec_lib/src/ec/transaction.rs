//! Handshake primitives and the step runner every protocol is built from

use alloc::vec::Vec;

use log::Level;
use num_traits::FromPrimitive;
use std::sync::MutexGuard;

use super::protocol::*;
use super::{EcError, EcResult, EcTiming, Lookup, Port, PortIo};
use crate::os_specific;

/// What the index of a select step refers to
///
/// Decides which error an undefined (0xFF) echo turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    /// GPIO or AD pin
    Pin(u8),
    /// Dynamic table item
    Item(u8),
}

impl Selected {
    fn undefined(self) -> EcError {
        match self {
            Selected::Pin(pin) => EcError::InvalidPin(pin),
            Selected::Item(item) => EcError::InvalidIndex(item),
        }
    }
}

/// Log level of a failed step. An undefined select also ends every short table.
fn failure_level(err: &EcError) -> Level {
    match err {
        EcError::InvalidPin(_) | EcError::InvalidIndex(_) => Level::Debug,
        _ => Level::Warn,
    }
}

/// One exchange of a command sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait for IBF clear, then write an opcode to the command port
    Command(u8),
    /// Wait for IBF clear, then write a byte to the data port
    Write(u8),
    /// Wait for OBF set, then read a byte from the data port
    Read,
    /// Like [`Step::Read`], but the byte is the echo of a select and 0xFF aborts
    Verify(Selected),
}

impl Step {
    pub const fn command(cmd: EcCommand) -> Self {
        Step::Command(cmd as u8)
    }
}

/// Exclusive access to the port pair for the duration of one command sequence
///
/// Created by [`super::ControllerHandle::lock`]. Dropping it releases the
/// lock, on success and on every error path alike.
pub struct Transaction<'a, P: PortIo> {
    ports: MutexGuard<'a, P>,
    timing: &'a EcTiming,
}

impl<'a, P: PortIo> Transaction<'a, P> {
    pub(crate) fn new(ports: MutexGuard<'a, P>, timing: &'a EcTiming) -> Self {
        Transaction { ports, timing }
    }

    pub fn timing(&self) -> &EcTiming {
        self.timing
    }

    fn status(&mut self) -> u8 {
        self.ports.inb(Port::Command)
    }

    pub(crate) fn delay(&self) {
        if !self.timing.poll_delay.is_zero() {
            os_specific::sleep(self.timing.poll_delay);
        }
    }

    /// Wait until the EC has consumed the last byte (IBF clear)
    pub fn wait_ibf(&mut self) -> EcResult<()> {
        for _ in 0..self.timing.max_retries {
            if self.status() & EC_STATUS_IBF == 0 {
                return Ok(());
            }
            self.delay();
        }
        Err(EcError::Timeout)
    }

    /// Wait until the EC has a byte for us (OBF set)
    pub fn wait_obf(&mut self) -> EcResult<()> {
        for _ in 0..self.timing.max_retries {
            if self.status() & EC_STATUS_OBF != 0 {
                return Ok(());
            }
            self.delay();
        }
        Err(EcError::Timeout)
    }

    pub fn send_command(&mut self, cmd: u8) -> EcResult<()> {
        self.wait_ibf()?;
        if log_enabled!(Level::Trace) {
            trace!(
                "  cmd  {:#04X} {:?}",
                cmd,
                <EcCommand as FromPrimitive>::from_u8(cmd)
            );
        }
        self.ports.outb(Port::Command, cmd);
        Ok(())
    }

    pub fn send_data(&mut self, byte: u8) -> EcResult<()> {
        self.wait_ibf()?;
        trace!("  out  {:#04X}", byte);
        self.ports.outb(Port::Data, byte);
        Ok(())
    }

    pub fn recv_data(&mut self) -> EcResult<u8> {
        self.wait_obf()?;
        let byte = self.ports.inb(Port::Data);
        trace!("  in   {:#04X}", byte);
        Ok(byte)
    }

    fn step(&mut self, step: Step, reads: &mut Vec<u8>) -> EcResult<()> {
        match step {
            Step::Command(cmd) => self.send_command(cmd),
            Step::Write(byte) => self.send_data(byte),
            Step::Read => {
                reads.push(self.recv_data()?);
                Ok(())
            }
            Step::Verify(selected) => {
                let echo = self.recv_data()?;
                Lookup::from_echo(echo).found_or(selected.undefined())?;
                Ok(())
            }
        }
    }

    /// Execute a command sequence and return the bytes of its [`Step::Read`]s in order
    ///
    /// Stops at the first failing step. Steps before it have taken effect on
    /// the EC, steps after it were never sent.
    pub fn run(&mut self, name: &str, steps: &[Step]) -> EcResult<Vec<u8>> {
        trace!("{}({:?})", name, steps);
        let mut reads = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if let Err(err) = self.step(*step, &mut reads) {
                log!(
                    failure_level(&err),
                    "{}: step {}/{} {:?} failed: {}",
                    name,
                    i + 1,
                    steps.len(),
                    step,
                    err
                );
                return Err(err);
            }
        }
        Ok(reads)
    }
}
