//! Simulated AHC1EC0 firmware for tests
//!
//! Models the command state machine behind the two ports closely enough to
//! run every protocol against it, records what went over the data port and
//! can be told to misbehave.

use std::collections::BTreeMap;
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::protocol::*;
use super::{DynamicEntry, EcTiming, Port, PortIo};

/// One byte that went over the ports. Status polls are not recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Out(Port, u8),
    In(Port, u8),
}

pub struct SimulatedEc {
    pub ram: [u8; 256],
    pub extended_ram: [u8; 256],
    pub acpi_ram: [u8; 256],
    pub onekey: [u8; 256],
    pub oem: [u8; 256],

    /// Raw 16-bit AD value per defined pin
    pub ad: BTreeMap<u8, u16>,
    /// GPIO level per defined pin
    pub gpio_status: BTreeMap<u8, u8>,
    /// GPIO direction per defined pin
    pub gpio_dir: BTreeMap<u8, u8>,
    /// Registers of SMBus slaves, keyed by (channel, address, register)
    pub smbus: BTreeMap<(u8, u8, u8), u16>,
    /// Defined items of the dynamic table, the rest is undefined
    pub table: Vec<DynamicEntry>,

    /// Report this SMBus status instead of the real outcome
    pub smbus_status: Option<u8>,
    /// SMBus engine never goes back to idle
    pub smbus_hang: bool,
    /// IBF never clears
    pub stuck_ibf: bool,
    /// OBF never gets set
    pub stuck_obf: bool,
    /// IBF never clears once this many bytes were written
    pub ibf_stuck_after: Option<usize>,

    /// One key recovery functions that were addressed, in order
    pub onekey_functions: Vec<u8>,
    pub status_polls: usize,

    log: Vec<(ThreadId, Op)>,
    outs: usize,
    command: Option<u8>,
    args: Vec<u8>,
    output: Option<u8>,
    gpio_pin: u8,
    ad_pin: u8,
    item: u8,
}

impl SimulatedEc {
    pub fn new() -> Self {
        SimulatedEc {
            ram: [0; 256],
            extended_ram: [0; 256],
            acpi_ram: [0; 256],
            onekey: [0; 256],
            oem: [0; 256],
            ad: BTreeMap::new(),
            gpio_status: BTreeMap::new(),
            gpio_dir: BTreeMap::new(),
            smbus: BTreeMap::new(),
            table: Vec::new(),
            smbus_status: None,
            smbus_hang: false,
            stuck_ibf: false,
            stuck_obf: false,
            ibf_stuck_after: None,
            onekey_functions: Vec::new(),
            status_polls: 0,
            log: Vec::new(),
            outs: 0,
            command: None,
            args: Vec::new(),
            output: None,
            gpio_pin: EC_UNDEFINED,
            ad_pin: EC_UNDEFINED,
            item: EC_UNDEFINED,
        }
    }

    /// Small budgets and no sleeping, so timeouts are quick
    pub fn fast_timing() -> EcTiming {
        EcTiming {
            max_retries: 20,
            poll_delay: Duration::ZERO,
            smbus_retries: 10,
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.log.iter().map(|(_, op)| *op).collect()
    }

    /// Like [`SimulatedEc::ops`], with the thread that caused each op
    pub fn ops_by_thread(&self) -> &[(ThreadId, Op)] {
        &self.log
    }

    fn record(&mut self, op: Op) {
        self.log.push((thread::current().id(), op));
    }

    fn ibf(&self) -> bool {
        self.stuck_ibf || self.ibf_stuck_after.is_some_and(|n| self.outs >= n)
    }

    fn status(&self) -> u8 {
        let mut status = 0;
        if self.ibf() {
            status |= EC_STATUS_IBF;
        }
        if self.output.is_some() && !self.stuck_obf {
            status |= EC_STATUS_OBF;
        }
        status
    }

    fn echo(defined: bool, index: u8) -> u8 {
        if defined {
            index
        } else {
            EC_UNDEFINED
        }
    }

    fn table_entry(&self) -> DynamicEntry {
        self.table
            .get(usize::from(self.item))
            .copied()
            .unwrap_or(DynamicEntry::UNDEFINED)
    }

    fn ad_value(&self) -> u16 {
        self.ad.get(&self.ad_pin).copied().unwrap_or(0xFFFF)
    }

    fn on_command(&mut self, cmd: u8) {
        self.command = Some(cmd);
        self.args.clear();
        self.output = match cmd {
            0x11 => self.gpio_status.get(&self.gpio_pin).copied(),
            0x1D => self.gpio_dir.get(&self.gpio_pin).copied(),
            0x16 => Some(self.ad_value().to_le_bytes()[0]),
            0x1F => Some(self.ad_value().to_le_bytes()[1]),
            0x21 => Some(self.table_entry().pin),
            0x22 => Some(self.table_entry().device_id),
            _ => None,
        };
    }

    fn on_data(&mut self, byte: u8) {
        let Some(cmd) = self.command else {
            return;
        };
        self.args.push(byte);
        let args = self.args.clone();
        match (cmd, args.as_slice()) {
            (0x10, [pin]) => {
                let pin = *pin;
                self.gpio_pin = pin;
                let defined =
                    self.gpio_status.contains_key(&pin) || self.gpio_dir.contains_key(&pin);
                self.output = Some(Self::echo(defined, pin));
            }
            (0x12, [level]) => {
                self.gpio_status.insert(self.gpio_pin, *level);
            }
            (0x1E, [dir]) => {
                self.gpio_dir.insert(self.gpio_pin, *dir);
            }
            (0x15, [pin]) => {
                let pin = *pin;
                self.ad_pin = pin;
                self.output = Some(Self::echo(self.ad.contains_key(&pin), pin));
            }
            (0x20, [item]) => {
                let item = *item;
                self.item = item;
                self.output = Some(Self::echo(usize::from(item) < self.table.len(), item));
            }
            (0x80, [addr]) => self.output = Some(self.acpi_ram[usize::from(*addr)]),
            (0x81, [addr, data]) => self.acpi_ram[usize::from(*addr)] = *data,
            (0x86, [addr]) => self.output = Some(self.extended_ram[usize::from(*addr)]),
            (0x87, [addr, data]) => self.extended_ram[usize::from(*addr)] = *data,
            (0x88, [addr]) => self.output = Some(self.ram[usize::from(*addr)]),
            (0x89, [addr, data]) => {
                let (addr, data) = (*addr, *data);
                self.ram[usize::from(addr)] = data;
                if addr == EC_SMBUS_PROTOCOL && data != 0 && !self.smbus_hang {
                    self.run_smbus(data);
                }
            }
            (0x9C, [addr]) => {
                let addr = *addr;
                self.onekey_functions.push(addr);
                self.output = Some(self.onekey[usize::from(addr)]);
            }
            (0xEA, [0x00, addr]) => self.output = Some(self.oem[usize::from(*addr)]),
            (0xEA, [0x01, addr, data]) => self.oem[usize::from(*addr)] = *data,
            _ => {}
        }
    }

    fn run_smbus(&mut self, protocol: u8) {
        let key = (
            self.ram[usize::from(EC_SMBUS_CHANNEL)],
            self.ram[usize::from(EC_SMBUS_SLV_ADDR)],
            self.ram[usize::from(EC_SMBUS_CMD)],
        );
        let data = usize::from(EC_SMBUS_DATA);
        let mut status = SMBUS_STATUS_DONE;
        match protocol {
            0x06 => {
                self.smbus.insert(key, u16::from(self.ram[data]));
            }
            0x07 => match self.smbus.get(&key) {
                Some(value) => self.ram[data] = *value as u8,
                None => status = 0x10,
            },
            0x08 => {
                let word = u16::from_be_bytes([self.ram[data], self.ram[data + 1]]);
                self.smbus.insert(key, word);
            }
            0x09 => match self.smbus.get(&key) {
                Some(value) => {
                    let [msb, lsb] = value.to_be_bytes();
                    self.ram[data] = msb;
                    self.ram[data + 1] = lsb;
                }
                None => status = 0x10,
            },
            _ => status = 0x19,
        }
        self.ram[usize::from(EC_SMBUS_STATUS)] = self.smbus_status.unwrap_or(status);
        self.ram[usize::from(EC_SMBUS_PROTOCOL)] = 0;
    }
}

impl PortIo for SimulatedEc {
    fn inb(&mut self, port: Port) -> u8 {
        match port {
            Port::Command => {
                self.status_polls += 1;
                self.status()
            }
            Port::Data => {
                let byte = self.output.take().unwrap_or(EC_UNDEFINED);
                self.record(Op::In(Port::Data, byte));
                byte
            }
        }
    }

    fn outb(&mut self, port: Port, value: u8) {
        self.record(Op::Out(port, value));
        self.outs += 1;
        match port {
            Port::Command => self.on_command(value),
            Port::Data => self.on_data(value),
        }
    }
}
