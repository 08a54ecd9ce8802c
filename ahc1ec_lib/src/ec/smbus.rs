//! SMBus pass-through via the EC's HW RAM cells
//!
//! A transfer is set up by writing channel, slave address, register and
//! (for writes) data into HW RAM, then arming the EC's SMBus engine by
//! writing the protocol code. Afterwards the protocol cell is polled until the
//! engine is idle and the status cell is checked.
//!
//! The whole sequence runs under one lock, so no other transaction can get
//! between arming the engine and reading back its status.

use super::protocol::*;
use super::{ControllerHandle, EcError, EcResult, PortIo, Transaction};

/// Target of a pass-through transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmbusRequest {
    /// SMBus channel of the EC
    pub channel: u8,
    /// Slave address as expected by the EC, e.g. 0x98
    pub address: u8,
    /// Register (command byte) on the slave
    pub register: u8,
}

impl SmbusRequest {
    pub fn new(channel: u8, address: u8, register: u8) -> Self {
        SmbusRequest {
            channel,
            address,
            register,
        }
    }
}

fn check_payload(protocol: SmbusProtocol, payload: Option<u16>) -> EcResult<()> {
    match payload {
        Some(_) if protocol.is_read() => Err(EcError::InvalidArgument(
            "SMBus read doesn't take a payload",
        )),
        None if !protocol.is_read() => {
            Err(EcError::InvalidArgument("SMBus write needs a payload"))
        }
        Some(data) if !protocol.is_word() && data > 0xFF => Err(EcError::InvalidArgument(
            "SMBus byte write payload must fit in a byte",
        )),
        _ => Ok(()),
    }
}

impl<'a, P: PortIo> Transaction<'a, P> {
    fn smbus_arm(
        &mut self,
        request: &SmbusRequest,
        protocol: SmbusProtocol,
        payload: Option<u16>,
    ) -> EcResult<()> {
        self.write_ram(EC_SMBUS_CHANNEL, request.channel)?;
        self.write_ram(EC_SMBUS_SLV_ADDR, request.address)?;
        self.write_ram(EC_SMBUS_CMD, request.register)?;
        match (protocol, payload) {
            (SmbusProtocol::ByteWrite, Some(data)) => {
                self.write_ram(EC_SMBUS_DATA, data as u8)?;
            }
            (SmbusProtocol::WordWrite, Some(data)) => {
                let [msb, lsb] = data.to_be_bytes();
                self.write_ram(ec_smbus_dat_offset(0), msb)?;
                self.write_ram(ec_smbus_dat_offset(1), lsb)?;
            }
            _ => {}
        }
        self.write_ram(EC_SMBUS_PROTOCOL, protocol as u8)
    }

    /// Poll the protocol cell until the engine went back to idle (0)
    fn smbus_wait_finish(&mut self) -> EcResult<()> {
        for _ in 0..self.timing().smbus_retries {
            if self.read_ram(EC_SMBUS_PROTOCOL)? == 0 {
                return Ok(());
            }
            self.delay();
        }
        Err(EcError::Timeout)
    }

    fn smbus_check_status(&mut self) -> EcResult<()> {
        let status = self.read_ram(EC_SMBUS_STATUS)?;
        if status != SMBUS_STATUS_DONE {
            return Err(EcError::SmbusError(status));
        }
        Ok(())
    }

    fn smbus_fetch(&mut self, protocol: SmbusProtocol) -> EcResult<Option<u16>> {
        match protocol {
            SmbusProtocol::ByteRead => Ok(Some(u16::from(self.read_ram(EC_SMBUS_DATA)?))),
            SmbusProtocol::WordRead => {
                let msb = self.read_ram(ec_smbus_dat_offset(0))?;
                let lsb = self.read_ram(ec_smbus_dat_offset(1))?;
                Ok(Some(u16::from_be_bytes([msb, lsb])))
            }
            SmbusProtocol::ByteWrite | SmbusProtocol::WordWrite => Ok(None),
        }
    }

    /// Run a complete pass-through transfer while holding the lock
    pub fn smbus_transfer(
        &mut self,
        request: &SmbusRequest,
        protocol: SmbusProtocol,
        payload: Option<u16>,
    ) -> EcResult<Option<u16>> {
        check_payload(protocol, payload)?;
        self.smbus_arm(request, protocol, payload)?;
        self.smbus_wait_finish()?;
        self.smbus_check_status()?;
        self.smbus_fetch(protocol)
    }
}

impl<P: PortIo> ControllerHandle<P> {
    /// Generic pass-through transfer
    ///
    /// Reads return `Some(value)`, writes return `None`. A payload that doesn't
    /// fit the protocol is rejected before any port is touched.
    pub fn smbus_transfer(
        &self,
        request: &SmbusRequest,
        protocol: SmbusProtocol,
        payload: Option<u16>,
    ) -> EcResult<Option<u16>> {
        let res = self.lock().smbus_transfer(request, protocol, payload);
        if let Err(err) = &res {
            error!(
                "SMBus {:?} on channel {} addr {:#04X} reg {:#04X} failed: {}",
                protocol, request.channel, request.address, request.register, err
            );
        }
        res
    }

    pub fn smbus_read_byte(&self, request: &SmbusRequest) -> EcResult<u8> {
        let data = self.smbus_transfer(request, SmbusProtocol::ByteRead, None)?;
        Ok(data.unwrap_or_default() as u8)
    }

    pub fn smbus_write_byte(&self, request: &SmbusRequest, data: u8) -> EcResult<()> {
        self.smbus_transfer(request, SmbusProtocol::ByteWrite, Some(u16::from(data)))?;
        Ok(())
    }

    /// Read a word, MSB from the first data cell, LSB from the second
    pub fn smbus_read_word(&self, request: &SmbusRequest) -> EcResult<u16> {
        let data = self.smbus_transfer(request, SmbusProtocol::WordRead, None)?;
        Ok(data.unwrap_or_default())
    }

    pub fn smbus_write_word(&self, request: &SmbusRequest, data: u16) -> EcResult<()> {
        self.smbus_transfer(request, SmbusProtocol::WordWrite, Some(data))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::sim::{Op, SimulatedEc};
    use crate::ec::Port;

    fn ec(sim: SimulatedEc) -> ControllerHandle<SimulatedEc> {
        ControllerHandle::with_timing(sim, SimulatedEc::fast_timing())
    }

    /// HW RAM cells written by a recorded op log, in order
    fn ram_writes(ops: &[Op]) -> Vec<(u8, u8)> {
        ops.windows(3)
            .filter_map(|w| match w {
                [Op::Out(Port::Command, 0x89), Op::Out(Port::Data, addr), Op::Out(Port::Data, data)] => {
                    Some((*addr, *data))
                }
                _ => None,
            })
            .collect()
    }

    /// HW RAM cells read by a recorded op log, in order
    fn ram_reads(ops: &[Op]) -> Vec<u8> {
        ops.windows(3)
            .filter_map(|w| match w {
                [Op::Out(Port::Command, 0x88), Op::Out(Port::Data, addr), Op::In(Port::Data, _)] => {
                    Some(*addr)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn read_byte() {
        let mut sim = SimulatedEc::new();
        sim.smbus.insert((2, 0x98, 0x05), 0x7A);
        let ec = ec(sim);

        assert_eq!(ec.smbus_read_byte(&SmbusRequest::new(2, 0x98, 0x05)), Ok(0x7A));

        let ops = ec.into_ports().ops();
        assert_eq!(
            ram_writes(&ops),
            vec![
                (EC_SMBUS_CHANNEL, 2),
                (EC_SMBUS_SLV_ADDR, 0x98),
                (EC_SMBUS_CMD, 0x05),
                (EC_SMBUS_PROTOCOL, SmbusProtocol::ByteRead as u8),
            ]
        );
        assert_eq!(
            ram_reads(&ops),
            vec![EC_SMBUS_PROTOCOL, EC_SMBUS_STATUS, EC_SMBUS_DATA]
        );
    }

    #[test]
    fn bad_status_reads_no_data() {
        let mut sim = SimulatedEc::new();
        sim.smbus.insert((2, 0x98, 0x05), 0x7A);
        sim.smbus_status = Some(0x10);
        let ec = ec(sim);

        assert_eq!(
            ec.smbus_read_byte(&SmbusRequest::new(2, 0x98, 0x05)),
            Err(EcError::SmbusError(0x10))
        );
        let ops = ec.into_ports().ops();
        assert_eq!(ram_reads(&ops), vec![EC_SMBUS_PROTOCOL, EC_SMBUS_STATUS]);
    }

    #[test]
    fn read_word_is_big_endian() {
        let mut sim = SimulatedEc::new();
        sim.smbus.insert((1, 0x80, 0x02), 0x0134);
        let ec = ec(sim);

        assert_eq!(
            ec.smbus_read_word(&SmbusRequest::new(1, 0x80, 0x02)),
            Ok(0x0134)
        );
        let ops = ec.into_ports().ops();
        assert_eq!(
            ram_reads(&ops),
            vec![
                EC_SMBUS_PROTOCOL,
                EC_SMBUS_STATUS,
                ec_smbus_dat_offset(0),
                ec_smbus_dat_offset(1)
            ]
        );
    }

    #[test]
    fn write_byte_sets_data_before_arming() {
        let ec = ec(SimulatedEc::new());
        ec.smbus_write_byte(&SmbusRequest::new(3, 0x40, 0x09), 0xC3)
            .unwrap();

        let sim = ec.into_ports();
        assert_eq!(sim.smbus.get(&(3, 0x40, 0x09)), Some(&0xC3));
        let ops = sim.ops();
        assert_eq!(
            ram_writes(&ops),
            vec![
                (EC_SMBUS_CHANNEL, 3),
                (EC_SMBUS_SLV_ADDR, 0x40),
                (EC_SMBUS_CMD, 0x09),
                (EC_SMBUS_DATA, 0xC3),
                (EC_SMBUS_PROTOCOL, SmbusProtocol::ByteWrite as u8),
            ]
        );
        // Nothing is read after the status check
        assert_eq!(ram_reads(&ops), vec![EC_SMBUS_PROTOCOL, EC_SMBUS_STATUS]);
    }

    #[test]
    fn write_word_round_trip() {
        let ec = ec(SimulatedEc::new());
        let req = SmbusRequest::new(0, 0x90, 0x01);
        ec.smbus_write_word(&req, 0xBEEF).unwrap();
        assert_eq!(ec.smbus_read_word(&req), Ok(0xBEEF));
    }

    #[test]
    fn engine_that_never_finishes_times_out() {
        let mut sim = SimulatedEc::new();
        sim.smbus_hang = true;
        let ec = ec(sim);

        assert_eq!(
            ec.smbus_read_byte(&SmbusRequest::new(2, 0x98, 0x05)),
            Err(EcError::Timeout)
        );
        let ops = ec.into_ports().ops();
        let polls = ram_reads(&ops);
        assert_eq!(polls.len(), SimulatedEc::fast_timing().smbus_retries as usize);
        assert!(polls.iter().all(|addr| *addr == EC_SMBUS_PROTOCOL));
    }

    #[test]
    fn failing_setup_step_aborts_transfer() {
        let mut sim = SimulatedEc::new();
        // Channel and slave address go through, the register write hangs
        sim.ibf_stuck_after = Some(7);
        let ec = ec(sim);

        assert_eq!(
            ec.smbus_read_byte(&SmbusRequest::new(2, 0x98, 0x05)),
            Err(EcError::Timeout)
        );
        let sim = ec.into_ports();
        let ops = sim.ops();
        assert_eq!(
            ram_writes(&ops),
            vec![(EC_SMBUS_CHANNEL, 2), (EC_SMBUS_SLV_ADDR, 0x98)]
        );
        assert!(ram_reads(&ops).is_empty());
        assert_eq!(sim.ram[EC_SMBUS_PROTOCOL as usize], 0);
    }

    #[test]
    fn payload_must_match_protocol() {
        let ec = ec(SimulatedEc::new());
        let req = SmbusRequest::new(0, 0x90, 0x01);

        assert!(matches!(
            ec.smbus_transfer(&req, SmbusProtocol::ByteWrite, None),
            Err(EcError::InvalidArgument(_))
        ));
        assert!(matches!(
            ec.smbus_transfer(&req, SmbusProtocol::ByteWrite, Some(0x100)),
            Err(EcError::InvalidArgument(_))
        ));
        assert!(matches!(
            ec.smbus_transfer(&req, SmbusProtocol::WordRead, Some(1)),
            Err(EcError::InvalidArgument(_))
        ));
        assert!(ec.into_ports().ops().is_empty());
    }
}
