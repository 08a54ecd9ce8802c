//! Port I/O backend for the real controller
//!
//! On Linux userspace has to request access to the two ports from the kernel
//! first. With `raw_pio` the caller is expected to already run with I/O
//! privileges (ring 0, firmware environment).

use alloc::string::ToString;

use hwio::{Io, Pio};
#[cfg(all(target_os = "linux", feature = "linux_pio"))]
use libc::ioperm;
#[cfg(all(target_os = "linux", feature = "linux_pio"))]
use nix::unistd::Uid;
use spin::Mutex;

use super::protocol::{EC_COMMAND_PORT, EC_STATUS_PORT};
use super::{EcError, EcResult, Port, PortIo};

lazy_static! {
    /// Whether a [`HwPorts`] currently exists. There's only one EC
    static ref ATTACHED: Mutex<bool> = Mutex::new(false);
}

/// The EC port pair at 0x29A/0x299
///
/// At most one instance exists at a time, dropping it allows attaching again.
#[derive(Debug)]
pub struct HwPorts {
    _private: (),
}

impl HwPorts {
    pub fn attach() -> EcResult<Self> {
        let mut attached = ATTACHED.lock();
        if *attached {
            return Err(EcError::DeviceError(
                "EC ports are already attached".to_string(),
            ));
        }

        request_access()?;

        *attached = true;
        debug!(
            "Attached EC ports cmd={:#X} data={:#X}",
            EC_COMMAND_PORT, EC_STATUS_PORT
        );
        Ok(HwPorts { _private: () })
    }
}

impl Drop for HwPorts {
    fn drop(&mut self) {
        // Port permissions stay with the process, only the claim is released
        *ATTACHED.lock() = false;
    }
}

#[cfg(all(target_os = "linux", feature = "linux_pio"))]
fn request_access() -> EcResult<()> {
    if !Uid::effective().is_root() {
        error!("Must be root to use port based I/O for EC communication.");
        return Err(EcError::DeviceError(
            "Must be root to use port based I/O".to_string(),
        ));
    }

    // The two ports are adjacent, data port first
    let res = unsafe { ioperm(EC_STATUS_PORT as u64, 2, 1) };
    if res != 0 {
        error!("ioperm failed. portio driver is likely block by Linux kernel lockdown mode");
        return Err(EcError::DeviceError("ioperm failed".to_string()));
    }
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "linux_pio")))]
fn request_access() -> EcResult<()> {
    Ok(())
}

impl PortIo for HwPorts {
    fn inb(&mut self, port: Port) -> u8 {
        Pio::<u8>::new(port.address()).read()
    }

    fn outb(&mut self, port: Port, value: u8) {
        Pio::<u8>::new(port.address()).write(value)
    }
}
