//! The EC as a whole: controller, its dynamic table and the sub-devices on the board

use alloc::string::String;
use alloc::vec::Vec;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::config::PlatformConfig;
use crate::ec::{ControllerHandle, DynamicTable, EcError, PortIo};
use crate::product;

/// Functions built on top of the EC, each handled by its own driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum SubDevice {
    Brightness = 0,
    Eeprom = 1,
    Gpio = 2,
    Hwmon = 3,
    Led = 4,
    Watchdog = 5,
}

impl SubDevice {
    pub const ALL: [SubDevice; 6] = [
        SubDevice::Brightness,
        SubDevice::Eeprom,
        SubDevice::Gpio,
        SubDevice::Hwmon,
        SubDevice::Led,
        SubDevice::Watchdog,
    ];

    /// Name of the driver that binds to this sub-device
    pub fn name(self) -> &'static str {
        match self {
            SubDevice::Brightness => "adv-ec-brightness",
            SubDevice::Eeprom => "adv-ec-eeprom",
            SubDevice::Gpio => "adv-ec-gpio",
            SubDevice::Hwmon => "adv-ec-hwmon",
            SubDevice::Led => "adv-ec-led",
            SubDevice::Watchdog => "adv-ec-wdt",
        }
    }
}

/// Set of sub-devices, bit N is [`SubDevice`] N
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubDeviceMask(u8);

impl SubDeviceMask {
    /// Build the mask from configured sub-device IDs, skipping unknown ones
    pub fn from_ids(ids: &[u32]) -> Self {
        let mut mask = SubDeviceMask::default();
        for id in ids {
            match SubDevice::from_u32(*id) {
                Some(sub_device) => mask.insert(sub_device),
                None => error!("Invalid sub-device ID {}", id),
            }
        }
        mask
    }

    pub fn insert(&mut self, sub_device: SubDevice) {
        self.0 |= 1 << (sub_device as u8);
    }

    pub fn contains(&self, sub_device: SubDevice) -> bool {
        self.0 & (1 << (sub_device as u8)) != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = SubDevice> + '_ {
        SubDevice::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

/// Find out which board this is
///
/// SMBIOS first, then the legacy BIOS area if the caller has a dump of it.
/// Only used for diagnostics, so not finding it is not an error.
pub fn discover_product_name(bios: Option<&[u8]>) -> Option<String> {
    #[cfg(feature = "smbios")]
    if let Some(name) = crate::smbios::get_product_name() {
        return Some(name);
    }

    product_name_from_bios(bios?)
}

fn product_name_from_bios(bios: &[u8]) -> Option<String> {
    if let Some(eps) = product::find_dmi_entry_point(bios) {
        debug!(
            "SMBIOS entry point at {:#X}, table at {:#X} ({} bytes)",
            eps.offset, eps.table_address, eps.table_length
        );
    }
    let name = product::scan_bios_product_name(bios);
    if name.is_none() {
        warn!("Can't find the product name");
    }
    name
}

/// An attached EC with everything that was found out about it at attach time
pub struct AdvEc<P: PortIo> {
    ec: ControllerHandle<P>,
    table: DynamicTable,
    sub_devices: SubDeviceMask,
    product_name: Option<String>,
}

impl<P: PortIo> AdvEc<P> {
    /// Read the dynamic table and work out the sub-devices of the board
    ///
    /// A dynamic table that couldn't be read completely doesn't stop the
    /// attach. The entries that were read are kept.
    pub fn attach(
        ec: ControllerHandle<P>,
        platform: &PlatformConfig,
        product_name: Option<String>,
    ) -> Self {
        if let Some(name) = &product_name {
            info!("Product Name: {}", name);
        }

        let mut table = DynamicTable::with_capacity(platform.table_capacity());
        match ec.enumerate_dynamic_table(&mut table) {
            Ok(n) => debug!("Dynamic table has {} items", n),
            Err(EcError::InvalidIndex(n)) => debug!("Dynamic table ends after {} items", n),
            Err(err) => warn!("Failed to read dynamic table: {}", err),
        }

        let sub_devices = SubDeviceMask::from_ids(&platform.sub_devices);
        info!("Sub-device mask: {:#X}", sub_devices.bits());

        AdvEc {
            ec,
            table,
            sub_devices,
            product_name,
        }
    }

    pub fn ec(&self) -> &ControllerHandle<P> {
        &self.ec
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    pub fn sub_devices(&self) -> SubDeviceMask {
        self.sub_devices
    }

    /// Driver names of the enabled sub-devices
    pub fn sub_device_names(&self) -> Vec<&'static str> {
        self.sub_devices.iter().map(SubDevice::name).collect()
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn detach(self) -> ControllerHandle<P> {
        self.ec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::sim::SimulatedEc;
    use crate::ec::DynamicEntry;

    fn platform(sub_devices: &[u32]) -> PlatformConfig {
        PlatformConfig {
            sub_devices: sub_devices.to_vec(),
            table_capacity: Some(8),
        }
    }

    #[test]
    fn mask_from_ids() {
        let mask = SubDeviceMask::from_ids(&[0, 2, 3, 5]);
        assert_eq!(mask.bits(), 0b10_1101);
        assert!(mask.contains(SubDevice::Gpio));
        assert!(!mask.contains(SubDevice::Led));
        assert_eq!(
            mask.iter().collect::<Vec<_>>(),
            vec![
                SubDevice::Brightness,
                SubDevice::Gpio,
                SubDevice::Hwmon,
                SubDevice::Watchdog
            ]
        );
    }

    #[test]
    fn mask_skips_unknown_ids() {
        let mask = SubDeviceMask::from_ids(&[4, 6, 100, 1]);
        assert_eq!(mask.bits(), 0b1_0010);
    }

    #[test]
    fn attach_reads_table_and_sub_devices() {
        let mut sim = SimulatedEc::new();
        sim.table = vec![
            DynamicEntry {
                device_id: 0x10,
                pin: 0x40,
            },
            DynamicEntry {
                device_id: 0x22,
                pin: 0x07,
            },
        ];
        let ec = ControllerHandle::with_timing(sim, SimulatedEc::fast_timing());

        let dev = AdvEc::attach(ec, &platform(&[2, 5]), Some("UNO-2484G".to_string()));
        assert_eq!(dev.product_name(), Some("UNO-2484G"));
        assert_eq!(dev.table().capacity(), 8);
        assert_eq!(dev.table().pin_of(0x22), Some(0x07));
        assert_eq!(dev.table().iter_defined().count(), 2);
        assert_eq!(dev.sub_device_names(), vec!["adv-ec-gpio", "adv-ec-wdt"]);
    }

    #[test]
    fn attach_survives_dead_ec() {
        let mut sim = SimulatedEc::new();
        sim.stuck_ibf = true;
        let ec = ControllerHandle::with_timing(sim, SimulatedEc::fast_timing());

        let dev = AdvEc::attach(ec, &platform(&[0]), None);
        assert_eq!(dev.table().iter_defined().count(), 0);
        assert_eq!(dev.sub_devices().bits(), 0b1);

        // The controller is still usable (and still dead) afterwards
        let ec = dev.detach();
        assert_eq!(ec.read_ram(0), Err(EcError::Timeout));
    }

    #[test]
    fn bios_blob_product_name() {
        let mut bios = vec![0u8; 0x200];
        bios[0x100..0x10A].copy_from_slice(b"ECU-1251 \0");
        assert_eq!(product_name_from_bios(&bios).as_deref(), Some("ECU-1251"));
        assert_eq!(product_name_from_bios(&[0u8; 0x40]), None);
    }
}
