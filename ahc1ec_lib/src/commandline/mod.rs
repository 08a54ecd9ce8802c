//! Module to factor out commandline interaction
//! This way the tool only has to collect the arguments and report the exit code.

pub mod clap_std;

use std::fs;

use crate::config::{self, Config};
use crate::device::{self, AdvEc};
use crate::ec::portio::HwPorts;
use crate::ec::{ControllerHandle, DynamicTable, EcResult, GpioRegister, SmbusRequest};
use crate::product;
use crate::util;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLevel(log::LevelFilter);

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel(log::LevelFilter::Error)
    }
}

/// Parsed commandline, independent of the argument parser
#[derive(Debug, Default)]
pub struct Cli {
    pub verbosity: LogLevel,
    pub info: bool,
    pub table: bool,
    pub ram_read: Option<u8>,
    pub ram_write: Option<(u8, u8)>,
    pub ext_ram_read: Option<u8>,
    pub ext_ram_write: Option<(u8, u8)>,
    pub ram_dump: bool,
    pub acpi_read: Option<u8>,
    pub acpi_write: Option<(u8, u8)>,
    /// Pin and multiplier
    pub ad: Option<(u8, u8)>,
    pub gpio: Option<u8>,
    pub gpio_set: Option<(u8, u8)>,
    pub gpio_dir: Option<u8>,
    pub gpio_dir_set: Option<(u8, u8)>,
    pub smbus_read_byte: Option<SmbusRequest>,
    pub smbus_write_byte: Option<(SmbusRequest, u8)>,
    pub smbus_read_word: Option<SmbusRequest>,
    pub smbus_write_word: Option<(SmbusRequest, u16)>,
    pub onekey_read: Option<u8>,
    pub onekey_write: Option<u8>,
    pub oem_get: Option<u8>,
    pub oem_set: Option<(u8, u8)>,
    pub raw_command: Option<u8>,
    pub bios_bin: Option<String>,
    pub config: Option<String>,
    pub help: bool,
}

impl Cli {
    /// Whether any of the commands needs to talk to the EC
    fn needs_ec(&self) -> bool {
        self.info
            || self.table
            || self.ram_read.is_some()
            || self.ram_write.is_some()
            || self.ext_ram_read.is_some()
            || self.ext_ram_write.is_some()
            || self.ram_dump
            || self.acpi_read.is_some()
            || self.acpi_write.is_some()
            || self.ad.is_some()
            || self.gpio.is_some()
            || self.gpio_set.is_some()
            || self.gpio_dir.is_some()
            || self.gpio_dir_set.is_some()
            || self.smbus_read_byte.is_some()
            || self.smbus_write_byte.is_some()
            || self.smbus_read_word.is_some()
            || self.smbus_write_word.is_some()
            || self.onekey_read.is_some()
            || self.onekey_write.is_some()
            || self.oem_get.is_some()
            || self.oem_set.is_some()
            || self.raw_command.is_some()
    }
}

pub fn parse(args: &[String]) -> Cli {
    clap_std::parse(args)
}

/// Print the result of an EC operation, return whether it succeeded
fn report<T>(res: EcResult<T>, print: impl FnOnce(T)) -> bool {
    match res {
        Ok(val) => {
            print(val);
            true
        }
        Err(err) => {
            println!("Failed: {}", err);
            false
        }
    }
}

fn print_table(table: &DynamicTable) {
    println!("Dynamic Table ({} items)", table.capacity());
    let mut empty = true;
    for (item, entry) in table.iter_defined() {
        empty = false;
        println!(
            "  Item {:>2}: Device ID {:#04X}  Pin {:#04X}",
            item, entry.device_id, entry.pin
        );
    }
    if empty {
        println!("  No items defined");
    }
}

fn print_info<P: crate::ec::PortIo>(dev: &AdvEc<P>) {
    println!("Advantech EC");
    println!(
        "  Product Name:   {}",
        dev.product_name().unwrap_or("Unknown")
    );
    println!("  Sub-devices:    {:#04X}", dev.sub_devices().bits());
    for name in dev.sub_device_names() {
        println!("    {}", name);
    }
    print_table(dev.table());
}

fn analyze_bios_bin(data: &[u8]) {
    println!("File");
    println!("  Size:       {:>20} B", data.len());
    println!("  Size:       {:>20} KB", data.len() / 1024);

    if let Some(eps) = product::find_dmi_entry_point(data) {
        println!("SMBIOS Entry Point");
        println!("  Offset:         {:#X}", eps.offset);
        println!("  Table Address:  {:#X}", eps.table_address);
        println!("  Table Length:   {:#X}", eps.table_length);
    }
    let name = product::scan_dmi_product_name(data)
        .or_else(|| product::scan_bios_product_name(data));
    match name {
        Some(name) => println!("Product Name: {}", name),
        None => println!("Product Name not found"),
    }
}

fn read_ram_dump(ec: &ControllerHandle<HwPorts>) -> EcResult<Vec<u8>> {
    (0..=0xFF).map(|addr| ec.read_ram(addr)).collect()
}

pub fn run_with_args(args: &Cli) -> i32 {
    {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(args.verbosity.0);
        builder.format_target(false);
        builder.format_timestamp(None);
        // Fails if a logger is already set, e.g. when called twice
        let _ = builder.try_init();
    }

    if args.help {
        // Clap has already printed the help by itself
        return 2;
    }

    if let Some(bios_bin_path) = &args.bios_bin {
        match fs::read(bios_bin_path) {
            Ok(data) => analyze_bios_bin(&data),
            Err(e) => {
                println!("Error {:?}", e);
                return 1;
            }
        }
    }

    if !args.needs_ec() {
        return 0;
    }

    let config: Config = match config::load_config(args.config.as_deref().map(std::path::Path::new)) {
        Ok(config) => config,
        Err(err) => {
            println!("{}", err);
            return 1;
        }
    };
    let ports = match HwPorts::attach() {
        Ok(ports) => ports,
        Err(err) => {
            println!("Failed to attach to EC: {}", err);
            return 1;
        }
    };
    let ec = ControllerHandle::with_timing(ports, config.timing.ec_timing());

    if run_ec_commands(args, &config, ec) {
        0
    } else {
        1
    }
}

fn run_ec_commands(args: &Cli, config: &Config, ec: ControllerHandle<HwPorts>) -> bool {
    if args.info {
        let bios = args.bios_bin.as_ref().and_then(|path| fs::read(path).ok());
        let name = device::discover_product_name(bios.as_deref());
        let dev = AdvEc::attach(ec, &config.platform, name);
        print_info(&dev);
        true
    } else if args.table {
        let mut table = DynamicTable::with_capacity(config.platform.table_capacity());
        if let Err(err) = ec.enumerate_dynamic_table(&mut table) {
            // Items up to the first undefined one are still valid
            debug!("Enumeration stopped: {}", err);
        }
        print_table(&table);
        true
    } else if let Some(addr) = args.ram_read {
        report(ec.read_ram(addr), |val| {
            println!("RAM[{:#04X}] = {:#04X}", addr, val)
        })
    } else if let Some((addr, val)) = args.ram_write {
        report(ec.write_ram(addr, val), |_| {})
    } else if let Some(addr) = args.ext_ram_read {
        report(ec.read_extended_ram(addr), |val| {
            println!("Extended RAM[{:#04X}] = {:#04X}", addr, val)
        })
    } else if let Some((addr, val)) = args.ext_ram_write {
        report(ec.write_extended_ram(addr, val), |_| {})
    } else if args.ram_dump {
        report(read_ram_dump(&ec), |dump| {
            util::print_multiline_buffer(&dump, 0)
        })
    } else if let Some(addr) = args.acpi_read {
        report(ec.read_acpi_value(addr), |val| {
            println!("ACPI[{:#04X}] = {:#04X}", addr, val)
        })
    } else if let Some((addr, val)) = args.acpi_write {
        report(ec.write_acpi_value(addr, val), |_| {})
    } else if let Some((pin, multiplier)) = args.ad {
        report(ec.read_ad_value(pin, multiplier), |val| {
            println!("AD pin {:#04X}: {}", pin, val)
        })
    } else if let Some(pin) = args.gpio {
        report(ec.read_gpio(pin, GpioRegister::Status), |val| {
            println!("GPIO {:#04X} level: {}", pin, val)
        })
    } else if let Some((pin, level)) = args.gpio_set {
        report(ec.write_gpio(pin, GpioRegister::Status, level), |_| {})
    } else if let Some(pin) = args.gpio_dir {
        report(ec.read_gpio(pin, GpioRegister::Direction), |val| {
            println!("GPIO {:#04X} direction: {}", pin, val)
        })
    } else if let Some((pin, dir)) = args.gpio_dir_set {
        report(ec.write_gpio(pin, GpioRegister::Direction, dir), |_| {})
    } else if let Some(req) = &args.smbus_read_byte {
        report(ec.smbus_read_byte(req), |val| println!("{:#04X}", val))
    } else if let Some((req, val)) = &args.smbus_write_byte {
        report(ec.smbus_write_byte(req, *val), |_| {})
    } else if let Some(req) = &args.smbus_read_word {
        report(ec.smbus_read_word(req), |val| println!("{:#06X}", val))
    } else if let Some((req, val)) = &args.smbus_write_word {
        report(ec.smbus_write_word(req, *val), |_| {})
    } else if let Some(addr) = args.onekey_read {
        report(ec.read_onekey_status(addr), |val| {
            println!("One Key [{:#04X}] = {:#04X}", addr, val)
        })
    } else if let Some(addr) = args.onekey_write {
        report(ec.write_onekey_status(addr), |_| {})
    } else if let Some(addr) = args.oem_get {
        report(ec.oem_get_status(addr), |val| {
            println!("OEM [{:#04X}] = {:#04X}", addr, val)
        })
    } else if let Some((addr, val)) = args.oem_set {
        report(ec.oem_set_status(addr, val), |_| {})
    } else if let Some(cmd) = args.raw_command {
        report(ec.write_raw_command(cmd), |_| {})
    } else {
        true
    }
}
