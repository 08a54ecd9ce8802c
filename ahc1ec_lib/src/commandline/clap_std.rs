//! Parse the commandline with clap, for the regular OS commandline tool
use clap::error::ErrorKind;
use clap::Parser;
use clap::{command, Args, Command, FromArgMatches};
use clap_num::maybe_hex;

use crate::commandline::{Cli, LogLevel};
use crate::ec::SmbusRequest;

/// Inspect and drive the Advantech AHC1EC0 embedded controller
#[derive(Parser)]
#[command(arg_required_else_help = true)]
struct ClapCli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity,

    /// Show product name, dynamic table and sub-devices
    #[arg(long)]
    info: bool,

    /// Read and print the dynamic control table
    #[arg(long)]
    table: bool,

    /// Read a byte of EC HW RAM
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    ram_read: Option<u8>,

    /// Write a byte of EC HW RAM
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["ADDR", "VALUE"])]
    ram_write: Vec<u8>,

    /// Read a byte of EC extended HW RAM
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    ext_ram_read: Option<u8>,

    /// Write a byte of EC extended HW RAM
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["ADDR", "VALUE"])]
    ext_ram_write: Vec<u8>,

    /// Dump all 256 bytes of EC HW RAM
    #[arg(long)]
    ram_dump: bool,

    /// Read a byte of the ACPI shadow RAM
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    acpi_read: Option<u8>,

    /// Write a byte of the ACPI shadow RAM
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["ADDR", "VALUE"])]
    acpi_write: Vec<u8>,

    /// Read an AD channel, scaled by MULTIPLIER * 100
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["PIN", "MULTIPLIER"])]
    ad: Vec<u8>,

    /// Read the level of a GPIO pin
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "PIN")]
    gpio: Option<u8>,

    /// Set the level of a GPIO pin
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["PIN", "LEVEL"])]
    gpio_set: Vec<u8>,

    /// Read the direction of a GPIO pin
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "PIN")]
    gpio_dir: Option<u8>,

    /// Set the direction of a GPIO pin
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["PIN", "DIR"])]
    gpio_dir_set: Vec<u8>,

    /// Read a byte from an SMBus device behind the EC
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 3, value_names = ["CHANNEL", "ADDR", "REG"])]
    smbus_read_byte: Vec<u8>,

    /// Write a byte to an SMBus device behind the EC
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 4, value_names = ["CHANNEL", "ADDR", "REG", "VALUE"])]
    smbus_write_byte: Vec<u8>,

    /// Read a word from an SMBus device behind the EC
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 3, value_names = ["CHANNEL", "ADDR", "REG"])]
    smbus_read_word: Vec<u8>,

    /// Write a word to an SMBus device behind the EC
    #[arg(long, value_parser=maybe_hex::<u16>, num_args = 4, value_names = ["CHANNEL", "ADDR", "REG", "VALUE"])]
    smbus_write_word: Vec<u16>,

    /// Read the status of a one key recovery function
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    onekey_read: Option<u8>,

    /// Trigger a one key recovery function
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    onekey_write: Option<u8>,

    /// Read an OEM status byte
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "ADDR")]
    oem_get: Option<u8>,

    /// Write an OEM status byte
    #[arg(long, value_parser=maybe_hex::<u8>, num_args = 2, value_names = ["ADDR", "VALUE"])]
    oem_set: Vec<u8>,

    /// Send a bare opcode to the EC command port (for debugging only)
    #[arg(long, value_parser=maybe_hex::<u8>, value_name = "OPCODE")]
    raw_command: Option<u8>,

    /// Find the product name in a dump of the BIOS area or SMBIOS table
    #[arg(long)]
    bios_bin: Option<std::path::PathBuf>,

    /// Config file to use instead of ahc1ec_config.toml
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn pair(args: &[u8]) -> Option<(u8, u8)> {
    match args {
        [a, b] => Some((*a, *b)),
        // Other lengths are rejected by clap
        _ => None,
    }
}

fn smbus_request(args: &[u8]) -> Option<SmbusRequest> {
    match args {
        [channel, address, register, ..] => Some(SmbusRequest::new(*channel, *address, *register)),
        _ => None,
    }
}

/// Parse a list of commandline arguments and return the struct
pub fn parse(args: &[String]) -> Cli {
    let cli = command!()
        .arg_required_else_help(true)
        .disable_version_flag(true);
    let mut cli: Command = ClapCli::augment_args(cli);

    let matches = cli.clone().get_matches_from(args);
    let args = ClapCli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let smbus_write_word = match args.smbus_write_word.as_slice() {
        [channel, address, register, value] => {
            let request: Vec<u8> = [channel, address, register]
                .iter()
                .filter_map(|x| u8::try_from(**x).ok())
                .collect();
            if request.len() != 3 {
                cli.error(
                    ErrorKind::InvalidValue,
                    "CHANNEL, ADDR and REG of --smbus-write-word must fit in a byte",
                )
                .exit();
            }
            smbus_request(&request).map(|req| (req, *value))
        }
        _ => None,
    };

    Cli {
        verbosity: LogLevel(args.verbosity.log_level_filter()),
        info: args.info,
        table: args.table,
        ram_read: args.ram_read,
        ram_write: pair(&args.ram_write),
        ext_ram_read: args.ext_ram_read,
        ext_ram_write: pair(&args.ext_ram_write),
        ram_dump: args.ram_dump,
        acpi_read: args.acpi_read,
        acpi_write: pair(&args.acpi_write),
        ad: pair(&args.ad),
        gpio: args.gpio,
        gpio_set: pair(&args.gpio_set),
        gpio_dir: args.gpio_dir,
        gpio_dir_set: pair(&args.gpio_dir_set),
        smbus_read_byte: smbus_request(&args.smbus_read_byte),
        smbus_write_byte: smbus_request(&args.smbus_write_byte)
            .zip(args.smbus_write_byte.get(3).copied()),
        smbus_read_word: smbus_request(&args.smbus_read_word),
        smbus_write_word,
        onekey_read: args.onekey_read,
        onekey_write: args.onekey_write,
        oem_get: args.oem_get,
        oem_set: pair(&args.oem_set),
        raw_command: args.raw_command,
        bios_bin: args
            .bios_bin
            .map(|x| x.to_string_lossy().into_owned()),
        config: args
            .config
            .map(|x| x.to_string_lossy().into_owned()),
        // Clap handles help by itself
        help: false,
    }
}
