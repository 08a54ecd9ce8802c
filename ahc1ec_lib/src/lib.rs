//! A library to interact with the Advantech AHC1EC0 embedded controller and building tools to do so.

extern crate alloc;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[cfg(all(feature = "std", any(feature = "linux_pio", feature = "raw_pio")))]
pub mod commandline;
pub mod config;
pub mod device;
pub mod ec;
mod os_specific;
pub mod product;
#[cfg(feature = "smbios")]
pub mod smbios;
mod util;
