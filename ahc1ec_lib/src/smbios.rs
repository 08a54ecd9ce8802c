use std::io::ErrorKind;

use smbioslib::*;

const ADVANTECH: &str = "Advantech";

/// Board name from the SMBIOS System Information, on Advantech boards only
pub fn get_product_name() -> Option<String> {
    let (manufacturer, product) = system_information()?;
    advantech_product(&manufacturer, product)
}

fn advantech_product(manufacturer: &str, product: String) -> Option<String> {
    if !manufacturer.starts_with(ADVANTECH) {
        debug!("Not an Advantech board, manufacturer is {}", manufacturer);
        return None;
    }
    Some(product)
}

/// Manufacturer and product name of the first System Information structure
fn system_information() -> Option<(String, String)> {
    let smbios = get_smbios()?;

    for undefined_struct in smbios.iter() {
        if let DefinedStruct::SystemInformation(data) = undefined_struct.defined_struct() {
            let manufacturer = dmidecode_string_val(&data.manufacturer())?;
            let product = dmidecode_string_val(&data.product_name())?;
            return Some((manufacturer, product));
        }
    }

    None
}

pub fn dmidecode_string_val(s: &SMBiosString) -> Option<String> {
    match s.as_ref() {
        Ok(val) if val.is_empty() => Some("Not Specified".to_owned()),
        Ok(val) => Some(val.to_owned()),
        Err(SMBiosStringError::FieldOutOfBounds) => None,
        Err(SMBiosStringError::InvalidStringNumber(_)) => Some("<BAD INDEX>".to_owned()),
        Err(SMBiosStringError::Utf8(val)) => {
            Some(String::from_utf8_lossy(&val.clone().into_bytes()).to_string())
        }
    }
}

// On Linux this reads either from /dev/mem or sysfs
pub fn get_smbios() -> Option<SMBiosData> {
    match smbioslib::table_load_from_device() {
        Ok(data) => Some(data),
        Err(ref e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!("Must be root to get SMBIOS data.");
            None
        }
        Err(err) => {
            warn!("Failed to get SMBIOS: {:?}", err);
            None
        }
    }
}
