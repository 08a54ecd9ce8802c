//! Finding the Advantech board name in BIOS memory
//!
//! Boards with a UEFI BIOS publish it in SMBIOS (see [`crate::smbios`]), older
//! BIOS versions have it somewhere in the legacy BIOS area at 0xF0000.

use alloc::string::String;

/// Physical address of the legacy BIOS area that is scanned
pub const BIOS_AREA_ADDRESS: u32 = 0x000F_0000;
/// Size of the legacy BIOS area
pub const BIOS_AREA_LENGTH: usize = 0xFFFF;

/// Board name prefixes of Advantech product lines
const PRODUCT_PREFIXES: &[&[u8]] = &[b"TPC", b"UNO", b"ITA", b"MIO", b"ECU", b"APAX"];
const MAX_NAME_LENGTH: usize = 31;

const SMBIOS_ANCHOR: &[u8] = b"_SM_";
const DMI_ANCHOR: &[u8] = b"_DMI_";
const DMI_ANCHOR_OFFSET: usize = 0x10;
const TABLE_LENGTH_OFFSET: usize = 0x16;
const TABLE_ADDRESS_OFFSET: usize = 0x18;

/// SMBIOS 2.x entry point found in the BIOS area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmiEntryPoint {
    /// Offset of the `_SM_` anchor in the scanned blob
    pub offset: usize,
    /// Physical address of the structure table
    pub table_address: u32,
    pub table_length: u16,
}

/// Look for the SMBIOS 2.x entry point (`_SM_` with `_DMI_` 16 bytes later)
pub fn find_dmi_entry_point(blob: &[u8]) -> Option<DmiEntryPoint> {
    let end = TABLE_ADDRESS_OFFSET + 4;
    (0..blob.len().saturating_sub(end - 1)).find_map(|offset| {
        let eps = &blob[offset..offset + end];
        if !eps.starts_with(SMBIOS_ANCHOR) || !eps[DMI_ANCHOR_OFFSET..].starts_with(DMI_ANCHOR) {
            return None;
        }
        let length = [eps[TABLE_LENGTH_OFFSET], eps[TABLE_LENGTH_OFFSET + 1]];
        let address = [
            eps[TABLE_ADDRESS_OFFSET],
            eps[TABLE_ADDRESS_OFFSET + 1],
            eps[TABLE_ADDRESS_OFFSET + 2],
            eps[TABLE_ADDRESS_OFFSET + 3],
        ];
        Some(DmiEntryPoint {
            offset,
            table_address: u32::from_le_bytes(address),
            table_length: u16::from_le_bytes(length),
        })
    })
}

/// Scan a legacy BIOS image for the board name
///
/// The name starts with one of the known product line prefixes and ends
/// before the first space (or NUL), at most 31 characters.
pub fn scan_bios_product_name(blob: &[u8]) -> Option<String> {
    let start = (0..blob.len()).find(|i| {
        PRODUCT_PREFIXES
            .iter()
            .any(|prefix| blob[*i..].starts_with(prefix))
    })?;

    let name: &[u8] = &blob[start..];
    let len = name
        .iter()
        .take(MAX_NAME_LENGTH)
        .position(|c| *c == b' ' || *c == 0)
        .unwrap_or_else(|| name.len().min(MAX_NAME_LENGTH));
    let name = String::from_utf8_lossy(&name[..len]).into_owned();
    debug!("BIOS Product Name = {} at {:#X}", name, start);
    Some(name)
}

/// Get string `index` (1-based) of the structure whose string set starts at `strings`
fn smbios_string(strings: &[u8], index: u8) -> Option<&[u8]> {
    if index == 0 {
        return None;
    }
    strings
        .split(|c| *c == 0)
        .take_while(|s| !s.is_empty())
        .nth(usize::from(index) - 1)
}

/// Product name from a raw SMBIOS structure table, if made by Advantech
///
/// Walks the structures to System Information (type 1) and checks its
/// manufacturer string.
pub fn scan_dmi_product_name(table: &[u8]) -> Option<String> {
    const SYSTEM_INFORMATION: u8 = 1;
    const END_OF_TABLE: u8 = 127;

    let mut offset = 0;
    while offset + 4 <= table.len() {
        let kind = table[offset];
        let len = usize::from(table[offset + 1]);
        if len < 4 || offset + len > table.len() {
            return None;
        }
        let formatted = &table[offset..offset + len];
        let strings = &table[offset + len..];
        // String set ends with two NULs
        let strings_len = strings.windows(2).position(|w| w == [0, 0])? + 2;

        if kind == SYSTEM_INFORMATION && len > 5 {
            let manufacturer = smbios_string(strings, formatted[4])?;
            if !manufacturer.starts_with(b"Advantech") {
                debug!(
                    "Manufacturer is {}",
                    String::from_utf8_lossy(manufacturer)
                );
                return None;
            }
            let product = smbios_string(strings, formatted[5])?;
            return Some(String::from_utf8_lossy(product).into_owned());
        }
        if kind == END_OF_TABLE {
            return None;
        }
        offset += len + strings_len;
    }
    None
}
