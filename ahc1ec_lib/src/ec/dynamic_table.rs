//! Dynamic control table
//!
//! The EC firmware keeps a table describing which HW pin is wired to which
//! logical device on this board. It can only be read item by item.

use alloc::vec;
use alloc::vec::Vec;

use super::protocol::{EcCommand, EC_MAX_TBL_NUM, EC_UNDEFINED};
use super::transaction::{Selected, Step};
use super::{ControllerHandle, EcError, EcResult, Lookup, PortIo, Transaction};

/// One item of the dynamic control table. 0xFF in either field means undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    pub device_id: u8,
    pub pin: u8,
}

impl DynamicEntry {
    pub const UNDEFINED: DynamicEntry = DynamicEntry {
        device_id: EC_UNDEFINED,
        pin: EC_UNDEFINED,
    };

    pub fn is_defined(&self) -> bool {
        self.device_id != EC_UNDEFINED && self.pin != EC_UNDEFINED
    }
}

impl Default for DynamicEntry {
    fn default() -> Self {
        DynamicEntry::UNDEFINED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicTable {
    entries: Vec<DynamicEntry>,
}

impl Default for DynamicTable {
    fn default() -> Self {
        DynamicTable::with_capacity(EC_MAX_TBL_NUM)
    }
}

impl DynamicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `capacity` items, all undefined
    pub fn with_capacity(capacity: u8) -> Self {
        DynamicTable {
            entries: vec![DynamicEntry::UNDEFINED; capacity.into()],
        }
    }

    pub fn capacity(&self) -> u8 {
        self.entries.len() as u8
    }

    pub fn get(&self, index: u8) -> Option<DynamicEntry> {
        self.entries.get(usize::from(index)).copied()
    }

    pub fn entries(&self) -> &[DynamicEntry] {
        &self.entries
    }

    /// Defined items together with their item number
    pub fn iter_defined(&self) -> impl Iterator<Item = (u8, DynamicEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_defined())
            .map(|(i, entry)| (i as u8, *entry))
    }

    /// HW pin the EC assigned to a device
    pub fn pin_of(&self, device_id: u8) -> Option<u8> {
        self.iter_defined()
            .find(|(_, entry)| entry.device_id == device_id)
            .map(|(_, entry)| entry.pin)
    }

    fn reset(&mut self) {
        self.entries.fill(DynamicEntry::UNDEFINED);
    }
}

impl<'a, P: PortIo> Transaction<'a, P> {
    fn read_table_item(&mut self, item: u8) -> EcResult<DynamicEntry> {
        let data = self.run(
            "read_table_item",
            &[
                Step::command(EcCommand::TblWriteItem),
                Step::Write(item),
                Step::Verify(Selected::Item(item)),
                Step::command(EcCommand::TblGetPin),
                Step::Read,
            ],
        )?;
        let pin = Lookup::from_echo(data[0]).found_or(EcError::InvalidIndex(item))?;

        let data = self.run(
            "read_table_item",
            &[Step::command(EcCommand::TblGetDevId), Step::Read],
        )?;
        Ok(DynamicEntry {
            device_id: data[0],
            pin,
        })
    }
}

impl<P: PortIo> ControllerHandle<P> {
    /// Read the dynamic control table from the EC into `table`
    ///
    /// All entries are reset to undefined first. Enumeration stops at the
    /// first undefined item with [`EcError::InvalidIndex`], or at the first
    /// timeout. Items read before that stay in the table. Returns the
    /// number of items if the whole table was defined.
    pub fn enumerate_dynamic_table(&self, table: &mut DynamicTable) -> EcResult<u8> {
        table.reset();

        let mut ec = self.lock();
        for item in 0..table.capacity() {
            table.entries[usize::from(item)] = ec.read_table_item(item)?;
            trace!("  Table item {}: {:?}", item, table.entries[usize::from(item)]);
        }
        Ok(table.capacity())
    }
}
