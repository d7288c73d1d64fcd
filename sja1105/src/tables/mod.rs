// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-driver mirror of every static-configuration table.
//!
//! The source presents these 25 tables as a `union` of named struct
//! fields aliased onto a flat array, so that `SJA1105_GET_TABLE(conf,
//! name)` and `tables[index]` reach the same memory. That aliasing
//! buys nothing in Rust: [`TableStore`] is just an indexed array plus
//! the name→index constants in `crate::regs`, and named access goes
//! through those constants (see `device.rs`).

pub mod general_parameters;
pub mod mac_configuration;
pub mod xmii_mode;

use crate::config::NUM_PORTS;
use crate::platform::Platform;
use crate::regs;
use crate::Error;

pub use regs::NUM_TABLES;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableLength {
    Fixed(usize),
    Variable,
}

/// Classifies a block id as fixed- or variable-length, and for fixed ids
/// gives the word count. Mirrors `SJA1105_TABLE_TYPE_LUT`.
pub fn length_of(id: u8) -> TableLength {
    match id {
        regs::BLOCK_ID_MAC_CONFIGURATION => {
            TableLength::Fixed(regs::MAC_CONF_ENTRY_WORDS * NUM_PORTS)
        }
        regs::BLOCK_ID_SCHEDULE_PARAMETERS => {
            TableLength::Fixed(regs::SCHEDULE_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_SCHEDULE_ENTRY_POINTS_PARAMETERS => {
            TableLength::Fixed(regs::SCHEDULE_ENTRY_POINTS_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_VL_FORWARDING_PARAMETERS => {
            TableLength::Fixed(regs::VL_FORWARDING_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_L2_LOOKUP_PARAMETERS => {
            TableLength::Fixed(regs::L2_LOOKUP_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_L2_FORWARDING_PARAMETERS => {
            TableLength::Fixed(regs::L2_FORWARDING_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_CLOCK_SYNC_PARAMETERS => {
            TableLength::Fixed(regs::CLOCK_SYNC_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_AVB_PARAMETERS => TableLength::Fixed(regs::AVB_PARAMETERS_WORDS),
        regs::BLOCK_ID_GENERAL_PARAMETERS => {
            TableLength::Fixed(regs::GENERAL_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_XMII_MODE_PARAMETERS => {
            TableLength::Fixed(regs::XMII_MODE_PARAMETERS_WORDS)
        }
        regs::BLOCK_ID_CGU => TableLength::Fixed(regs::CGU_WORDS),
        regs::BLOCK_ID_RGU => TableLength::Fixed(regs::RGU_WORDS),
        regs::BLOCK_ID_ACU => TableLength::Fixed(regs::ACU_WORDS),
        regs::BLOCK_ID_SGMII_CONFIGURATION => {
            TableLength::Fixed(regs::SGMII_CONFIGURATION_WORDS)
        }
        _ => TableLength::Variable,
    }
}

pub fn index_of(id: u8) -> Option<usize> {
    regs::TABLE_IDS_IN_INDEX_ORDER.iter().position(|&x| x == id)
}

/// Sum of every fixed-length table's word count, used to size the arena
/// the caller hands to [`TableStore::new`] (plus one word for the
/// device-id slot at `arena[0]`).
pub const fn fixed_arena_words() -> usize {
    regs::MAC_CONF_ENTRY_WORDS * NUM_PORTS
        + regs::SCHEDULE_PARAMETERS_WORDS
        + regs::SCHEDULE_ENTRY_POINTS_PARAMETERS_WORDS
        + regs::VL_FORWARDING_PARAMETERS_WORDS
        + regs::L2_LOOKUP_PARAMETERS_WORDS
        + regs::L2_FORWARDING_PARAMETERS_WORDS
        + regs::CLOCK_SYNC_PARAMETERS_WORDS
        + regs::AVB_PARAMETERS_WORDS
        + regs::GENERAL_PARAMETERS_WORDS
        + regs::XMII_MODE_PARAMETERS_WORDS
        + regs::CGU_WORDS
        + regs::RGU_WORDS
        + regs::ACU_WORDS
        + regs::SGMII_CONFIGURATION_WORDS
}

/// `arena[0]` holds the device-id word; the rest is the fixed-table
/// region.
pub const fn arena_words() -> usize {
    1 + fixed_arena_words()
}

enum Storage {
    Empty,
    Fixed { offset: usize },
    Variable { data: &'static mut [u32] },
}

/// One table slot: metadata the static-configuration engine needs
/// (spec.md §3) plus where its data words actually live.
pub struct Table {
    pub id: u8,
    pub size: u32,
    pub header_crc: u32,
    pub data_crc: u32,
    pub in_use: bool,
    pub data_crc_valid: bool,
    storage: Storage,
}

impl Table {
    const fn empty() -> Self {
        Self {
            id: 0,
            size: 0,
            header_crc: 0,
            data_crc: 0,
            in_use: false,
            data_crc_valid: false,
            storage: Storage::Empty,
        }
    }
}

/// Owns the arena and every table slot. Generic operations that need
/// the CRC or allocator capability take `&P` explicitly rather than
/// storing a `Platform` handle, so the store has no lifetime tied to a
/// particular capability set.
pub struct TableStore {
    arena: &'static mut [u32],
    first_free: usize,
    tables: [Table; NUM_TABLES],
    pub global_crc: u32,
    pub global_crc_valid: bool,
}

impl TableStore {
    /// `arena` must be at least [`arena_words`] words long.
    pub fn new(arena: &'static mut [u32]) -> Result<Self, Error> {
        if arena.len() < arena_words() {
            return Err(Error::Parameter);
        }
        arena[0] = 0;
        Ok(Self {
            arena,
            first_free: 1,
            tables: core::array::from_fn(|_| Table::empty()),
            global_crc: 0,
            global_crc_valid: false,
        })
    }

    pub fn device_id(&self) -> u32 {
        self.arena[0]
    }

    pub fn set_device_id(&mut self, id: u32) {
        self.arena[0] = id;
    }

    pub fn table(&self, index: usize) -> &Table {
        &self.tables[index]
    }

    pub fn data(&self, index: usize) -> &[u32] {
        let t = &self.tables[index];
        match &t.storage {
            Storage::Fixed { offset } => &self.arena[*offset..*offset + t.size as usize],
            Storage::Variable { data } => &data[..t.size as usize],
            Storage::Empty => &[],
        }
    }

    pub fn data_mut(&mut self, index: usize) -> &mut [u32] {
        let size = self.tables[index].size as usize;
        match &mut self.tables[index].storage {
            Storage::Fixed { offset } => &mut self.arena[*offset..*offset + size],
            Storage::Variable { data } => &mut data[..size],
            Storage::Empty => &mut [],
        }
    }

    /// Clears `data_crc_valid` for a table that the caller is about to
    /// edit, and with it `global_crc_valid` (spec.md §3: "editing any
    /// table's data clears data_crc_valid and global_crc_valid").
    pub fn mark_edited(&mut self, index: usize) {
        self.tables[index].data_crc_valid = false;
        self.global_crc_valid = false;
    }

    /// Allocates `id`'s fixed-length arena slot if it isn't already
    /// `in_use`. Used for [`regs::BLOCK_ID_CGU`] and [`regs::BLOCK_ID_ACU`],
    /// which this driver always maintains (spec.md §4.5's ACU/CGU
    /// back-fill) whether or not the loaded image supplies a block for
    /// them — unlike the other 23 tables, their presence doesn't depend
    /// on what the image author chose to include.
    pub fn ensure_fixed_allocated(&mut self, index: usize, id: u8, size: usize) -> Result<(), Error> {
        if self.tables[index].in_use {
            return Ok(());
        }
        self.allocate_fixed(index, id, size)
    }

    pub fn allocate_fixed(&mut self, index: usize, id: u8, size: usize) -> Result<(), Error> {
        if self.first_free + size > self.arena.len() {
            return Err(Error::StaticConf);
        }
        let offset = self.first_free;
        self.first_free += size;
        for w in &mut self.arena[offset..offset + size] {
            *w = 0;
        }
        self.tables[index] = Table {
            id,
            size: size as u32,
            header_crc: 0,
            data_crc: 0,
            in_use: true,
            data_crc_valid: false,
            storage: Storage::Fixed { offset },
        };
        Ok(())
    }

    pub fn allocate_variable<P: Platform>(
        &mut self,
        index: usize,
        id: u8,
        size: usize,
        platform: &P,
    ) -> Result<(), Error> {
        let buf = platform.alloc(size).map_err(|_| Error::DynMemory)?;
        for w in buf.iter_mut() {
            *w = 0;
        }
        self.tables[index] = Table {
            id,
            size: size as u32,
            header_crc: 0,
            data_crc: 0,
            in_use: true,
            data_crc_valid: false,
            storage: Storage::Variable { data: buf },
        };
        Ok(())
    }

    /// Releases every table (variable-length ones back to the
    /// allocator) and resets the arena cursor. Called on `load` (before
    /// parsing a new image) and on `deinit`.
    pub fn free_all<P: Platform>(&mut self, platform: &P) {
        for t in self.tables.iter_mut() {
            if let Storage::Variable { .. } = &t.storage {
                if let Storage::Variable { data } =
                    core::mem::replace(&mut t.storage, Storage::Empty)
                {
                    platform.free(data);
                }
            }
            *t = Table::empty();
        }
        self.first_free = 1;
        self.global_crc_valid = false;
        self.global_crc = 0;
    }

    /// Stores the header/data CRC words read straight off the wire
    /// during image load, before the zero-means-autofill check decides
    /// whether to recompute either of them.
    pub fn set_crcs(&mut self, index: usize, header_crc: u32, data_crc: u32) {
        let t = &mut self.tables[index];
        t.header_crc = header_crc;
        t.data_crc = data_crc;
        t.data_crc_valid = data_crc != 0;
    }

    /// The fixed-table region actually allocated so far (excludes the
    /// device-id slot at `arena[0]`), for the unsafe write mode's
    /// single bulk burst.
    pub fn fixed_words(&self) -> &[u32] {
        &self.arena[1..self.first_free]
    }

    pub fn recompute_header_crc<P: Platform>(&mut self, index: usize, platform: &P) -> u32 {
        let (id, size) = {
            let t = &self.tables[index];
            (t.id, t.size)
        };
        let header = [(id as u32) << regs::STATIC_CONF_BLOCK_ID_SHIFT, size];
        platform.crc_reset();
        let crc = platform.crc_accumulate(&header);
        self.tables[index].header_crc = crc;
        crc
    }

    pub fn recompute_data_crc<P: Platform>(&mut self, index: usize, platform: &P) -> u32 {
        platform.crc_reset();
        let crc = platform.crc_accumulate(self.data(index));
        self.tables[index].data_crc = crc;
        self.tables[index].data_crc_valid = true;
        crc
    }

    /// spec.md §3's required-table and dependency rules.
    pub fn check_required(&self) -> Result<(), Error> {
        let required = [
            regs::BLOCK_ID_L2_POLICING,
            regs::BLOCK_ID_L2_FORWARDING,
            regs::BLOCK_ID_L2_FORWARDING_PARAMETERS,
            regs::BLOCK_ID_MAC_CONFIGURATION,
            regs::BLOCK_ID_GENERAL_PARAMETERS,
            regs::BLOCK_ID_XMII_MODE_PARAMETERS,
        ];
        for id in required {
            let index = index_of(id).expect("id is one of the 25 known table ids");
            if !self.tables[index].in_use {
                return Err(Error::MissingTable(id));
            }
        }
        let l2_policing_index = index_of(regs::BLOCK_ID_L2_POLICING).unwrap();
        if self.tables[l2_policing_index].size == 0 {
            return Err(Error::MissingTable(regs::BLOCK_ID_L2_POLICING));
        }

        let schedule_index = index_of(regs::BLOCK_ID_SCHEDULE).unwrap();
        if self.tables[schedule_index].in_use {
            for dep in [
                regs::BLOCK_ID_SCHEDULE_PARAMETERS,
                regs::BLOCK_ID_SCHEDULE_ENTRY_POINTS_PARAMETERS,
            ] {
                let idx = index_of(dep).unwrap();
                if !self.tables[idx].in_use {
                    return Err(Error::MissingTable(dep));
                }
            }
        }
        let vl_forwarding_index = index_of(regs::BLOCK_ID_VL_FORWARDING).unwrap();
        if self.tables[vl_forwarding_index].in_use {
            let idx = index_of(regs::BLOCK_ID_VL_FORWARDING_PARAMETERS).unwrap();
            if !self.tables[idx].in_use {
                return Err(Error::MissingTable(regs::BLOCK_ID_VL_FORWARDING_PARAMETERS));
            }
        }
        Ok(())
    }
}
