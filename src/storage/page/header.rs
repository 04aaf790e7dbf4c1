//! Page header format.
//!
//! Every page starts with a 32-byte header. The storage I/O layer never
//! interprets it; the heap page codec reads and writes it, and the heap file
//! uses the node-type tag to recognise its own pages when rebuilding the
//! free-space directory.

/// Size of the page header in bytes.
pub const PAGE_HEADER_SIZE: usize = 32;

/// Page layout version. Reserved; always written as 0.
pub const PAGE_VERSION: u32 = 0;

const LSN_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 8;
const PAGE_TYPE_OFFSET: usize = 12;
const SLOT_COUNT_OFFSET: usize = 16;
const LIVE_COUNT_OFFSET: usize = 18;
const FREE_SPACE_START_OFFSET: usize = 20;

/// Node-type tag stored in byte 12 of the header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized or free page.
    Free = 0x00,
    /// Interior node of an index tree.
    IndexInternal = 0x01,
    /// Leaf node of an index tree.
    IndexLeaf = 0x02,
    /// Slotted heap page.
    Heap = 0x03,
}

impl PageType {
    /// Creates a PageType from a raw u8 value.
    ///
    /// Returns `None` if the value doesn't match any known page type.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(PageType::Free),
            0x01 => Some(PageType::IndexInternal),
            0x02 => Some(PageType::IndexLeaf),
            0x03 => Some(PageType::Heap),
            _ => None,
        }
    }
}

/// Page header stored at the beginning of each page.
///
/// Layout (32 bytes total, little endian):
/// - `lsn`: u64 at 0..8 (reserved, not interpreted)
/// - `version`: u32 at 8..12 (reserved)
/// - `page_type`: u8 at 12
/// - bytes 13..16 reserved
/// - `slot_count`: u16 at 16..18
/// - `live_count`: u16 at 18..20
/// - `free_space_start`: u16 at 20..22, bytes consumed by record data
/// - bytes 22..32 reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Log sequence number. Carried but never used for recovery.
    pub lsn: u64,
    /// Layout version.
    pub version: u32,
    /// Raw node-type tag.
    pub page_type: u8,
    /// Number of slots in the slot table, tombstones included.
    pub slot_count: u16,
    /// Number of live (non-tombstoned) slots.
    pub live_count: u16,
    /// Bytes consumed by the record data region, measured from the page end.
    pub free_space_start: u16,
}

impl PageHeader {
    /// Creates a header for an empty heap page.
    pub fn new_heap_page() -> Self {
        Self {
            lsn: 0,
            version: PAGE_VERSION,
            page_type: PageType::Heap as u8,
            slot_count: 0,
            live_count: 0,
            free_space_start: 0,
        }
    }

    /// Returns the decoded node type, if the tag is known.
    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_u8(self.page_type)
    }

    /// Returns true if the tag marks a heap page.
    pub fn is_heap_page(&self) -> bool {
        self.page_type == PageType::Heap as u8
    }

    /// Reads a header from the first `PAGE_HEADER_SIZE` bytes of a page.
    pub fn read_from(data: &[u8]) -> Self {
        Self {
            lsn: read_u64(data, LSN_OFFSET),
            version: u32::from_le_bytes([
                data[VERSION_OFFSET],
                data[VERSION_OFFSET + 1],
                data[VERSION_OFFSET + 2],
                data[VERSION_OFFSET + 3],
            ]),
            page_type: data[PAGE_TYPE_OFFSET],
            slot_count: read_u16(data, SLOT_COUNT_OFFSET),
            live_count: read_u16(data, LIVE_COUNT_OFFSET),
            free_space_start: read_u16(data, FREE_SPACE_START_OFFSET),
        }
    }

    /// Writes the header to the first `PAGE_HEADER_SIZE` bytes of a page.
    ///
    /// Reserved bytes are left untouched.
    pub fn write_to(&self, data: &mut [u8]) {
        data[LSN_OFFSET..LSN_OFFSET + 8].copy_from_slice(&self.lsn.to_le_bytes());
        data[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&self.version.to_le_bytes());
        data[PAGE_TYPE_OFFSET] = self.page_type;
        write_u16(data, SLOT_COUNT_OFFSET, self.slot_count);
        write_u16(data, LIVE_COUNT_OFFSET, self.live_count);
        write_u16(data, FREE_SPACE_START_OFFSET, self.free_space_start);
    }
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
