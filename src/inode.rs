/// Reference: https://www.nongnu.org/ext2-doc/ext2.html#inode-table
use byteorder::{ByteOrder, LittleEndian};
use chrono::{TimeZone, Utc};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Number of direct data-block pointers in an ext2 inode. Pointers 12..14
/// are the indirect levels, which this tool does not follow.
pub const EXT2_NUM_DIRECT_BLOCKS: usize = 12;

const S_IFMT: u16 = 0o170000;
const S_IFDIR: u16 = 0o040000;
const S_IFREG: u16 = 0o100000;

#[derive(Debug, Serialize, Deserialize)]
pub struct Inode {
    pub i_num: u32,
    pub i_mode: u16,
    pub i_uid: u16,
    pub i_size: u32,
    pub i_atime: u32,
    pub i_ctime: u32,
    pub i_mtime: u32,
    pub i_dtime: u32,
    pub i_atime_h: String,
    pub i_ctime_h: String,
    pub i_mtime_h: String,
    pub i_dtime_h: String,
    pub i_gid: u16,
    pub i_links_count: u16,
    pub i_blocks: u32,
    pub i_flags: u32,
    pub i_block: [u32; 15],
    pub i_generation: u32,
}

impl Inode {
    /// Parse the classic 128-byte ext2 inode record. `data` may be longer
    /// (some images carry larger inode slots); the extra bytes are ignored.
    pub fn from_bytes(i_num: u32, data: &[u8]) -> Self {
        let format_time = |seconds: u32| {
            Utc.timestamp_opt(seconds as i64, 0)
                .single()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default()
        };

        let i_atime = LittleEndian::read_u32(&data[0x08..0x0C]);
        let i_ctime = LittleEndian::read_u32(&data[0x0C..0x10]);
        let i_mtime = LittleEndian::read_u32(&data[0x10..0x14]);
        let i_dtime = LittleEndian::read_u32(&data[0x14..0x18]);

        let mut i_block = [0u32; 15];
        for (i, slot) in i_block.iter_mut().enumerate() {
            *slot = LittleEndian::read_u32(&data[0x28 + i * 4..0x28 + i * 4 + 4]);
        }

        Inode {
            i_num,
            i_mode: LittleEndian::read_u16(&data[0x00..0x02]),
            i_uid: LittleEndian::read_u16(&data[0x02..0x04]),
            i_size: LittleEndian::read_u32(&data[0x04..0x08]),
            i_atime,
            i_ctime,
            i_mtime,
            i_dtime,
            i_atime_h: format_time(i_atime),
            i_ctime_h: format_time(i_ctime),
            i_mtime_h: format_time(i_mtime),
            i_dtime_h: format_time(i_dtime),
            i_gid: LittleEndian::read_u16(&data[0x18..0x1A]),
            i_links_count: LittleEndian::read_u16(&data[0x1A..0x1C]),
            i_blocks: LittleEndian::read_u32(&data[0x1C..0x20]),
            i_flags: LittleEndian::read_u32(&data[0x20..0x24]),
            i_block,
            i_generation: LittleEndian::read_u32(&data[0x64..0x68]),
        }
    }

    pub fn size(&self) -> u64 {
        self.i_size as u64
    }

    /// Check if this inode is a directory (S_IFDIR).
    pub fn is_dir(&self) -> bool {
        (self.i_mode & S_IFMT) == S_IFDIR
    }

    /// Check if this inode is a regular file (S_IFREG).
    pub fn is_regular_file(&self) -> bool {
        (self.i_mode & S_IFMT) == S_IFREG
    }

    /// Non-zero deletion time marks an inode whose file was unlinked.
    pub fn is_deleted(&self) -> bool {
        self.i_dtime != 0
    }

    /// The direct data-block pointers. A zero pointer is a hole.
    pub fn direct_blocks(&self) -> &[u32] {
        &self.i_block[..EXT2_NUM_DIRECT_BLOCKS]
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// String representation of an Inode using prettytable.
    pub fn to_table(&self) -> String {
        let mut inode_table = Table::new();

        inode_table.add_row(Row::new(vec![
            Cell::new("Identifier"),
            Cell::new(&format!("{}", self.i_num)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Mode"),
            Cell::new(&format!("0o{:o}", self.i_mode)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Links Count"),
            Cell::new(&format!("{}", self.i_links_count)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Size"),
            Cell::new(&format!("{}", self.size())),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("UID"),
            Cell::new(&format!("{}", self.i_uid)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("GID"),
            Cell::new(&format!("{}", self.i_gid)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("atime (Access Time)"),
            Cell::new(&self.i_atime_h),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("ctime (Change Time)"),
            Cell::new(&self.i_ctime_h),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("mtime (Modification Time)"),
            Cell::new(&self.i_mtime_h),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("dtime (Deletion Time)"),
            Cell::new(&self.i_dtime_h),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Direct Blocks"),
            Cell::new(&format!("{:?}", self.direct_blocks())),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Flags"),
            Cell::new(&format!("0x{:x}", self.i_flags)),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Dir?"),
            Cell::new(&format!("{}", self.is_dir())),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Regular?"),
            Cell::new(&format!("{}", self.is_regular_file())),
        ]));
        inode_table.add_row(Row::new(vec![
            Cell::new("Deleted?"),
            Cell::new(&format!("{}", self.is_deleted())),
        ]));
        inode_table.to_string()
    }
}
