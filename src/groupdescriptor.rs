use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// On-disk size of one ext2 block group descriptor.
pub const EXT2_GROUP_DESC_SIZE: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupDescriptor {
    // Block number of the block bitmap.
    pub bg_block_bitmap: u32,
    // Block number of the inode bitmap.
    pub bg_inode_bitmap: u32,
    // Starting block of this group's inode table.
    pub bg_inode_table: u32,
    pub bg_free_blocks_count: u16,
    pub bg_free_inodes_count: u16,
    pub bg_used_dirs_count: u16,
}

impl GroupDescriptor {
    /// Parses one descriptor from a raw byte slice of at least 32 bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        GroupDescriptor {
            bg_block_bitmap: LittleEndian::read_u32(&data[0x00..0x04]),
            bg_inode_bitmap: LittleEndian::read_u32(&data[0x04..0x08]),
            bg_inode_table: LittleEndian::read_u32(&data[0x08..0x0C]),
            bg_free_blocks_count: LittleEndian::read_u16(&data[0x0C..0x0E]),
            bg_free_inodes_count: LittleEndian::read_u16(&data[0x0E..0x10]),
            bg_used_dirs_count: LittleEndian::read_u16(&data[0x10..0x12]),
        }
    }

    pub fn bg_inode_table(&self) -> u64 {
        self.bg_inode_table as u64
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_descriptor() {
        let mut raw = [0u8; EXT2_GROUP_DESC_SIZE];
        raw[0x00..0x04].copy_from_slice(&3u32.to_le_bytes());
        raw[0x04..0x08].copy_from_slice(&4u32.to_le_bytes());
        raw[0x08..0x0C].copy_from_slice(&5u32.to_le_bytes());
        raw[0x0C..0x0E].copy_from_slice(&100u16.to_le_bytes());
        raw[0x0E..0x10].copy_from_slice(&50u16.to_le_bytes());
        raw[0x10..0x12].copy_from_slice(&7u16.to_le_bytes());

        let gd = GroupDescriptor::from_bytes(&raw);
        assert_eq!(gd.bg_block_bitmap, 3);
        assert_eq!(gd.bg_inode_bitmap, 4);
        assert_eq!(gd.bg_inode_table(), 5);
        assert_eq!(gd.bg_used_dirs_count, 7);
    }
}
