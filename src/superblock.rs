/// Reference: https://www.nongnu.org/ext2-doc/ext2.html#superblock
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const EXT2_MAGIC: u16 = 0xEF53;

/// Byte offset of the superblock inside the image, independent of block size.
pub const EXT2_SUPERBLOCK_OFFSET: u64 = 1024;
pub const EXT2_SUPERBLOCK_SIZE: usize = 1024;

/// The filesystem root directory.
pub const EXT2_ROOT_INO: u32 = 2;

const EXT2_GOOD_OLD_REV: u32 = 0;
const EXT2_GOOD_OLD_INODE_SIZE: u16 = 128;
const EXT2_GOOD_OLD_FIRST_INO: u32 = 11;

// Largest block size ext2 defines is 64 KiB (1024 << 6).
const EXT2_MAX_LOG_BLOCK_SIZE: u32 = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Superblock {
    pub s_inodes_count: u32,
    pub s_blocks_count: u32,
    pub s_r_blocks_count: u32,
    pub s_free_blocks_count: u32,
    pub s_free_inodes_count: u32,
    pub s_first_data_block: u32,
    pub s_log_block_size: u32,
    pub s_blocks_per_group: u32,
    pub s_inodes_per_group: u32,
    pub s_mtime: u32,
    pub s_wtime: u32,
    pub s_mnt_count: u16,
    pub s_max_mnt_count: u16,
    pub s_magic: u16,
    pub s_state: u16,
    pub s_errors: u16,
    pub s_minor_rev_level: u16,
    pub s_lastcheck: u32,
    pub s_checkinterval: u32,
    pub s_creator_os: u32,
    pub s_rev_level: u32,
    pub s_def_resuid: u16,
    pub s_def_resgid: u16,
    pub s_first_ino: u32,
    pub s_inode_size: u16,
    pub s_feature_compat: u32,
    pub s_feature_incompat: u32,
    pub s_feature_ro_compat: u32,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
}

impl Superblock {
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() < EXT2_SUPERBLOCK_SIZE {
            return Err("Not enough bytes to parse superblock".to_string());
        }
        let le_u16 = |offset: usize| -> u16 {
            u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
        };
        let le_u32 = |offset: usize| -> u32 {
            u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
        };
        let s_magic = le_u16(0x38);
        if s_magic != EXT2_MAGIC {
            return Err("Invalid FileSystem".to_string());
        }

        // A valid magic does not make the geometry trustworthy. Every field
        // the offset arithmetic divides or shifts by gets checked here, so a
        // garbage superblock surfaces as an error instead of arithmetic
        // failures later on.
        let s_log_block_size = le_u32(0x18);
        if s_log_block_size > EXT2_MAX_LOG_BLOCK_SIZE {
            return Err(format!("Invalid block size exponent: {}", s_log_block_size));
        }
        let s_blocks_per_group = le_u32(0x20);
        if s_blocks_per_group == 0 {
            return Err("Invalid superblock: zero blocks per group".to_string());
        }
        let s_inodes_per_group = le_u32(0x28);
        if s_inodes_per_group == 0 {
            return Err("Invalid superblock: zero inodes per group".to_string());
        }
        let s_rev_level = le_u32(0x4C);
        let s_inode_size = le_u16(0x58);
        if s_rev_level != EXT2_GOOD_OLD_REV
            && s_inode_size != 0
            && s_inode_size < EXT2_GOOD_OLD_INODE_SIZE
        {
            return Err(format!("Invalid inode record size: {}", s_inode_size));
        }

        Ok(Self {
            s_inodes_count: le_u32(0x00),
            s_blocks_count: le_u32(0x04),
            s_r_blocks_count: le_u32(0x08),
            s_free_blocks_count: le_u32(0x0C),
            s_free_inodes_count: le_u32(0x10),
            s_first_data_block: le_u32(0x14),
            s_log_block_size,
            s_blocks_per_group,
            s_inodes_per_group,
            s_mtime: le_u32(0x2C),
            s_wtime: le_u32(0x30),
            s_mnt_count: le_u16(0x34),
            s_max_mnt_count: le_u16(0x36),
            s_magic,
            s_state: le_u16(0x3A),
            s_errors: le_u16(0x3C),
            s_minor_rev_level: le_u16(0x3E),
            s_lastcheck: le_u32(0x40),
            s_checkinterval: le_u32(0x44),
            s_creator_os: le_u32(0x48),
            s_rev_level,
            s_def_resuid: le_u16(0x50),
            s_def_resgid: le_u16(0x52),
            s_first_ino: le_u32(0x54),
            s_inode_size,
            s_feature_compat: le_u32(0x5C),
            s_feature_incompat: le_u32(0x60),
            s_feature_ro_compat: le_u32(0x64),
            s_uuid: data[0x68..0x78].try_into().unwrap(),
            s_volume_name: data[0x78..0x88].try_into().unwrap(),
        })
    }

    pub fn block_size(&self) -> u64 {
        1024 << self.s_log_block_size
    }

    pub fn blocks_count(&self) -> u64 {
        self.s_blocks_count as u64
    }

    pub fn inodes_count(&self) -> u32 {
        self.s_inodes_count
    }

    pub fn blocks_per_group(&self) -> u64 {
        self.s_blocks_per_group as u64
    }

    pub fn inodes_per_group(&self) -> u32 {
        self.s_inodes_per_group
    }

    /// Revision 0 images carry no inode-size field; the size is fixed at 128.
    pub fn inode_size(&self) -> usize {
        if self.s_rev_level == EXT2_GOOD_OLD_REV || self.s_inode_size == 0 {
            EXT2_GOOD_OLD_INODE_SIZE as usize
        } else {
            self.s_inode_size as usize
        }
    }

    /// First inode number not reserved by the filesystem itself.
    pub fn first_ino(&self) -> u32 {
        if self.s_rev_level == EXT2_GOOD_OLD_REV || self.s_first_ino == 0 {
            EXT2_GOOD_OLD_FIRST_INO
        } else {
            self.s_first_ino
        }
    }

    pub fn feature_incompat(&self) -> u32 {
        self.s_feature_incompat
    }

    /// Block holding the start of the group descriptor table: the block
    /// right after the superblock.
    pub fn bg_desc_block(&self) -> u64 {
        self.s_first_data_block as u64 + 1
    }

    pub fn group_count(&self) -> u64 {
        let bpg = self.blocks_per_group();
        (self.blocks_count() + bpg - 1) / bpg
    }

    pub fn print_sb_info(&self) {
        println!("{:#?}", self);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "inodes_count": self.s_inodes_count,
            "blocks_count": self.s_blocks_count,
            "free_blocks_count": self.s_free_blocks_count,
            "free_inodes_count": self.s_free_inodes_count,
            "first_data_block": self.s_first_data_block,
            "log_block_size": self.s_log_block_size,
            "blocks_per_group": self.s_blocks_per_group,
            "inodes_per_group": self.s_inodes_per_group,
            "inode_size": self.inode_size(),
            "first_ino": self.first_ino(),
            "magic": format!("0x{:04x}", self.s_magic),
            "rev_level": self.s_rev_level,
            "feature_compat": format!("0x{:08x}", self.s_feature_compat),
            "feature_incompat": format!("0x{:08x}", self.s_feature_incompat),
            "feature_ro_compat": format!("0x{:08x}", self.s_feature_ro_compat),
        })
    }
}
