use std::error::Error;
use std::io::{Read, Seek, SeekFrom};

pub mod direntry;
pub mod ghost;
pub mod groupdescriptor;
pub mod hierarchy;
pub mod inode;
pub mod resolve;
pub mod scanner;
pub mod superblock;
pub mod timeline;

use groupdescriptor::{GroupDescriptor, EXT2_GROUP_DESC_SIZE};
use inode::Inode;
use log::debug;
use superblock::{Superblock, EXT2_SUPERBLOCK_OFFSET, EXT2_SUPERBLOCK_SIZE};

pub use superblock::EXT2_ROOT_INO;

/// An ext2 filesystem image opened read-only: the decoded superblock, the
/// group descriptor table loaded once at startup, and the raw byte source.
/// All address arithmetic for inodes and blocks derives from here.
pub struct Ext2Image<T: Read + Seek> {
    pub superblock: Superblock,
    descriptors: Vec<GroupDescriptor>,
    body: T,
}

impl<T: Read + Seek> Ext2Image<T> {
    /// Read the superblock and the group descriptor table from any type
    /// that implements `Read` and `Seek`.
    pub fn new(mut body: T) -> Result<Self, Box<dyn Error>> {
        body.seek(SeekFrom::Start(EXT2_SUPERBLOCK_OFFSET))?;
        let mut sb_buf = vec![0u8; EXT2_SUPERBLOCK_SIZE];
        body.read_exact(&mut sb_buf)?;
        let superblock = Superblock::from_bytes(&sb_buf)?;

        let group_count = superblock.group_count() as usize;
        let table_offset = superblock.bg_desc_block() * superblock.block_size();
        let mut table_buf = vec![0u8; group_count * EXT2_GROUP_DESC_SIZE];
        body.seek(SeekFrom::Start(table_offset))?;
        body.read_exact(&mut table_buf)?;

        let descriptors = table_buf
            .chunks_exact(EXT2_GROUP_DESC_SIZE)
            .map(GroupDescriptor::from_bytes)
            .collect::<Vec<_>>();
        debug!("loaded {} group descriptor(s)", descriptors.len());

        Ok(Ext2Image {
            superblock,
            descriptors,
            body,
        })
    }

    pub fn inodes_count(&self) -> u32 {
        self.superblock.inodes_count()
    }

    pub fn descriptors(&self) -> &[GroupDescriptor] {
        &self.descriptors
    }

    /// Byte offset of inode `inode_num` inside the image. Inode numbers are
    /// 1-based; 0, numbers past the inode count, and groups past the
    /// descriptor table are errors.
    pub fn inode_offset(&self, inode_num: u32) -> Result<u64, Box<dyn Error>> {
        if inode_num < 1 || inode_num > self.superblock.inodes_count() {
            return Err(format!("Inode {} out of valid range", inode_num).into());
        }
        let inodes_per_group = self.superblock.inodes_per_group() as u64;
        let group_index = ((inode_num - 1) as u64) / inodes_per_group;
        let index_within_group = ((inode_num - 1) as u64) % inodes_per_group;

        let gd = self
            .descriptors
            .get(group_index as usize)
            .ok_or_else(|| format!("Block group {} beyond descriptor table", group_index))?;

        Ok(gd.bg_inode_table() * self.superblock.block_size()
            + index_within_group * self.superblock.inode_size() as u64)
    }

    /// Byte offset of block `block_num` inside the image.
    pub fn block_offset(&self, block_num: u64) -> Result<u64, Box<dyn Error>> {
        if block_num >= self.superblock.blocks_count() {
            return Err(format!("Requested block {} is out of range", block_num).into());
        }
        Ok(block_num * self.superblock.block_size())
    }

    /// Read a particular inode by number.
    pub fn get_inode(&mut self, inode_num: u32) -> Result<Inode, Box<dyn Error>> {
        let offset = self.inode_offset(inode_num)?;
        let mut buf = vec![0u8; self.superblock.inode_size()];
        self.body.seek(SeekFrom::Start(offset))?;
        self.body.read_exact(&mut buf)?;
        Ok(Inode::from_bytes(inode_num, &buf))
    }

    /// Read one filesystem block into a Vec.
    pub fn read_block(&mut self, block_num: u64) -> Result<Vec<u8>, Box<dyn Error>> {
        let offset = self.block_offset(block_num)?;
        let mut buf = vec![0u8; self.superblock.block_size() as usize];
        self.body.seek(SeekFrom::Start(offset))?;
        self.body.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Whether `inode_num` names a directory. Unreadable or out-of-range
    /// inodes answer false; liveness is not considered, so a deleted
    /// directory whose record survives still answers true.
    pub fn is_directory(&mut self, inode_num: u32) -> bool {
        if inode_num == 0 {
            return false;
        }
        match self.get_inode(inode_num) {
            Ok(inode) => inode.is_dir(),
            Err(_) => false,
        }
    }
}
