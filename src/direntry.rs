use byteorder::{ByteOrder, LittleEndian};

pub const INCOMPAT_FILETYPE: u32 = 0x2;

/// Fixed header bytes before the name: inode (4), rec_len (2),
/// name_len/file_type (2).
pub const DIRENT_HEADER_SIZE: usize = 8;
pub const EXT2_MAX_NAME_LEN: usize = 255;

// Structure representing a directory entry
#[derive(Debug, Clone)]
pub struct DirEntry {
    // Inode number associated with the directory entry (0 = unused slot)
    pub inode: u32,
    // Stored length of this directory entry record, padding included
    pub rec_len: u16,
    // Length of the name as recorded on disk
    pub name_len: u16,
    // Type of the file described by this directory entry
    pub file_type: u8,
    // Name of the file in the directory
    pub name: String,
}

impl DirEntry {
    /// Constructs a DirEntry from a byte slice starting at the record header.
    ///
    /// With the 'filetype' incompat feature, name_len is 1 byte followed by a
    /// single file_type byte; otherwise name_len spans bytes [6..8]. The name
    /// read is clamped to the bytes actually available in `data`, so a stale
    /// or corrupt name_len never reads past the slice.
    pub fn from_bytes(data: &[u8], comp: u32) -> DirEntry {
        let name_len;
        let mut ftype = 0u8;

        if comp & INCOMPAT_FILETYPE != 0 {
            name_len = data[6] as u16;
            ftype = data[7];
        } else {
            name_len = LittleEndian::read_u16(&data[6..8]);
        }

        let avail = data.len().saturating_sub(DIRENT_HEADER_SIZE);
        let take = (name_len as usize).min(avail);

        DirEntry {
            inode: LittleEndian::read_u32(&data[0..4]),
            rec_len: LittleEndian::read_u16(&data[4..6]),
            name_len,
            file_type: ftype,
            name: String::from_utf8_lossy(&data[DIRENT_HEADER_SIZE..DIRENT_HEADER_SIZE + take])
                .to_string(),
        }
    }

    /// The space this record needs for its header and name, rounded up to
    /// the 4-byte boundary records are laid out on. Anything the stored
    /// rec_len holds beyond this is padding or slack.
    pub fn nominal_len(&self) -> usize {
        (DIRENT_HEADER_SIZE + self.name_len as usize + 3) & !3
    }

    /// "." and ".." carry no naming information worth reporting.
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Test helper: lay out one raw record exactly as it sits on disk.
#[cfg(test)]
pub(crate) fn raw_entry(inode: u32, rec_len: u16, name: &str) -> Vec<u8> {
    let mut raw = vec![0u8; rec_len as usize];
    raw[0..4].copy_from_slice(&inode.to_le_bytes());
    raw[4..6].copy_from_slice(&rec_len.to_le_bytes());
    raw[6] = name.len() as u8;
    raw[7] = 1; // regular file
    raw[8..8 + name.len()].copy_from_slice(name.as_bytes());
    raw
}
