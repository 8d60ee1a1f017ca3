use crate::direntry::{DirEntry, DIRENT_HEADER_SIZE};

/// Iterator over the records of one directory data block.
///
/// Walks stored record lengths from offset 0 to the end of the block and
/// yields every record together with its byte offset, unused slots
/// (inode 0) included; skipping those and "."/".." is caller policy.
/// A record length of zero, below the header size, or running past the
/// block end is structural corruption: one `Err` item is yielded and the
/// walk stops, so a bad length can neither loop forever nor read out of
/// bounds.
pub struct DirBlockEntries<'a> {
    block: &'a [u8],
    offset: usize,
    feature_incompat: u32,
    done: bool,
}

impl<'a> DirBlockEntries<'a> {
    pub fn new(block: &'a [u8], feature_incompat: u32) -> Self {
        DirBlockEntries {
            block,
            offset: 0,
            feature_incompat,
            done: false,
        }
    }
}

impl<'a> Iterator for DirBlockEntries<'a> {
    type Item = Result<(DirEntry, usize), String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset + DIRENT_HEADER_SIZE > self.block.len() {
            return None;
        }

        let offset = self.offset;
        let rec_len = u16::from_le_bytes([self.block[offset + 4], self.block[offset + 5]]) as usize;

        if rec_len < DIRENT_HEADER_SIZE || offset + rec_len > self.block.len() {
            self.done = true;
            return Some(Err(format!(
                "invalid record length {} at block offset {}",
                rec_len, offset
            )));
        }

        let entry = DirEntry::from_bytes(&self.block[offset..offset + rec_len], self.feature_incompat);
        self.offset += rec_len;
        Some(Ok((entry, offset)))
    }
}
