use crate::direntry::{DirEntry, DIRENT_HEADER_SIZE, EXT2_MAX_NAME_LEN};

/// Scan the slack space of one directory record for stale entries left
/// behind by deletion or rename.
///
/// A record's nominal length is what its header and name actually need;
/// when the stored rec_len exceeds that by more than one header, the gap
/// may still hold an earlier entry that was overwritten in place. The scan
/// steps through that gap in 4-byte-aligned positions, tentatively reading
/// a record header at each one. Acceptance is heuristic: the inode number
/// must be in range for the filesystem and the name length plausible.
/// Reused bytes can coincidentally pass those checks, so a returned ghost
/// is best-effort evidence, never a guarantee. "." and ".." ghosts are
/// dropped.
pub fn recover_ghosts(
    block: &[u8],
    host: &DirEntry,
    host_offset: usize,
    inode_count: u32,
    feature_incompat: u32,
) -> Vec<(DirEntry, usize)> {
    let mut ghosts = Vec::new();

    let nominal = host.nominal_len();
    let stored = host.rec_len as usize;

    // A name length overrunning its own record leaves nothing to interpret.
    if nominal > stored {
        return ghosts;
    }
    // Not enough slack to hold even one stale header.
    if stored <= nominal + DIRENT_HEADER_SIZE {
        return ghosts;
    }

    // The record end never passes the block end for scanner-validated
    // hosts; clamp anyway so a corrupt rec_len cannot read out of bounds.
    let end = (host_offset + stored).min(block.len());
    let mut pos = host_offset + nominal;
    while pos % 4 != 0 {
        pos += 1;
    }

    while pos + DIRENT_HEADER_SIZE <= end {
        let candidate = DirEntry::from_bytes(&block[pos..], feature_incompat);

        let plausible = candidate.inode >= 1
            && candidate.inode <= inode_count
            && candidate.name_len >= 1
            && (candidate.name_len as usize) <= EXT2_MAX_NAME_LEN;

        if plausible {
            // Step over the ghost's own record; a zeroed length would stall.
            let step = if candidate.rec_len > 0 {
                candidate.rec_len as usize
            } else {
                4
            };
            if !candidate.is_dot() {
                ghosts.push((candidate, pos));
            }
            pos += step;
        } else {
            pos += 4;
        }
    }

    ghosts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direntry::{raw_entry, INCOMPAT_FILETYPE};

    const INODE_COUNT: u32 = 32;

    /// One live record filling `rec_len` bytes, with raw ghost bytes pasted
    /// into its slack at `at` (relative to the record start).
    fn host_with_ghost(rec_len: u16, name: &str, ghost: &[u8], at: usize) -> Vec<u8> {
        let mut block = raw_entry(13, rec_len, name);
        block[at..at + ghost.len()].copy_from_slice(ghost);
        block
    }

    fn parse_host(block: &[u8]) -> DirEntry {
        DirEntry::from_bytes(block, INCOMPAT_FILETYPE)
    }

    #[test]
    fn recovers_overwritten_entry() {
        // "b" needs 12 bytes; the stale "a.txt" record starts right after.
        let ghost = raw_entry(12, 988, "a.txt");
        let block = host_with_ghost(1000, "b", &ghost, 12);
        let host = parse_host(&block);

        let found = recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.inode, 12);
        assert_eq!(found[0].0.name, "a.txt");
        assert_eq!(found[0].1, 12);
    }

    #[test]
    fn scan_never_starts_before_nominal_length() {
        // A plausible header placed inside the host's own name area must
        // not be reported: scanning starts at the nominal boundary.
        let decoy = raw_entry(9, 12, "x");
        let mut block = raw_entry(13, 1000, "longname"); // nominal 16
        block[8..8 + decoy.len().min(8)].copy_from_slice(&decoy[..8.min(decoy.len())]);
        let host = parse_host(&block);

        let found = recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE);
        assert!(found.iter().all(|(_, off)| *off >= host.nominal_len()));
    }

    #[test]
    fn no_slack_no_ghosts() {
        // stored == nominal
        let block = raw_entry(13, 12, "b");
        let host = parse_host(&block);
        assert!(recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE).is_empty());

        // stored == nominal + header: still at the "no slack" boundary
        let block = raw_entry(13, 20, "b");
        let host = parse_host(&block);
        assert!(recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE).is_empty());
    }

    #[test]
    fn noise_is_rejected_not_fatal() {
        // Zero inode, out-of-range inode, zero name length: all stepped over.
        let mut block = raw_entry(13, 1000, "b");
        block[12..16].copy_from_slice(&0u32.to_le_bytes()); // inode 0
        block[40..44].copy_from_slice(&(INODE_COUNT + 1).to_le_bytes()); // out of range
        block[60..64].copy_from_slice(&9u32.to_le_bytes()); // inode ok, name_len 0
        let host = parse_host(&block);

        assert!(recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE).is_empty());
    }

    #[test]
    fn dot_ghosts_are_filtered_but_stepped_over() {
        // A stale ".." record sits first; a real ghost hides behind it at
        // the distance of the dot record's own rec_len.
        let dot = raw_entry(2, 16, "..");
        let real = raw_entry(14, 40, "notes");
        let mut block = raw_entry(13, 1000, "b");
        block[12..12 + dot.len()].copy_from_slice(&dot);
        block[28..28 + real.len()].copy_from_slice(&real);
        let host = parse_host(&block);

        let found = recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.name, "notes");
        assert_eq!(found[0].1, 28);
    }

    #[test]
    fn zero_length_ghost_does_not_stall() {
        // Accepted ghost with rec_len 0: the scan must advance by 4.
        let mut ghost = raw_entry(12, 16, "a.txt");
        ghost[4..6].copy_from_slice(&0u16.to_le_bytes());
        let block = host_with_ghost(1000, "b", &ghost, 12);
        let host = parse_host(&block);

        let found = recover_ghosts(&block, &host, 0, INODE_COUNT, INCOMPAT_FILETYPE);
        assert_eq!(found[0].0.inode, 12);
        // Termination is the property under test; reaching here proves it.
    }
}
