use std::collections::HashSet;
use std::error::Error;
use std::io::{Read, Seek};

use log::warn;

use crate::ghost::recover_ghosts;
use crate::scanner::DirBlockEntries;
use crate::{Ext2Image, EXT2_ROOT_INO};

/// Render the live directory tree from the root inode, interleaving ghost
/// entries recovered from slack space.
///
/// Depth-first, preorder, in direct-pointer order. Live entries print as
/// `<dashes> <inode>:<name>[/]`, recovered ghosts as
/// `<dashes> (<inode>:<name>[/])`; the dash count is the tree depth, with
/// the root's children at depth 2. Ghosts are reported but never recursed
/// into: their data blocks may be gone or reused, and a ghost claiming an
/// ancestor as a child must not send the walk in circles.
pub fn dump<T: Read + Seek>(fs: &mut Ext2Image<T>) -> Result<String, Box<dyn Error>> {
    let mut out = String::new();
    out.push_str(&format!("- {}:root/", EXT2_ROOT_INO));

    let mut visited = HashSet::new();
    visited.insert(EXT2_ROOT_INO);
    walk(fs, EXT2_ROOT_INO, 2, &mut visited, &mut out);

    out.push('\n');
    Ok(out)
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    out.push('\n');
    for _ in 0..depth {
        out.push('-');
    }
    out.push(' ');
    out.push_str(text);
}

fn walk<T: Read + Seek>(
    fs: &mut Ext2Image<T>,
    inode_num: u32,
    depth: usize,
    visited: &mut HashSet<u32>,
    out: &mut String,
) {
    let inode = match fs.get_inode(inode_num) {
        Ok(inode) => inode,
        Err(e) => {
            warn!("skipping unreadable inode {}: {}", inode_num, e);
            return;
        }
    };

    let inode_count = fs.inodes_count();
    let comp = fs.superblock.feature_incompat();

    for &block_num in inode.direct_blocks() {
        if block_num == 0 {
            continue; // hole
        }
        let data = match fs.read_block(block_num as u64) {
            Ok(data) => data,
            Err(e) => {
                warn!("inode {}: unreadable block {}: {}", inode_num, block_num, e);
                continue;
            }
        };

        for item in DirBlockEntries::new(&data, comp) {
            let (entry, offset) = match item {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("inode {} block {}: {}", inode_num, block_num, e);
                    break;
                }
            };

            // A name length overrunning the record makes both the entry and
            // its slack untrustworthy.
            if entry.nominal_len() > entry.rec_len as usize {
                continue;
            }

            for (ghost, _) in recover_ghosts(&data, &entry, offset, inode_count, comp) {
                let suffix = if fs.is_directory(ghost.inode) { "/" } else { "" };
                push_line(
                    out,
                    depth,
                    &format!("({}:{}{})", ghost.inode, ghost.name, suffix),
                );
            }

            if entry.inode == 0 || entry.is_dot() {
                continue;
            }

            if fs.is_directory(entry.inode) {
                push_line(out, depth, &format!("{}:{}/", entry.inode, entry.name));
                if visited.insert(entry.inode) {
                    walk(fs, entry.inode, depth + 1, visited, out);
                } else {
                    warn!(
                        "directory inode {} reachable twice; not descending again",
                        entry.inode
                    );
                }
            } else {
                push_line(out, depth, &format!("{}:{}", entry.inode, entry.name));
            }
        }
    }
}
