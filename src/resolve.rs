use std::collections::HashSet;
use std::io::{Read, Seek};

use log::{debug, warn};

use crate::direntry::DirEntry;
use crate::ghost::recover_ghosts;
use crate::inode::Inode;
use crate::scanner::DirBlockEntries;
use crate::{Ext2Image, EXT2_ROOT_INO};

/// Recover the last known full path of `target` by a root-down search over
/// live entries, slack-space ghosts, and ghost directories that are only
/// reachable through other deleted directories.
///
/// Not every deletion leaves a trace: `None` is the normal outcome for an
/// inode whose directory records were all overwritten, not an error.
/// Resolution is deterministic for a given image, so resolving the same
/// inode twice yields the same answer.
pub fn resolve_path<T: Read + Seek>(fs: &mut Ext2Image<T>, target: u32) -> Option<String> {
    let mut visited = HashSet::new();
    find_path(fs, target, EXT2_ROOT_INO, "", &mut visited)
}

/// Find the first directory whose records (live or ghost) reference
/// `target`. Linear scan in ascending inode order; only directory inodes
/// are ever returned. "." and ".." are ignored, otherwise every directory
/// would claim itself and its children.
pub fn parent_of<T: Read + Seek>(fs: &mut Ext2Image<T>, target: u32) -> Option<u32> {
    let inode_count = fs.inodes_count();
    let comp = fs.superblock.feature_incompat();

    for dir_num in 1..=inode_count {
        let inode = match fs.get_inode(dir_num) {
            Ok(inode) if inode.is_dir() => inode,
            _ => continue,
        };

        for &block_num in inode.direct_blocks() {
            if block_num == 0 {
                continue;
            }
            let data = match fs.read_block(block_num as u64) {
                Ok(data) => data,
                Err(_) => continue,
            };

            for item in DirBlockEntries::new(&data, comp) {
                let (entry, offset) = match item {
                    Ok(pair) => pair,
                    Err(e) => {
                        debug!("inode {} block {}: {}", dir_num, block_num, e);
                        break;
                    }
                };
                if entry.nominal_len() > entry.rec_len as usize {
                    continue;
                }
                if recover_ghosts(&data, &entry, offset, inode_count, comp)
                    .iter()
                    .any(|(g, _)| g.inode == target)
                {
                    return Some(dir_num);
                }
                if entry.inode == target && !entry.is_dot() {
                    return Some(dir_num);
                }
            }
        }
    }
    None
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

fn find_path<T: Read + Seek>(
    fs: &mut Ext2Image<T>,
    target: u32,
    current: u32,
    current_path: &str,
    visited: &mut HashSet<u32>,
) -> Option<String> {
    if current == 0 || !visited.insert(current) {
        return None;
    }

    let inode = match fs.get_inode(current) {
        Ok(inode) if inode.is_dir() => inode,
        Ok(_) => return None,
        Err(e) => {
            warn!("cannot read inode {} while resolving {}: {}", current, target, e);
            return None;
        }
    };

    let inode_count = fs.inodes_count();
    let comp = fs.superblock.feature_incompat();

    for &block_num in inode.direct_blocks() {
        if block_num == 0 {
            continue;
        }
        let data = match fs.read_block(block_num as u64) {
            Ok(data) => data,
            Err(e) => {
                warn!("inode {}: unreadable block {}: {}", current, block_num, e);
                continue;
            }
        };

        for item in DirBlockEntries::new(&data, comp) {
            let (entry, offset) = match item {
                Ok(pair) => pair,
                Err(e) => {
                    debug!("inode {} block {}: {}", current, block_num, e);
                    break;
                }
            };
            if entry.nominal_len() > entry.rec_len as usize {
                continue;
            }

            // The slack may hold the deleted entry itself.
            for (ghost, _) in recover_ghosts(&data, &entry, offset, inode_count, comp) {
                if ghost.inode == target {
                    return Some(join(current_path, &ghost.name));
                }
            }

            if entry.inode == 0 || entry.is_dot() {
                continue;
            }
            if entry.inode == target {
                return Some(join(current_path, &entry.name));
            }
            if fs.is_directory(entry.inode) {
                let sub_path = join(current_path, &entry.name);
                if let Some(found) = find_path(fs, target, entry.inode, &sub_path, visited) {
                    return Some(found);
                }
            }
        }
    }

    // Not among this directory's own records. A deleted subdirectory that
    // once lived here may still hold the reference in its surviving blocks:
    // recurse into every ghost directory whose parent resolves to `current`,
    // under the name its own ghost entry preserves.
    for check in 1..=inode_count {
        if check == current || visited.contains(&check) {
            continue;
        }
        match fs.get_inode(check) {
            Ok(inode) if inode.is_deleted() && inode.is_dir() => {}
            _ => continue,
        }
        if parent_of(fs, check) != Some(current) {
            continue;
        }
        let name = match ghost_entry_name(fs, &inode, check) {
            Some(name) => name,
            None => continue,
        };
        let sub_path = join(current_path, &name);
        if let Some(found) = find_path(fs, target, check, &sub_path, visited) {
            return Some(found);
        }
    }

    None
}

/// The name under which `child` still appears as a ghost inside `dir`'s
/// data blocks, if any residue survives.
fn ghost_entry_name<T: Read + Seek>(
    fs: &mut Ext2Image<T>,
    dir: &Inode,
    child: u32,
) -> Option<String> {
    let inode_count = fs.inodes_count();
    let comp = fs.superblock.feature_incompat();

    for &block_num in dir.direct_blocks() {
        if block_num == 0 {
            continue;
        }
        let data = match fs.read_block(block_num as u64) {
            Ok(data) => data,
            Err(_) => continue,
        };
        for item in DirBlockEntries::new(&data, comp) {
            let (entry, offset) = match item {
                Ok(pair) => pair,
                Err(_) => break,
            };
            if entry.nominal_len() > entry.rec_len as usize {
                continue;
            }
            let hit = recover_ghosts(&data, &entry, offset, inode_count, comp)
                .into_iter()
                .map(|(g, _)| g)
                .find(|g: &DirEntry| g.inode == child);
            if let Some(ghost) = hit {
                return Some(ghost.name);
            }
        }
    }
    None
}
