use std::io::{Read, Seek};

use log::info;

use crate::resolve::{parent_of, resolve_path};
use crate::{Ext2Image, EXT2_ROOT_INO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Deleted,
}

/// One reconstructed filesystem event. `path` and `parent` are best-effort:
/// a deletion that overwrote all directory residue leaves both unresolved,
/// which renders as `?` rather than failing the run.
#[derive(Debug)]
pub struct TimelineEvent {
    pub inode: u32,
    pub timestamp: u32,
    pub kind: EventKind,
    pub is_directory: bool,
    pub path: Option<String>,
    pub parent: Option<u32>,
}

impl TimelineEvent {
    pub fn op(&self) -> &'static str {
        match (self.kind, self.is_directory) {
            (EventKind::Created, true) => "mkdir",
            (EventKind::Created, false) => "touch",
            (EventKind::Deleted, true) => "rmdir",
            (EventKind::Deleted, false) => "rm",
        }
    }

    pub fn render(&self) -> String {
        let path = self.path.as_deref().unwrap_or("?");
        let parent = self
            .parent
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!(
            "{} {} [{}] [{}] [{}]",
            self.timestamp,
            self.op(),
            path,
            parent,
            self.inode
        )
    }
}

/// Enumerate every inode and reconstruct creation and deletion events.
///
/// Output order is iteration order, not chronological: all creation events
/// first, then all deletion events, each class in ascending inode order.
/// Creations are inodes at or above the first non-reserved number whose
/// access time is non-zero — ext2 carries no dedicated creation timestamp,
/// so the access time stands in for it. Deletions are any inode with a
/// non-zero deletion time.
pub fn build_timeline<T: Read + Seek>(fs: &mut Ext2Image<T>) -> Vec<TimelineEvent> {
    let mut events = collect_creations(fs);
    events.extend(collect_deletions(fs));
    info!("reconstructed {} event(s)", events.len());
    events
}

/// One line per event, newline-separated, no trailing newline.
pub fn render_history(events: &[TimelineEvent]) -> String {
    events
        .iter()
        .map(TimelineEvent::render)
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_creations<T: Read + Seek>(fs: &mut Ext2Image<T>) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    for inode_num in fs.superblock.first_ino()..=fs.inodes_count() {
        let inode = match fs.get_inode(inode_num) {
            Ok(inode) => inode,
            Err(_) => continue,
        };
        if inode.i_atime == 0 {
            continue;
        }
        let path = resolve_path(fs, inode_num);
        let parent = creation_parent(fs, path.as_deref());
        events.push(TimelineEvent {
            inode: inode_num,
            timestamp: inode.i_atime,
            kind: EventKind::Created,
            is_directory: inode.is_dir(),
            path,
            parent,
        });
    }
    events
}

fn collect_deletions<T: Read + Seek>(fs: &mut Ext2Image<T>) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    for inode_num in 1..=fs.inodes_count() {
        let inode = match fs.get_inode(inode_num) {
            Ok(inode) => inode,
            Err(_) => continue,
        };
        if !inode.is_deleted() {
            continue;
        }
        let path = resolve_path(fs, inode_num);
        let parent = parent_of(fs, inode_num);
        events.push(TimelineEvent {
            inode: inode_num,
            timestamp: inode.i_dtime,
            kind: EventKind::Deleted,
            is_directory: inode.is_dir(),
            path,
            parent,
        });
    }
    events
}

/// Parent of a creation event: strip the last path component and find the
/// directory whose own resolved path matches. A path with no further
/// separator is a direct child of root.
fn creation_parent<T: Read + Seek>(fs: &mut Ext2Image<T>, path: Option<&str>) -> Option<u32> {
    let path = path?;
    let parent_path = match path.rfind('/') {
        Some(0) | None => return Some(EXT2_ROOT_INO),
        Some(idx) => &path[..idx],
    };
    for check in 1..=fs.inodes_count() {
        if !fs.is_directory(check) {
            continue;
        }
        if resolve_path(fs, check).as_deref() == Some(parent_path) {
            return Some(check);
        }
    }
    None
}
