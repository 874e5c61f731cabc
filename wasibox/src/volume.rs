//! The in-memory file system.
//!
//! A volume is a tree of directory and file nodes. Nodes are shared
//! (`Arc<Mutex<_>>`): the directory tree holds one reference for name
//! lookup, and every open descriptor holds another, so an unlinked node
//! stays alive until the last descriptor referencing it is closed.
//!
//! Directory entries keep their insertion order, and every entry carries a
//! cookie drawn from a per-directory monotone counter. Cookies of new
//! entries are strictly greater than any cookie handed out before, which
//! is what keeps `fd_readdir` resumption stable across insertions and
//! deletions.
//!
//! Timestamps are nanoseconds since the Unix epoch, clamped to be
//! strictly monotonic per volume so that even a coarse host clock yields
//! distinct, ordered stamps.

use log::trace;
use parking_lot::Mutex;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use wasibox_core::wasi_snapshot_preview1::{Errno, Filetype};

/// Errors produced by volume operations. They are translated to WASI
/// errno values at the syscall boundary.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// The path or one of its components does not exist.
    #[error("no such file or directory")]
    NotFound,
    /// Creation was requested for a name that already exists.
    #[error("file exists")]
    AlreadyExists,
    /// A non-directory node was found where a directory is required.
    #[error("not a directory")]
    NotDirectory,
    /// A directory was found where a file is required.
    #[error("is a directory")]
    IsDirectory,
    /// A directory scheduled for removal or replacement still has entries.
    #[error("directory not empty")]
    NotEmpty,
    /// A malformed path or an impossible rename (e.g. a directory into
    /// its own subtree).
    #[error("invalid path")]
    InvalidPath,
    /// A writable stream was used after it was closed.
    #[error("stream is closed")]
    StreamClosed,
}

impl From<VolumeError> for Errno {
    fn from(error: VolumeError) -> Self {
        match error {
            VolumeError::NotFound => Errno::Noent,
            VolumeError::AlreadyExists => Errno::Exist,
            VolumeError::NotDirectory => Errno::Notdir,
            VolumeError::IsDirectory => Errno::Isdir,
            VolumeError::NotEmpty => Errno::Notempty,
            VolumeError::InvalidPath => Errno::Inval,
            VolumeError::StreamClosed => Errno::Badf,
        }
    }
}

/// Node timestamps, nanoseconds since the Unix epoch.
#[derive(Debug, Copy, Clone)]
pub(crate) struct NodeTimes {
    pub(crate) atim: u64,
    pub(crate) mtim: u64,
    pub(crate) ctim: u64,
}

impl NodeTimes {
    fn at(now: u64) -> Self {
        Self {
            atim: now,
            mtim: now,
            ctim: now,
        }
    }
}

/// A regular file: a byte buffer plus metadata.
#[derive(Debug)]
pub(crate) struct FileNode {
    pub(crate) bytes: Vec<u8>,
    pub(crate) times: NodeTimes,
    pub(crate) ino: u64,
}

/// A directory: insertion-ordered named entries plus metadata.
#[derive(Debug)]
pub(crate) struct DirNode {
    entries: Vec<DirSlot>,
    next_cookie: u64,
    pub(crate) times: NodeTimes,
    pub(crate) ino: u64,
}

#[derive(Debug)]
struct DirSlot {
    name: Vec<u8>,
    cookie: u64,
    node: Node,
}

pub(crate) type FileRef = Arc<Mutex<FileNode>>;
pub(crate) type DirRef = Arc<Mutex<DirNode>>;

/// A reference to a file or directory node.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    File(FileRef),
    Dir(DirRef),
}

impl Node {
    pub(crate) fn filetype(&self) -> Filetype {
        match self {
            Node::File(_) => Filetype::RegularFile,
            Node::Dir(_) => Filetype::Directory,
        }
    }
}

impl DirNode {
    pub(crate) fn get(&self, name: &[u8]) -> Option<Node> {
        self.entries
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.node.clone())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry with a cookie strictly greater than every cookie
    /// this directory has handed out before.
    fn insert(&mut self, name: Vec<u8>, node: Node) {
        let cookie = self.next_cookie;
        self.next_cookie += 1;
        self.entries.push(DirSlot { name, cookie, node });
    }

    fn remove(&mut self, name: &[u8]) -> Option<Node> {
        let index = self.entries.iter().position(|slot| slot.name == name)?;
        Some(self.entries.remove(index).node)
    }

    /// Returns the first live entry whose cookie is `cookie` or later.
    pub(crate) fn entry_at_or_after(&self, cookie: u64) -> Option<(u64, Vec<u8>, Node)> {
        self.entries
            .iter()
            .find(|slot| slot.cookie >= cookie)
            .map(|slot| (slot.cookie, slot.name.clone(), slot.node.clone()))
    }

    /// All live entries in insertion order.
    pub(crate) fn list(&self) -> Vec<(Vec<u8>, Filetype)> {
        self.entries
            .iter()
            .map(|slot| (slot.name.clone(), slot.node.filetype()))
            .collect()
    }
}

/// Metadata snapshot of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Kind of the node.
    pub filetype: Filetype,
    /// Content size in bytes; 0 for directories.
    pub size: u64,
    /// Stable serial number of the node within its volume.
    pub ino: u64,
    /// Identifier of the volume holding the node.
    pub dev: u64,
    /// Number of hard links; always 1, the volume has no links.
    pub nlink: u64,
    /// Last access timestamp in nanoseconds.
    pub atim: u64,
    /// Last content modification timestamp in nanoseconds.
    pub mtim: u64,
    /// Last status change timestamp in nanoseconds.
    pub ctim: u64,
}

#[derive(Debug)]
struct VolumeShared {
    device: u64,
    next_ino: AtomicU64,
    last_stamp: AtomicU64,
}

impl VolumeShared {
    fn new_ino(&self) -> u64 {
        self.next_ino.fetch_add(1, Ordering::Relaxed)
    }

    /// Wall-clock nanoseconds, bumped to stay strictly monotonic within
    /// the volume.
    fn now(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut stamp = 0;
        self.last_stamp
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                stamp = wall.max(last + 1);
                Some(stamp)
            })
            .ok();
        stamp
    }
}

static NEXT_DEVICE: AtomicU64 = AtomicU64::new(1);

/// An ephemeral, in-memory file system.
#[derive(Debug, Clone)]
pub struct MemVolume {
    root: DirRef,
    shared: Arc<VolumeShared>,
}

impl Default for MemVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl MemVolume {
    /// Creates an empty volume containing only the root directory.
    pub fn new() -> Self {
        let shared = Arc::new(VolumeShared {
            device: NEXT_DEVICE.fetch_add(1, Ordering::Relaxed),
            next_ino: AtomicU64::new(2),
            last_stamp: AtomicU64::new(0),
        });
        let now = shared.now();
        let root = Arc::new(Mutex::new(DirNode {
            entries: Vec::new(),
            next_cookie: 0,
            times: NodeTimes::at(now),
            ino: 1,
        }));

        Self { root, shared }
    }

    /// Whether two handles refer to the same underlying volume.
    pub fn same_volume(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn root(&self) -> &DirRef {
        &self.root
    }

    pub(crate) fn device(&self) -> u64 {
        self.shared.device
    }

    pub(crate) fn now(&self) -> u64 {
        self.shared.now()
    }

    pub(crate) fn new_file_node(&self, bytes: Vec<u8>) -> FileRef {
        let now = self.shared.now();
        Arc::new(Mutex::new(FileNode {
            bytes,
            times: NodeTimes::at(now),
            ino: self.shared.new_ino(),
        }))
    }

    fn new_dir_node(&self) -> DirRef {
        let now = self.shared.now();
        Arc::new(Mutex::new(DirNode {
            entries: Vec::new(),
            next_cookie: 0,
            times: NodeTimes::at(now),
            ino: self.shared.new_ino(),
        }))
    }

    /// Splits a byte path into validated components. Used by the embedder
    /// API; guest paths go through the resolver instead, which handles
    /// `.`/`..` against a preopen root.
    fn components(path: &[u8]) -> Result<Vec<Vec<u8>>, VolumeError> {
        if path.contains(&0) {
            return Err(VolumeError::InvalidPath);
        }

        let mut components = Vec::new();
        for component in path.split(|&b| b == b'/') {
            match component {
                b"" => {}
                b"." | b".." => return Err(VolumeError::InvalidPath),
                name => components.push(name.to_vec()),
            }
        }

        Ok(components)
    }

    /// Resolves an embedder byte path to a directory node.
    pub(crate) fn resolve_dir(&self, path: &[u8]) -> Result<DirRef, VolumeError> {
        let path = Self::components(path)?;
        self.lookup_dir_at(&self.root, &path)
    }

    pub(crate) fn lookup_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<Node, VolumeError> {
        let mut current = start.clone();

        for (i, component) in path.iter().enumerate() {
            let node = current
                .lock()
                .get(component)
                .ok_or(VolumeError::NotFound)?;

            if i + 1 == path.len() {
                return Ok(node);
            }

            current = match node {
                Node::Dir(dir) => dir,
                Node::File(_) => return Err(VolumeError::NotDirectory),
            };
        }

        Ok(Node::Dir(current))
    }

    pub(crate) fn lookup_dir_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<DirRef, VolumeError> {
        match self.lookup_at(start, path)? {
            Node::Dir(dir) => Ok(dir),
            Node::File(_) => Err(VolumeError::NotDirectory),
        }
    }

    pub(crate) fn lookup_file_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<FileRef, VolumeError> {
        match self.lookup_at(start, path)? {
            Node::File(file) => Ok(file),
            Node::Dir(_) => Err(VolumeError::IsDirectory),
        }
    }

    /// Resolves everything but the final component. The final component
    /// name is returned for the caller to create, remove or replace.
    fn lookup_parent_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<(DirRef, Vec<u8>), VolumeError> {
        let (name, parents) = path.split_last().ok_or(VolumeError::InvalidPath)?;
        let parent = self.lookup_dir_at(start, parents)?;

        Ok((parent, name.clone()))
    }

    pub(crate) fn stat_node(&self, node: &Node) -> Metadata {
        match node {
            Node::File(file) => {
                let file = file.lock();
                Metadata {
                    filetype: Filetype::RegularFile,
                    size: file.bytes.len() as u64,
                    ino: file.ino,
                    dev: self.shared.device,
                    nlink: 1,
                    atim: file.times.atim,
                    mtim: file.times.mtim,
                    ctim: file.times.ctim,
                }
            }
            Node::Dir(dir) => {
                let dir = dir.lock();
                Metadata {
                    filetype: Filetype::Directory,
                    size: 0,
                    ino: dir.ino,
                    dev: self.shared.device,
                    nlink: 1,
                    atim: dir.times.atim,
                    mtim: dir.times.mtim,
                    ctim: dir.times.ctim,
                }
            }
        }
    }

    pub(crate) fn stat_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<Metadata, VolumeError> {
        let node = self.lookup_at(start, path)?;
        Ok(self.stat_node(&node))
    }

    pub(crate) fn create_dir_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
        recursive: bool,
    ) -> Result<(), VolumeError> {
        if path.is_empty() {
            // The start directory itself; mkdir -p tolerates it.
            return if recursive {
                Ok(())
            } else {
                Err(VolumeError::AlreadyExists)
            };
        }

        let mut current = start.clone();
        for (i, component) in path.iter().enumerate() {
            let last = i + 1 == path.len();
            let existing = current.lock().get(component);

            current = match existing {
                Some(Node::Dir(dir)) => {
                    if last && !recursive {
                        return Err(VolumeError::AlreadyExists);
                    }
                    dir
                }
                Some(Node::File(_)) => {
                    return Err(if last {
                        VolumeError::AlreadyExists
                    } else {
                        VolumeError::NotDirectory
                    })
                }
                None => {
                    if !last && !recursive {
                        return Err(VolumeError::NotFound);
                    }

                    let dir = self.new_dir_node();
                    let now = self.shared.now();
                    {
                        let mut parent = current.lock();
                        parent.insert(component.clone(), Node::Dir(dir.clone()));
                        parent.times.mtim = now;
                        parent.times.ctim = now;
                    }
                    dir
                }
            };
        }

        trace!("mkdir created {} component(s)", path.len());
        Ok(())
    }

    /// Opens (or creates) the file at `path`. With `excl`, an existing
    /// file is an error. The returned node is shared with the directory
    /// tree.
    pub(crate) fn create_file_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
        excl: bool,
    ) -> Result<FileRef, VolumeError> {
        let (parent, name) = self.lookup_parent_at(start, path)?;

        let existing = parent.lock().get(&name);
        match existing {
            Some(Node::File(file)) => {
                if excl {
                    Err(VolumeError::AlreadyExists)
                } else {
                    Ok(file)
                }
            }
            Some(Node::Dir(_)) => Err(if excl {
                VolumeError::AlreadyExists
            } else {
                VolumeError::IsDirectory
            }),
            None => {
                let file = self.new_file_node(Vec::new());
                let now = self.shared.now();
                let mut parent = parent.lock();
                parent.insert(name, Node::File(file.clone()));
                parent.times.mtim = now;
                parent.times.ctim = now;
                Ok(file)
            }
        }
    }

    /// Atomically installs `bytes` as a fresh file node at `path`,
    /// replacing any existing file. Descriptors holding the previous node
    /// keep seeing its old content.
    pub(crate) fn install_file_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
        bytes: Vec<u8>,
        create_parents: bool,
    ) -> Result<(), VolumeError> {
        let (name, parents) = path.split_last().ok_or(VolumeError::InvalidPath)?;

        if create_parents {
            self.create_dir_at(start, parents, true)?;
        }
        let parent = self.lookup_dir_at(start, parents)?;

        if let Some(Node::Dir(_)) = parent.lock().get(name) {
            return Err(VolumeError::IsDirectory);
        }

        let file = self.new_file_node(bytes);
        let now = self.shared.now();
        let mut parent = parent.lock();
        parent.remove(name);
        parent.insert(name.clone(), Node::File(file));
        parent.times.mtim = now;
        parent.times.ctim = now;

        Ok(())
    }

    pub(crate) fn read_file_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<Vec<u8>, VolumeError> {
        let file = self.lookup_file_at(start, path)?;
        let bytes = file.lock().bytes.clone();
        Ok(bytes)
    }

    pub(crate) fn unlink_at(&self, start: &DirRef, path: &[Vec<u8>]) -> Result<(), VolumeError> {
        let (parent, name) = self.lookup_parent_at(start, path)?;

        let mut parent = parent.lock();
        match parent.get(&name) {
            Some(Node::File(_)) => {
                parent.remove(&name);
                let now = self.shared.now();
                parent.times.mtim = now;
                parent.times.ctim = now;
                Ok(())
            }
            Some(Node::Dir(_)) => Err(VolumeError::IsDirectory),
            None => Err(VolumeError::NotFound),
        }
    }

    pub(crate) fn remove_dir_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
    ) -> Result<(), VolumeError> {
        let (parent, name) = self.lookup_parent_at(start, path)?;

        let mut parent = parent.lock();
        match parent.get(&name) {
            Some(Node::Dir(dir)) => {
                if !dir.lock().is_empty() {
                    return Err(VolumeError::NotEmpty);
                }
                parent.remove(&name);
                let now = self.shared.now();
                parent.times.mtim = now;
                parent.times.ctim = now;
                Ok(())
            }
            Some(Node::File(_)) => Err(VolumeError::NotDirectory),
            None => Err(VolumeError::NotFound),
        }
    }

    pub(crate) fn truncate_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
        size: u64,
    ) -> Result<(), VolumeError> {
        let file = self.lookup_file_at(start, path)?;
        let now = self.shared.now();

        let mut file = file.lock();
        file.bytes.resize(size as usize, 0);
        file.times.mtim = now;
        file.times.ctim = now;

        Ok(())
    }

    pub(crate) fn set_times_at(
        &self,
        start: &DirRef,
        path: &[Vec<u8>],
        atim: Option<u64>,
        mtim: Option<u64>,
    ) -> Result<(), VolumeError> {
        let node = self.lookup_at(start, path)?;
        self.set_node_times(&node, atim, mtim);
        Ok(())
    }

    pub(crate) fn set_node_times(&self, node: &Node, atim: Option<u64>, mtim: Option<u64>) {
        let now = self.shared.now();

        let times = |times: &mut NodeTimes| {
            if let Some(atim) = atim {
                times.atim = atim;
            }
            if let Some(mtim) = mtim {
                times.mtim = mtim;
            }
            times.ctim = now;
        };

        match node {
            Node::File(file) => times(&mut file.lock().times),
            Node::Dir(dir) => times(&mut dir.lock().times),
        }
    }

    /// Returns whether `needle` is `haystack` itself or a directory in
    /// its subtree. Used to reject renames of a directory into itself.
    fn dir_contains(haystack: &DirRef, needle: &DirRef) -> bool {
        if Arc::ptr_eq(haystack, needle) {
            return true;
        }

        let children: Vec<DirRef> = haystack
            .lock()
            .entries
            .iter()
            .filter_map(|slot| match &slot.node {
                Node::Dir(dir) => Some(dir.clone()),
                Node::File(_) => None,
            })
            .collect();

        children
            .iter()
            .any(|child| Self::dir_contains(child, needle))
    }

    /// POSIX-style rename. The destination is overwritten if it is a
    /// file; an existing destination directory must be empty and may only
    /// be replaced by a directory.
    pub(crate) fn rename_at(
        &self,
        src_start: &DirRef,
        src_path: &[Vec<u8>],
        dst_start: &DirRef,
        dst_path: &[Vec<u8>],
    ) -> Result<(), VolumeError> {
        let (src_parent, src_name) = self.lookup_parent_at(src_start, src_path)?;
        let (dst_parent, dst_name) = self.lookup_parent_at(dst_start, dst_path)?;

        let src_node = src_parent
            .lock()
            .get(&src_name)
            .ok_or(VolumeError::NotFound)?;

        let same_parent = Arc::ptr_eq(&src_parent, &dst_parent);
        if same_parent && src_name == dst_name {
            return Ok(());
        }

        if let Node::Dir(ref src_dir) = src_node {
            if Self::dir_contains(src_dir, &dst_parent) {
                return Err(VolumeError::InvalidPath);
            }
        }

        match dst_parent.lock().get(&dst_name) {
            Some(Node::Dir(ref dst_dir)) => {
                match src_node {
                    Node::File(_) => return Err(VolumeError::IsDirectory),
                    Node::Dir(ref src_dir) => {
                        if Arc::ptr_eq(src_dir, dst_dir) {
                            return Ok(());
                        }
                    }
                }
                if !dst_dir.lock().is_empty() {
                    return Err(VolumeError::NotEmpty);
                }
            }
            Some(Node::File(_)) => {
                if let Node::Dir(_) = src_node {
                    return Err(VolumeError::NotDirectory);
                }
            }
            None => {}
        }

        let now = self.shared.now();

        if same_parent {
            let mut parent = src_parent.lock();
            parent.remove(&src_name);
            parent.remove(&dst_name);
            parent.insert(dst_name, src_node.clone());
            parent.times.mtim = now;
            parent.times.ctim = now;
        } else {
            // Lock both parents in address order.
            let src_first = Arc::as_ptr(&src_parent) < Arc::as_ptr(&dst_parent);
            let (mut first, mut second) = if src_first {
                (src_parent.lock(), dst_parent.lock())
            } else {
                (dst_parent.lock(), src_parent.lock())
            };
            let (src, dst) = if src_first {
                (&mut first, &mut second)
            } else {
                (&mut second, &mut first)
            };

            src.remove(&src_name);
            src.times.mtim = now;
            src.times.ctim = now;

            dst.remove(&dst_name);
            dst.insert(dst_name, src_node.clone());
            dst.times.mtim = now;
            dst.times.ctim = now;
        }

        self.set_node_times(&src_node, None, None);
        trace!("rename completed");

        Ok(())
    }

    // Embedder-facing byte-path API. Paths are absolute, `/`-separated,
    // without `.` or `..` components.

    /// Returns the metadata of the node at `path`.
    pub fn stat(&self, path: &[u8]) -> Result<Metadata, VolumeError> {
        let path = Self::components(path)?;
        self.stat_at(&self.root, &path)
    }

    /// Reads the full contents of the file at `path`.
    pub fn read_file(&self, path: &[u8]) -> Result<Vec<u8>, VolumeError> {
        let path = Self::components(path)?;
        self.read_file_at(&self.root, &path)
    }

    /// Replaces the contents of the file at `path`, creating it if needed.
    /// Missing parent directories are an error unless `create_parents`.
    pub fn write_file(
        &self,
        path: &[u8],
        bytes: impl Into<Vec<u8>>,
        create_parents: bool,
    ) -> Result<(), VolumeError> {
        let path = Self::components(path)?;
        self.install_file_at(&self.root, &path, bytes.into(), create_parents)
    }

    /// Creates the directory at `path`; with `recursive`, also creates
    /// missing parents and tolerates an existing directory.
    pub fn mkdir(&self, path: &[u8], recursive: bool) -> Result<(), VolumeError> {
        let path = Self::components(path)?;
        self.create_dir_at(&self.root, &path, recursive)
    }

    /// Lists the directory at `path` in insertion order.
    pub fn readdir(&self, path: &[u8]) -> Result<Vec<(Vec<u8>, Filetype)>, VolumeError> {
        let path = Self::components(path)?;
        let dir = self.lookup_dir_at(&self.root, &path)?;
        let entries = dir.lock().list();
        Ok(entries)
    }

    /// Removes the file at `path`.
    pub fn unlink(&self, path: &[u8]) -> Result<(), VolumeError> {
        let path = Self::components(path)?;
        self.unlink_at(&self.root, &path)
    }

    /// Removes the empty directory at `path`.
    pub fn rmdir(&self, path: &[u8]) -> Result<(), VolumeError> {
        let path = Self::components(path)?;
        self.remove_dir_at(&self.root, &path)
    }

    /// Renames `src` to `dst` with POSIX overwrite semantics.
    pub fn rename(&self, src: &[u8], dst: &[u8]) -> Result<(), VolumeError> {
        let src = Self::components(src)?;
        let dst = Self::components(dst)?;
        self.rename_at(&self.root, &src, &self.root, &dst)
    }

    /// Resizes the file at `path`, zero-filling on extension.
    pub fn truncate(&self, path: &[u8], size: u64) -> Result<(), VolumeError> {
        let path = Self::components(path)?;
        self.truncate_at(&self.root, &path, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_volume_has_root() {
        let volume = MemVolume::new();

        let meta = volume.stat(b"/").unwrap();
        assert_eq!(meta.filetype, Filetype::Directory);
        assert_eq!(meta.ino, 1);
    }

    #[test]
    fn write_and_read_back() {
        let volume = MemVolume::new();

        volume.write_file(b"/motd", &b"hello"[..], false).unwrap();
        assert_eq!(volume.read_file(b"/motd").unwrap(), b"hello");

        let meta = volume.stat(b"/motd").unwrap();
        assert_eq!(meta.filetype, Filetype::RegularFile);
        assert_eq!(meta.size, 5);
    }

    #[test]
    fn write_needs_parent() {
        let volume = MemVolume::new();

        assert_eq!(
            volume.write_file(b"/etc/motd", &b"x"[..], false),
            Err(VolumeError::NotFound)
        );

        volume.write_file(b"/etc/motd", &b"x"[..], true).unwrap();
        assert_eq!(volume.stat(b"/etc").unwrap().filetype, Filetype::Directory);
    }

    #[test]
    fn mkdir_non_recursive_needs_parent() {
        let volume = MemVolume::new();

        assert_eq!(volume.mkdir(b"/a/b", false), Err(VolumeError::NotFound));

        volume.mkdir(b"/a", false).unwrap();
        volume.mkdir(b"/a/b", false).unwrap();
        assert_eq!(volume.mkdir(b"/a/b", false), Err(VolumeError::AlreadyExists));
        volume.mkdir(b"/a/b", true).unwrap();
    }

    #[test]
    fn file_in_the_middle_is_notdir() {
        let volume = MemVolume::new();

        volume.write_file(b"/f", &b""[..], false).unwrap();
        assert_eq!(volume.mkdir(b"/f/sub", true), Err(VolumeError::NotDirectory));
        assert_eq!(volume.read_file(b"/f/x"), Err(VolumeError::NotDirectory));
    }

    #[test]
    fn readdir_keeps_insertion_order() {
        let volume = MemVolume::new();

        volume.mkdir(b"/d1", false).unwrap();
        volume.write_file(b"/f1", &b""[..], false).unwrap();
        volume.write_file(b"/f2", &b""[..], false).unwrap();

        let entries = volume.readdir(b"/").unwrap();
        let names: Vec<_> = entries.iter().map(|(name, _)| name.as_slice()).collect();
        assert_eq!(names, [&b"d1"[..], b"f1", b"f2"]);
        assert_eq!(entries[0].1, Filetype::Directory);
        assert_eq!(entries[1].1, Filetype::RegularFile);
    }

    #[test]
    fn readdir_is_stable_without_mutations() {
        let volume = MemVolume::new();

        volume.write_file(b"/a", &b""[..], false).unwrap();
        volume.write_file(b"/b", &b""[..], false).unwrap();

        assert_eq!(volume.readdir(b"/").unwrap(), volume.readdir(b"/").unwrap());
    }

    #[test]
    fn unlink_and_rmdir_enforce_kinds() {
        let volume = MemVolume::new();

        volume.mkdir(b"/d", false).unwrap();
        volume.write_file(b"/f", &b""[..], false).unwrap();

        assert_eq!(volume.unlink(b"/d"), Err(VolumeError::IsDirectory));
        assert_eq!(volume.rmdir(b"/f"), Err(VolumeError::NotDirectory));
        assert_eq!(volume.unlink(b"/missing"), Err(VolumeError::NotFound));

        volume.unlink(b"/f").unwrap();
        volume.rmdir(b"/d").unwrap();
        assert_eq!(volume.stat(b"/d"), Err(VolumeError::NotFound));
    }

    #[test]
    fn rmdir_rejects_populated_directory() {
        let volume = MemVolume::new();

        volume.mkdir(b"/d", false).unwrap();
        volume.write_file(b"/d/x", &b""[..], false).unwrap();

        assert_eq!(volume.rmdir(b"/d"), Err(VolumeError::NotEmpty));
        assert!(volume.stat(b"/d/x").is_ok());
    }

    #[test]
    fn rename_moves_and_overwrites_files() {
        let volume = MemVolume::new();

        volume.write_file(b"/a", &b"aaa"[..], false).unwrap();
        volume.write_file(b"/b", &b"bbb"[..], false).unwrap();

        volume.rename(b"/a", b"/b").unwrap();
        assert_eq!(volume.stat(b"/a"), Err(VolumeError::NotFound));
        assert_eq!(volume.read_file(b"/b").unwrap(), b"aaa");
    }

    #[test]
    fn rename_kind_mismatches() {
        let volume = MemVolume::new();

        volume.mkdir(b"/d", false).unwrap();
        volume.write_file(b"/f", &b""[..], false).unwrap();

        assert_eq!(volume.rename(b"/f", b"/d"), Err(VolumeError::IsDirectory));
        assert_eq!(volume.rename(b"/d", b"/f"), Err(VolumeError::NotDirectory));
    }

    #[test]
    fn rename_rejects_nonempty_target_dir() {
        let volume = MemVolume::new();

        volume.mkdir(b"/src", false).unwrap();
        volume.mkdir(b"/dst", false).unwrap();
        volume.write_file(b"/dst/keep", &b""[..], false).unwrap();

        assert_eq!(volume.rename(b"/src", b"/dst"), Err(VolumeError::NotEmpty));
    }

    #[test]
    fn rename_directory_carries_subtree() {
        let volume = MemVolume::new();

        volume.mkdir(b"/old", false).unwrap();
        volume.write_file(b"/old/x", &b"1"[..], false).unwrap();

        volume.rename(b"/old", b"/new").unwrap();
        assert_eq!(volume.read_file(b"/new/x").unwrap(), b"1");
        assert_eq!(volume.stat(b"/old"), Err(VolumeError::NotFound));
    }

    #[test]
    fn rename_into_own_subtree_is_rejected() {
        let volume = MemVolume::new();

        volume.mkdir(b"/d/sub", true).unwrap();
        assert_eq!(
            volume.rename(b"/d", b"/d/sub/d"),
            Err(VolumeError::InvalidPath)
        );
    }

    #[test]
    fn rename_is_invertible() {
        let volume = MemVolume::new();

        volume.write_file(b"/a", &b"payload"[..], false).unwrap();
        volume.rename(b"/a", b"/b").unwrap();
        volume.rename(b"/b", b"/a").unwrap();

        assert_eq!(volume.read_file(b"/a").unwrap(), b"payload");
        assert_eq!(volume.stat(b"/b"), Err(VolumeError::NotFound));
    }

    #[test]
    fn truncate_extends_with_zeros_and_shrinks() {
        let volume = MemVolume::new();

        volume.write_file(b"/f", &b"abc"[..], false).unwrap();

        volume.truncate(b"/f", 5).unwrap();
        assert_eq!(volume.read_file(b"/f").unwrap(), b"abc\0\0");

        volume.truncate(b"/f", 1).unwrap();
        assert_eq!(volume.read_file(b"/f").unwrap(), b"a");
    }

    #[test]
    fn inode_is_stable_and_unique() {
        let volume = MemVolume::new();

        volume.write_file(b"/a", &b""[..], false).unwrap();
        volume.write_file(b"/b", &b""[..], false).unwrap();

        let a = volume.stat(b"/a").unwrap();
        let b = volume.stat(b"/b").unwrap();
        assert_ne!(a.ino, b.ino);
        assert_eq!(a.ino, volume.stat(b"/a").unwrap().ino);
    }

    #[test]
    fn timestamps_advance_on_mutation() {
        let volume = MemVolume::new();

        volume.write_file(b"/f", &b"1"[..], false).unwrap();
        let before = volume.stat(b"/f").unwrap();

        volume.truncate(b"/f", 8).unwrap();
        let after = volume.stat(b"/f").unwrap();
        assert!(after.mtim > before.mtim);
    }

    #[test]
    fn unlinked_node_survives_through_reference() {
        let volume = MemVolume::new();

        volume.write_file(b"/f", &b"survivor"[..], false).unwrap();
        let node = volume
            .lookup_file_at(volume.root(), &[b"f".to_vec()])
            .unwrap();

        volume.unlink(b"/f").unwrap();
        assert_eq!(volume.stat(b"/f"), Err(VolumeError::NotFound));
        assert_eq!(node.lock().bytes, b"survivor");
    }

    #[test]
    fn readdir_cookies_are_monotone_across_deletions() {
        let volume = MemVolume::new();

        volume.write_file(b"/a", &b""[..], false).unwrap();
        volume.write_file(b"/b", &b""[..], false).unwrap();
        volume.unlink(b"/a").unwrap();
        volume.write_file(b"/c", &b""[..], false).unwrap();

        let root = volume.root().lock();
        let (first, name, _) = root.entry_at_or_after(0).unwrap();
        assert_eq!(name, b"b");
        let (second, name, _) = root.entry_at_or_after(first + 1).unwrap();
        assert_eq!(name, b"c");
        assert!(second > first);
        assert!(root.entry_at_or_after(second + 1).is_none());
    }

    #[test]
    fn dotted_paths_are_rejected() {
        let volume = MemVolume::new();

        assert_eq!(volume.stat(b"/a/../b"), Err(VolumeError::InvalidPath));
        assert_eq!(volume.stat(b"/./a"), Err(VolumeError::InvalidPath));
        assert_eq!(volume.stat(b"/a\0b"), Err(VolumeError::InvalidPath));
    }
}
