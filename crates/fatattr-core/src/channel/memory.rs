//! In-memory FAT volume.
//!
//! Behaves like the VFAT driver for the calls the channel makes: dual-entry
//! directory reads that start with `.` and `..`, and attribute writes that
//! merge the forced bits back in. DIRECTORY follows the node kind and a set
//! VOLUME_LABEL bit stays set, so clearing either is a silent no-op. Faults
//! can be injected per path.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{DirectoryEntry, FatBackend};
use crate::attributes::AttributeSet;

/// A kernel call that should fail for a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Open,
    GetAttributes,
    SetAttributes,
    /// Every directory read fails.
    ReadDir,
    /// Directory reads fail once this many entries have been returned.
    ReadDirAfter(usize),
    Release,
}

#[derive(Debug)]
struct Node {
    entry: DirectoryEntry,
    attrs: AttributeSet,
    /// Child paths in directory order. Only meaningful for directories.
    children: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct Volume {
    nodes: HashMap<PathBuf, Node>,
    faults: HashMap<PathBuf, Vec<Fault>>,
}

impl Volume {
    fn has_fault(&self, path: &Path, matches: impl Fn(Fault) -> bool) -> bool {
        self.faults
            .get(path)
            .is_some_and(|faults| faults.iter().copied().any(matches))
    }
}

/// Descriptor handed out by [`MemoryBackend::open`].
#[derive(Debug)]
pub struct MemoryDescriptor {
    path: PathBuf,
    cursor: Cell<usize>,
}

/// In-memory stand-in for a mounted FAT filesystem.
#[derive(Debug)]
pub struct MemoryBackend {
    volume: RefCell<Volume>,
    writes: Cell<usize>,
    releases: Cell<usize>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// An empty volume with only the root directory `/`.
    pub fn new() -> Self {
        let mut volume = Volume::default();
        volume.nodes.insert(
            PathBuf::from("/"),
            Node {
                entry: DirectoryEntry::new("/", ""),
                attrs: AttributeSet::DIRECTORY,
                children: Vec::new(),
            },
        );
        Self {
            volume: RefCell::new(volume),
            writes: Cell::new(0),
            releases: Cell::new(0),
        }
    }

    /// Add a directory. Its short name is the last path component.
    pub fn add_dir(&self, path: impl AsRef<Path>, attrs: AttributeSet) {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.insert(path, DirectoryEntry::new(name, ""), attrs | AttributeSet::DIRECTORY);
    }

    /// Add a file with explicit short and long names. Pass `""` as the long
    /// name for entries that only have an 8.3 name.
    pub fn add_file(&self, path: impl AsRef<Path>, short_name: &str, long_name: &str, attrs: AttributeSet) {
        self.insert(
            path.as_ref(),
            DirectoryEntry::new(short_name, long_name),
            attrs.difference(AttributeSet::DIRECTORY),
        );
    }

    fn insert(&self, path: &Path, entry: DirectoryEntry, attrs: AttributeSet) {
        let path = normalize(path);
        let mut volume = self.volume.borrow_mut();
        if let Some(parent) = path.parent() {
            if let Some(node) = volume.nodes.get_mut(parent) {
                node.children.push(path.clone());
            }
        }
        volume.nodes.insert(
            path,
            Node {
                entry,
                attrs,
                children: Vec::new(),
            },
        );
    }

    /// Make the given kernel call fail for `path` from now on.
    pub fn inject(&self, path: impl AsRef<Path>, fault: Fault) {
        self.volume
            .borrow_mut()
            .faults
            .entry(normalize(path.as_ref()))
            .or_default()
            .push(fault);
    }

    /// Current attributes of `path`, bypassing the fault table.
    pub fn attributes(&self, path: impl AsRef<Path>) -> Option<AttributeSet> {
        self.volume
            .borrow()
            .nodes
            .get(&normalize(path.as_ref()))
            .map(|node| node.attrs)
    }

    /// Number of successful attribute writes.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Number of descriptor releases, failed ones included.
    pub fn releases(&self) -> usize {
        self.releases.get()
    }
}

impl FatBackend for MemoryBackend {
    type Descriptor = MemoryDescriptor;

    fn open(&self, path: &Path) -> io::Result<MemoryDescriptor> {
        let path = normalize(path);
        let volume = self.volume.borrow();
        if volume.has_fault(&path, |f| f == Fault::Open) {
            return Err(io::Error::from_raw_os_error(libc::EACCES));
        }
        if !volume.nodes.contains_key(&path) {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        Ok(MemoryDescriptor {
            path,
            cursor: Cell::new(0),
        })
    }

    fn release(&self, fd: MemoryDescriptor) -> io::Result<()> {
        self.releases.set(self.releases.get() + 1);
        if self.volume.borrow().has_fault(&fd.path, |f| f == Fault::Release) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(())
    }

    fn get_attributes(&self, fd: &MemoryDescriptor) -> io::Result<u32> {
        let volume = self.volume.borrow();
        if volume.has_fault(&fd.path, |f| f == Fault::GetAttributes) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        volume
            .nodes
            .get(&fd.path)
            .map(|node| node.attrs.bits())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }

    fn set_attributes(&self, fd: &MemoryDescriptor, attrs: u32) -> io::Result<()> {
        let mut volume = self.volume.borrow_mut();
        if volume.has_fault(&fd.path, |f| f == Fault::SetAttributes) {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        let node = volume
            .nodes
            .get_mut(&fd.path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        let forced = node
            .attrs
            .intersection(AttributeSet::DIRECTORY | AttributeSet::VOLUME_LABEL);
        node.attrs = AttributeSet::from_raw(attrs).difference(AttributeSet::DIRECTORY) | forced;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn read_dir_both(&self, fd: &MemoryDescriptor) -> io::Result<Option<DirectoryEntry>> {
        let volume = self.volume.borrow();
        let index = fd.cursor.get();
        let failing = volume.has_fault(&fd.path, |f| match f {
            Fault::ReadDir => true,
            Fault::ReadDirAfter(n) => index >= n,
            _ => false,
        });
        if failing {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        let node = volume
            .nodes
            .get(&fd.path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        if !node.attrs.is_directory() {
            return Err(io::Error::from_raw_os_error(libc::ENOTDIR));
        }

        let entry = match index {
            0 => Some(DirectoryEntry::new(".", "")),
            1 => Some(DirectoryEntry::new("..", "")),
            i => node
                .children
                .get(i - 2)
                .and_then(|child| volume.nodes.get(child))
                .map(|child| child.entry.clone()),
        };
        if entry.is_some() {
            fd.cursor.set(index + 1);
        }
        Ok(entry)
    }
}

/// Resolve `.` and `..` the way the kernel does on lookup.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(name) => out.push(name),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}
