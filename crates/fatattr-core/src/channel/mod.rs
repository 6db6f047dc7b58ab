//! Attribute channel: file handles, attribute queries/updates and directory
//! iteration on top of a [`FatBackend`].

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
#[cfg(target_os = "linux")]
pub mod vfat;

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::attributes::AttributeSet;
use crate::error::{FatError, Result};

/// One record of a dual-entry directory read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// 8.3 name.
    pub short_name: OsString,
    /// Long name; empty when the entry only has a short name.
    pub long_name: OsString,
}

impl DirectoryEntry {
    pub fn new(short_name: impl Into<OsString>, long_name: impl Into<OsString>) -> Self {
        Self {
            short_name: short_name.into(),
            long_name: long_name.into(),
        }
    }

    /// The user-facing name: the long name when present.
    pub fn name(&self) -> &OsStr {
        if self.long_name.is_empty() {
            &self.short_name
        } else {
            &self.long_name
        }
    }
}

/// Kernel primitives a FAT driver exposes.
///
/// Every call is a single blocking round-trip; the channel decides what a
/// failure means.
pub trait FatBackend {
    /// Open descriptor; it also carries the kernel's directory cursor.
    type Descriptor;

    /// Open a file or directory without requiring write access to its contents.
    fn open(&self, path: &Path) -> io::Result<Self::Descriptor>;

    fn release(&self, fd: Self::Descriptor) -> io::Result<()>;

    fn get_attributes(&self, fd: &Self::Descriptor) -> io::Result<u32>;

    fn set_attributes(&self, fd: &Self::Descriptor, attrs: u32) -> io::Result<()>;

    /// Advance the directory cursor by one entry. `None` once exhausted.
    fn read_dir_both(&self, fd: &Self::Descriptor) -> io::Result<Option<DirectoryEntry>>;
}

/// An open path, exclusively owned by whoever opened it.
///
/// The descriptor is taken out on release, so closing twice is harmless.
#[derive(Debug)]
pub struct FileHandle<D> {
    path: PathBuf,
    fd: Option<D>,
}

impl<D> FileHandle<D> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn descriptor(&self) -> Result<&D> {
        self.fd.as_ref().ok_or(FatError::HandleReleased)
    }
}

/// Attribute access over a backend.
pub struct AttributeChannel<B> {
    backend: B,
}

impl<B: FatBackend> AttributeChannel<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn open(&self, path: &Path) -> Result<FileHandle<B::Descriptor>> {
        let fd = self.backend.open(path).map_err(FatError::Open)?;
        debug!(path = %path.display(), "opened");
        Ok(FileHandle {
            path: path.to_path_buf(),
            fd: Some(fd),
        })
    }

    /// Release the handle. Never fails; release errors are only logged.
    pub fn close(&self, handle: &mut FileHandle<B::Descriptor>) {
        let Some(fd) = handle.fd.take() else {
            return;
        };
        match self.backend.release(fd) {
            Ok(()) => debug!(path = %handle.path.display(), "closed"),
            Err(e) => warn!(path = %handle.path.display(), error = %e, "release failed"),
        }
    }

    pub fn get_attributes(&self, handle: &FileHandle<B::Descriptor>) -> Result<AttributeSet> {
        let fd = handle.descriptor()?;
        let raw = self
            .backend
            .get_attributes(fd)
            .map_err(FatError::GetAttributes)?;
        Ok(AttributeSet::from_raw(raw))
    }

    /// Set `attrs` on top of the current attributes.
    pub fn add_attributes(
        &self,
        handle: &FileHandle<B::Descriptor>,
        attrs: AttributeSet,
    ) -> Result<()> {
        self.rewrite(handle, |current| current | attrs)
    }

    /// Clear `attrs` from the current attributes.
    pub fn remove_attributes(
        &self,
        handle: &FileHandle<B::Descriptor>,
        attrs: AttributeSet,
    ) -> Result<()> {
        self.rewrite(handle, |current| current.difference(attrs))
    }

    // The driver only takes whole attribute words, so every change is a
    // read followed by a write.
    fn rewrite(
        &self,
        handle: &FileHandle<B::Descriptor>,
        change: impl FnOnce(AttributeSet) -> AttributeSet,
    ) -> Result<()> {
        let current = self.get_attributes(handle)?;
        let updated = change(current);
        let fd = handle.descriptor()?;
        self.backend
            .set_attributes(fd, updated.bits())
            .map_err(FatError::SetAttributes)?;
        debug!(
            path = %handle.path.display(),
            before = %current,
            after = %updated,
            "attributes written"
        );
        Ok(())
    }

    /// Read the next directory entry name.
    ///
    /// Returns `Ok(None)` once the directory is drained. A name of
    /// `max_name_len` bytes or more is an error rather than being truncated.
    /// A failed kernel read releases the handle.
    pub fn read_directory_entry(
        &self,
        handle: &mut FileHandle<B::Descriptor>,
        max_name_len: usize,
    ) -> Result<Option<OsString>> {
        let fd = handle.descriptor()?;
        let entry = match self.backend.read_dir_both(fd) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.close(handle);
                return Err(FatError::ReadDir(e));
            }
        };

        let name = entry.name();
        if name.is_empty() {
            return Ok(None);
        }
        if name.len() >= max_name_len {
            return Err(FatError::NameTooLong {
                len: name.len(),
                max: max_name_len,
            });
        }
        Ok(Some(name.to_os_string()))
    }
}
