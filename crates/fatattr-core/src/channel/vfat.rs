//! Linux VFAT driver backend (`linux/msdos_fs.h` ioctls).

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::ffi::OsStringExt;
use std::path::Path;

use tracing::debug;

use super::{DirectoryEntry, FatBackend};

/// `struct __fat_dirent`.
#[repr(C)]
struct FatDirent {
    d_ino: libc::c_long,
    d_off: libc::c_long,
    d_reclen: libc::c_ushort,
    d_name: [libc::c_char; 256],
}

// Generic `_IOC` layout (x86, arm, riscv).
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | ((ty as u32) << 8) | nr as u32
}

const VFAT_IOCTL_READDIR_BOTH: u32 =
    ioc(IOC_READ, b'r', 1, std::mem::size_of::<[FatDirent; 2]>());
const FAT_IOCTL_GET_ATTRIBUTES: u32 = ioc(IOC_READ, b'r', 0x10, std::mem::size_of::<u32>());
const FAT_IOCTL_SET_ATTRIBUTES: u32 = ioc(IOC_WRITE, b'r', 0x11, std::mem::size_of::<u32>());

/// Talks to the kernel FAT driver through ioctls on plain file descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct VfatBackend;

impl FatBackend for VfatBackend {
    type Descriptor = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        // Read-only opens work for directories too and still allow the
        // attribute ioctls.
        OpenOptions::new().read(true).open(path)
    }

    fn release(&self, fd: File) -> io::Result<()> {
        let raw = fd.into_raw_fd();
        // SAFETY: `raw` came from `into_raw_fd`, so nothing else owns it.
        if unsafe { libc::close(raw) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn get_attributes(&self, fd: &File) -> io::Result<u32> {
        let mut attrs: u32 = 0;
        // SAFETY: the request reads a single u32 into `attrs`.
        let ret = unsafe {
            libc::ioctl(
                fd.as_raw_fd(),
                FAT_IOCTL_GET_ATTRIBUTES as _,
                &mut attrs as *mut u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(attrs)
    }

    fn set_attributes(&self, fd: &File, attrs: u32) -> io::Result<()> {
        // SAFETY: the request reads a single u32 from `attrs`.
        let ret = unsafe {
            libc::ioctl(
                fd.as_raw_fd(),
                FAT_IOCTL_SET_ATTRIBUTES as _,
                &attrs as *const u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read_dir_both(&self, fd: &File) -> io::Result<Option<DirectoryEntry>> {
        // SAFETY: `FatDirent` is plain old data; all-zero is a valid value.
        let mut dirents: [FatDirent; 2] = unsafe { std::mem::zeroed() };
        // SAFETY: the buffer is exactly the two dirents the request writes.
        let ret = unsafe {
            libc::ioctl(
                fd.as_raw_fd(),
                VFAT_IOCTL_READDIR_BOTH as _,
                dirents.as_mut_ptr(),
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        if ret == 0 {
            return Ok(None);
        }
        let [short, long] = &dirents;
        debug!(
            ino = short.d_ino,
            off = short.d_off,
            reclen = short.d_reclen,
            "dirent read"
        );
        Ok(Some(DirectoryEntry {
            short_name: dirent_name(short),
            long_name: dirent_name(long),
        }))
    }
}

fn dirent_name(dirent: &FatDirent) -> OsString {
    let bytes: Vec<u8> = dirent
        .d_name
        .iter()
        .map(|&c| c as u8)
        .take_while(|&b| b != 0)
        .collect();
    OsString::from_vec(bytes)
}
