//! Inspect and modify DOS/FAT attribute bits through the kernel FAT driver.
//!
//! [`AttributeChannel`] wraps the driver's get/set/readdir primitives behind a
//! [`FatBackend`]; [`Orchestrator`] walks a list of paths and prints or
//! changes their attributes, optionally recursing into directories.

pub mod attributes;
pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;

pub use attributes::AttributeSet;
pub use channel::{AttributeChannel, DirectoryEntry, FatBackend, FileHandle};
pub use config::{FatattrConfig, RunMode};
pub use error::{FatError, Result};
pub use orchestrator::{BatchReport, Orchestrator};

#[cfg(target_os = "linux")]
pub use channel::vfat::VfatBackend;
