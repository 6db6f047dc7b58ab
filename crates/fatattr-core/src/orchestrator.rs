//! Per-path print/modify state machines and the batch loop over them.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::channel::{AttributeChannel, FatBackend, FileHandle};
use crate::config::{FatattrConfig, RunMode};
use crate::error::{FatError, Result};

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Top-level paths processed.
    pub processed: usize,
    /// Top-level paths that failed.
    pub failed: usize,
    /// Exit code of the last top-level path; 0 if it succeeded.
    ///
    /// Earlier failures do not show up here. Scripts rely on this, so it is
    /// kept as is.
    pub last_status: i32,
}

/// Walks paths and applies the configured print or modify policy.
pub struct Orchestrator<'a, B: FatBackend> {
    channel: &'a AttributeChannel<B>,
    config: &'a FatattrConfig,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
}

impl<'a, B: FatBackend> Orchestrator<'a, B> {
    pub fn new(
        channel: &'a AttributeChannel<B>,
        config: &'a FatattrConfig,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
    ) -> Self {
        Self {
            channel,
            config,
            out,
            err,
        }
    }

    /// Process every top-level path, reporting failures without stopping.
    pub fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchReport {
        let descend = self.config.top_level_descent();
        let mut report = BatchReport::default();

        for path in paths {
            let path = path.as_ref();
            report.processed += 1;
            report.last_status = match self.process_path(path, descend) {
                Ok(()) => 0,
                Err(e) => {
                    report.failed += 1;
                    self.report_error(path, &e);
                    e.exit_code()
                }
            };
        }

        info!(
            mode = ?self.config.mode(),
            processed = report.processed,
            failed = report.failed,
            "batch finished"
        );
        report
    }

    /// Run the state machine for one path. The handle is always closed
    /// before returning.
    pub fn process_path(&mut self, path: &Path, descend: bool) -> Result<()> {
        let mut handle = self.channel.open(path)?;
        let result = match self.config.mode() {
            RunMode::Print => self.print_open(&mut handle, descend),
            RunMode::Modify => self.modify_open(&mut handle, descend),
        };
        self.channel.close(&mut handle);
        result
    }

    fn print_open(&mut self, handle: &mut FileHandle<B::Descriptor>, descend: bool) -> Result<()> {
        let attrs = self.channel.get_attributes(handle)?;
        writeln!(self.out, "{attrs}  {}", handle.path().display())?;
        if attrs.is_directory() && descend {
            self.drain(handle);
        }
        Ok(())
    }

    fn modify_open(&mut self, handle: &mut FileHandle<B::Descriptor>, descend: bool) -> Result<()> {
        let add = self.config.attrs_to_add;
        let remove = self.config.attrs_to_remove;

        let before = self.channel.get_attributes(handle)?;
        if !add.is_empty() && !before.contains(add) {
            self.channel.add_attributes(handle, add)?;
        }
        if !remove.is_empty() && before.intersects(remove) {
            self.channel.remove_attributes(handle, remove)?;
        }
        let after = self.channel.get_attributes(handle)?;
        debug!(path = %handle.path().display(), %before, %after, "modified");

        if self.config.verbose {
            writeln!(self.out, "{before} => {after}  {}", handle.path().display())?;
        }
        if after.is_directory() && descend {
            self.drain(handle);
        }
        Ok(())
    }

    /// Pull every entry from an open directory and process it as a child.
    ///
    /// Errors here are reported and never change the directory's own result.
    /// A name that does not fit `max_name_len` is reported and the drain moves
    /// on to the next entry, since the kernel cursor has already advanced. A
    /// failed read ends the drain.
    fn drain(&mut self, handle: &mut FileHandle<B::Descriptor>) {
        let dir = handle.path().to_path_buf();
        loop {
            match self.channel.read_directory_entry(handle, self.config.max_name_len) {
                Ok(Some(name)) => {
                    let child = child_path(&dir, &name);
                    let descend = self.config.recursive && name != "." && name != "..";
                    if let Err(e) = self.process_path(&child, descend) {
                        self.report_error(&child, &e);
                    }
                }
                Ok(None) => break,
                Err(e @ FatError::NameTooLong { .. }) => self.report_error(&dir, &e),
                Err(e) => {
                    self.report_error(&dir, &e);
                    break;
                }
            }
        }
    }

    fn report_error(&mut self, path: &Path, e: &FatError) {
        debug!(path = %path.display(), error = %e, "path failed");
        // Nothing sensible is left to do if the diagnostic stream is gone.
        let _ = writeln!(
            self.err,
            "Error processing file '{}': {e}",
            path.display()
        );
    }
}

/// `parent + "/" + name`, as printed.
fn child_path(parent: &Path, name: &OsStr) -> PathBuf {
    let mut joined = parent.as_os_str().to_os_string();
    joined.push("/");
    joined.push(name);
    PathBuf::from(joined)
}
