#[cfg(not(target_os = "linux"))]
compile_error!("fatattr talks to the Linux VFAT driver and only builds on Linux");

mod args;
mod usage;

use std::ffi::OsString;
use std::io::{self, Write};

use anyhow::Context;
use fatattr_core::{AttributeChannel, FatBackend, FatError, Orchestrator, VfatBackend};
use tracing::debug;

use args::Invocation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let channel = AttributeChannel::new(VfatBackend);
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let code = match run(std::env::args_os().skip(1).collect(), &channel, &mut out, &mut err) {
        Ok(code) => code,
        Err(e) => {
            let _ = writeln!(err, "Error: {e:#}");
            1
        }
    };
    let _ = out.flush();
    std::process::exit(code);
}

/// Returns the process exit status.
fn run<B: FatBackend>(
    argv: Vec<OsString>,
    channel: &AttributeChannel<B>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> anyhow::Result<i32> {
    if argv.is_empty() {
        usage::write_help(out)?;
        out.flush()?;
        return Ok(0);
    }

    let invocation = match args::parse(argv) {
        Ok(invocation) => invocation,
        Err(e) => {
            writeln!(err, "Error processing arguments: {e}")?;
            if matches!(e.downcast_ref::<FatError>(), Some(FatError::NoFiles)) {
                usage::write_help(out)?;
                out.flush()?;
            }
            return Ok(1);
        }
    };

    match invocation {
        Invocation::Help => usage::write_help(out)?,
        Invocation::Version => usage::write_version(out)?,
        Invocation::Run { config, files } => {
            debug!(
                mode = ?config.mode(),
                add = %config.attrs_to_add,
                remove = %config.attrs_to_remove,
                recursive = config.recursive,
                files = files.len(),
                "starting"
            );
            let report = Orchestrator::new(channel, &config, out, err).run(&files[..]);
            out.flush().context("flushing output")?;
            return Ok(report.last_status);
        }
    }
    out.flush()?;
    Ok(0)
}
