use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use clap::Parser;
use fatattr_core::{AttributeSet, FatError, FatattrConfig};

const LONG_OPTIONS: [&str; 4] = ["--recursive", "--verbose", "--help", "--version"];

/// Long options only. Attribute tokens and file operands never reach clap, so
/// odd file names such as `""` are passed through untouched.
#[derive(Parser, Debug)]
#[command(
    name = "fatattr",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Cli {
    /// If FILE is a directory, process it recursively
    #[arg(long)]
    recursive: bool,

    /// Print attribute changes
    #[arg(long)]
    verbose: bool,

    #[arg(long)]
    help: bool,

    #[arg(long)]
    version: bool,
}

/// What the command line asks for.
#[derive(Debug)]
pub enum Invocation {
    Help,
    Version,
    Run {
        config: FatattrConfig,
        files: Vec<PathBuf>,
    },
}

/// Tokens sorted out of argv before clap sees the rest.
#[derive(Debug, Default)]
struct Tokens {
    add: AttributeSet,
    remove: AttributeSet,
    options: Vec<OsString>,
    files: Vec<PathBuf>,
}

fn split_tokens(argv: Vec<OsString>) -> Result<Tokens, FatError> {
    let mut tokens = Tokens::default();
    let mut files_only = false;

    for arg in argv {
        if files_only {
            tokens.files.push(PathBuf::from(arg));
            continue;
        }
        let bytes = arg.as_encoded_bytes();
        let lead = bytes.first().copied();
        let terminator = bytes == b"--";
        let long = bytes.starts_with(b"--");
        match lead {
            Some(b'+') => tokens.add |= attribute_letters(&arg)?,
            Some(b'-') if terminator => files_only = true,
            Some(b'-') if long => {
                let known = arg.to_str().is_some_and(|s| LONG_OPTIONS.contains(&s));
                if !known {
                    return Err(FatError::InvalidOption {
                        arg: arg.to_string_lossy().into_owned(),
                    });
                }
                tokens.options.push(arg);
            }
            Some(b'-') => tokens.remove |= attribute_letters(&arg)?,
            _ => tokens.files.push(PathBuf::from(arg)),
        }
    }
    Ok(tokens)
}

/// Letters after the leading `+` or `-`.
fn attribute_letters(arg: &OsStr) -> Result<AttributeSet, FatError> {
    let text = arg.to_string_lossy();
    let letters = &text[1..];
    if letters.is_empty() {
        return Err(FatError::MissingAttribute {
            arg: text.into_owned(),
        });
    }
    letters.chars().try_fold(AttributeSet::empty(), |acc, letter| {
        AttributeSet::from_letter(letter)
            .map(|bit| acc | bit)
            .ok_or_else(|| FatError::InvalidAttribute {
                letter,
                arg: text.to_string(),
            })
    })
}

/// Parse argv (without the program name).
///
/// Checks run in a fixed order: token errors, `--help`, `--version`, missing
/// files, overlapping changes.
pub fn parse(argv: Vec<OsString>) -> anyhow::Result<Invocation> {
    let tokens = split_tokens(argv)?;
    let cli = Cli::try_parse_from(
        std::iter::once(OsString::from("fatattr")).chain(tokens.options),
    )?;

    if cli.help {
        return Ok(Invocation::Help);
    }
    if cli.version {
        return Ok(Invocation::Version);
    }

    let files = tokens.files;
    if files.is_empty() {
        return Err(FatError::NoFiles.into());
    }

    let config = FatattrConfig::builder()
        .add(tokens.add)
        .remove(tokens.remove)
        .recursive(cli.recursive)
        .verbose(cli.verbose)
        .build()?;
    Ok(Invocation::Run { config, files })
}
