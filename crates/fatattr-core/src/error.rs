use std::io;

/// All errors produced by fatattr-core.
///
/// Path-scoped failures carry the OS error but not the path; the orchestrator
/// prefixes the offending path when it reports them.
#[derive(Debug, thiserror::Error)]
pub enum FatError {
    #[error("Error opening file: {0}")]
    Open(#[source] io::Error),

    #[error("Error in ioctl call 'FAT_IOCTL_GET_ATTRIBUTES': {0}")]
    GetAttributes(#[source] io::Error),

    #[error("Error in ioctl call 'FAT_IOCTL_SET_ATTRIBUTES': {0}")]
    SetAttributes(#[source] io::Error),

    #[error("Error in ioctl call 'VFAT_IOCTL_READDIR_BOTH': {0}")]
    ReadDir(#[source] io::Error),

    #[error("The entry name is bigger than the read buffer")]
    NameTooLong { len: usize, max: usize },

    #[error("File handle was already released")]
    HandleReleased,

    #[error("Error writing output: {0}")]
    Output(#[from] io::Error),

    #[error("Overlapping attribute changes")]
    OverlappingChanges,

    #[error("No file(s) specified")]
    NoFiles,

    #[error("Missing attribute in argument '{arg}'")]
    MissingAttribute { arg: String },

    #[error("Invalid attribute '{letter}' in '{arg}'")]
    InvalidAttribute { letter: char, arg: String },

    #[error("Invalid option '{arg}'")]
    InvalidOption { arg: String },
}

impl FatError {
    /// Raw process status for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Open(_) => 1,
            Self::GetAttributes(_) => 2,
            Self::SetAttributes(_) => 3,
            Self::ReadDir(_) | Self::HandleReleased => 4,
            Self::NameTooLong { .. } => 5,
            Self::Output(_)
            | Self::OverlappingChanges
            | Self::NoFiles
            | Self::MissingAttribute { .. }
            | Self::InvalidAttribute { .. }
            | Self::InvalidOption { .. } => 1,
        }
    }

    /// Errors raised while validating the invocation, before any file I/O.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::OverlappingChanges
                | Self::NoFiles
                | Self::MissingAttribute { .. }
                | Self::InvalidAttribute { .. }
                | Self::InvalidOption { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FatError>;
