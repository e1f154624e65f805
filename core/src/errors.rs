//! Unified error types for the flashwire core crate.
//!
//! Automation callers match on the literal condition strings (the same
//! wording the device tooling has always reported), so every `FileError`
//! variant's `Display` output is the exact message, with no prefix added
//! by the umbrella type.

use thiserror::Error;

/// Top-level error type encompassing all core error categories.
///
/// Wrapping is transparent: the caller always sees the exact condition
/// string of the underlying error.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A file-operation precondition was violated.
    #[error(transparent)]
    File(#[from] FileError),

    /// The device's directory listing did not match the expected shape.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The CLI transport failed while sending a command.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A low-level I/O error while staging or retrieving file content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation failures for flash file operations.
///
/// Each variant is raised before any device interaction and carries the
/// literal message the reference tooling asserts on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// The named file is not present in the current inventory.
    #[error("file {0} does not exist")]
    NotFound(String),

    /// A create targeted a name that is already present.
    #[error("file {0} is already existing")]
    AlreadyExists(String),

    /// An update's rename target collides with an existing file.
    #[error("file {0} cannot be overwritten")]
    CannotOverwrite(String),

    /// A create supplied both a source file name and inline text.
    #[error("cannot have both source device file name and host string not empty")]
    CreateSourceConflict,

    /// An update supplied neither a host file name nor inline text.
    #[error("cannot have both host file name and host string empty")]
    UpdateSourceMissing,

    /// An update supplied both a host file name and inline text.
    #[error("cannot have both host file name and host string not empty")]
    UpdateSourceConflict,

    /// A transfer server was given without a resolvable remote object name.
    #[error("remote file name missing")]
    RemoteNameMissing,

    /// The requested transfer protocol is not implemented.
    #[error("protocol {0} not supported")]
    ProtocolUnsupported(String),
}

/// Failures while parsing the device's directory-listing text.
///
/// Fatal to the refresh that issued the listing; the previous inventory
/// state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `Directory of ...` banner line was found.
    #[error("directory listing banner missing")]
    MissingBanner,

    /// A listing row did not have the expected column count.
    #[error("malformed listing row: {0}")]
    MalformedRow(String),

    /// A size column held neither a number nor the `--` placeholder.
    #[error("invalid size field '{0}'")]
    InvalidSize(String),

    /// The modification columns did not parse as a date and time.
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// The total/free flash summary trailer was missing.
    #[error("flash size summary missing")]
    MissingSummary,
}

/// Errors reported by the CLI transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The device session was closed underneath us.
    #[error("connection closed: {0}")]
    Closed(String),

    /// The device did not answer within the transport's deadline.
    #[error("read timeout: {0}")]
    Timeout(String),

    /// The emulator received a command its script does not cover.
    #[error("unscripted command in state {state}: {command}")]
    Unscripted { state: u32, command: String },

    /// A low-level I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
