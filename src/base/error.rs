use crate::command::Command;
use std::error;
use std::fmt;
use std::io;

/// Represents errors that can occur while building commands, validating responses
/// or talking to the flow bench controller.
#[derive(Debug)]
pub enum Error {
    /// The identifier is outside the printable range or not in the allowed command set.
    UnsupportedIdentifier(u8),

    /// A response was built without the command it answers.
    NullCommand,

    /// A response was built without any data buffer.
    NullData,

    /// A response was built from a zero-length data buffer.
    EmptyData,

    /// The controller set the failure bit while executing `command`.
    CommandFailed { command: Command },

    /// The response identifier does not match the command that produced it.
    IdentifierMismatch { expected: u8, actual: u8 },

    /// The checksum trailer does not match the additive checksum of the preceding bytes.
    InvalidChecksum { expected: u8, actual: u8 },

    /// The response length does not match the fixed layout of its variant.
    InvalidLength { expected: usize, actual: usize },

    /// The execution of operation is timed out.
    OperationTimeout,

    /// The decoding data is invalid according to current protocol. Contains a description of the protocol error.
    ProtocolError { description: String },

    /// The buffer provided is too small for message encoding.
    BufferTooSmall,

    /// An I/O error occurred while communicating with the underlying stream (e.g., serial port).
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedIdentifier(id) => {
                write!(f, "unsupported command identifier: 0x{:02X}", id)
            }
            Error::NullCommand => write!(f, "response has no command"),
            Error::NullData => write!(f, "response has no data"),
            Error::EmptyData => write!(f, "empty response not supported"),
            Error::CommandFailed { command } => {
                write!(f, "command '{}' failed to execute on the controller", command)
            }
            Error::IdentifierMismatch { expected, actual } => write!(
                f,
                "invalid response identifier: expected 0x{:02X}, got 0x{:02X}",
                expected, actual
            ),
            Error::InvalidChecksum { expected, actual } => write!(
                f,
                "invalid checksum: expected 0x{:02X}, got 0x{:02X}",
                expected, actual
            ),
            Error::InvalidLength { expected, actual } => write!(
                f,
                "invalid response length: expected {} bytes, got {}",
                expected, actual
            ),
            Error::OperationTimeout => write!(f, "operation timeout"),
            Error::ProtocolError { description } => write!(f, "protocol error: {}", description),
            Error::BufferTooSmall => write!(f, "buffer is too small for message encoding"),
            Error::IoError(err) => write!(f, "io error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

/// A specialized `Result` type for flow bench operations.
pub type Result<T> = std::result::Result<T, Error>;
