use std::{error, fmt, io};

use crate::constants::IFNAMSIZ;

/// Error that occurs when creating CAN frames
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// CAN ID was outside the range of valid IDs
    IdTooLarge(u32),
    /// More than 8 Bytes of payload data were passed in
    TooMuchData(usize),
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConstructionError::IdTooLarge(id) => write!(f, "CAN ID {:#X} too large", id),
            ConstructionError::TooMuchData(len) => {
                write!(f, "payload of {} bytes is larger than CAN maximum of 8 bytes", len)
            }
        }
    }
}

impl error::Error for ConstructionError {}

/// Reasons an interface name is refused before it reaches the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    /// Name does not fit into `IFNAMSIZ` bytes including the terminator.
    TooLong(usize),
    /// `.` and `..`
    Reserved,
    InvalidCharacter(char),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NameError::Empty => write!(f, "interface name is empty"),
            NameError::TooLong(len) => write!(
                f,
                "interface name is {} bytes, at most {} are allowed",
                len,
                IFNAMSIZ - 1
            ),
            NameError::Reserved => write!(f, "interface name is reserved"),
            NameError::InvalidCharacter(c) => {
                write!(f, "interface name contains invalid character {:?}", c)
            }
        }
    }
}

impl error::Error for NameError {}

/// Errors opening a session
#[derive(Debug)]
pub enum OpenError {
    /// The interface name failed validation
    InvalidInterfaceName(NameError),

    /// The raw CAN socket could not be created (CAN subsystem missing, out
    /// of descriptors, ...)
    SocketCreationFailed(io::Error),

    /// Device could not be found
    InterfaceNotFound {
        interface: String,
        source: nix::Error,
    },

    /// The socket could not be bound to the interface
    BindFailed(io::Error),

    /// A socket option from `SessionOptions` could not be applied
    SocketOptionFailed(io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            OpenError::InvalidInterfaceName(ref e) => write!(f, "invalid interface name: {}", e),
            OpenError::SocketCreationFailed(ref e) => write!(f, "socket creation failed: {}", e),
            OpenError::InterfaceNotFound {
                ref interface,
                ref source,
            } => write!(f, "CAN device {} not found: {}", interface, source),
            OpenError::BindFailed(ref e) => write!(f, "bind failed: {}", e),
            OpenError::SocketOptionFailed(ref e) => write!(f, "setting socket option failed: {}", e),
        }
    }
}

impl error::Error for OpenError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            OpenError::InvalidInterfaceName(ref e) => Some(e),
            OpenError::SocketCreationFailed(ref e) => Some(e),
            OpenError::InterfaceNotFound { ref source, .. } => Some(source),
            OpenError::BindFailed(ref e) => Some(e),
            OpenError::SocketOptionFailed(ref e) => Some(e),
        }
    }
}

impl From<NameError> for OpenError {
    fn from(e: NameError) -> OpenError {
        OpenError::InvalidInterfaceName(e)
    }
}

/// Errors sending a payload
#[derive(Debug)]
pub enum SendError {
    /// The payload could not be turned into frames; nothing was sent.
    InvalidFrame(ConstructionError),

    /// Writing a frame failed. Frames after the failing one were not
    /// attempted; `bytes_written` counts the payload bytes of the frames
    /// that did go out.
    WriteFailed {
        bytes_written: usize,
        source: io::Error,
    },
}

impl SendError {
    /// Payload bytes transmitted before the failure.
    pub fn bytes_written(&self) -> usize {
        match *self {
            SendError::InvalidFrame(_) => 0,
            SendError::WriteFailed { bytes_written, .. } => bytes_written,
        }
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SendError::InvalidFrame(ref e) => write!(f, "invalid frame: {}", e),
            SendError::WriteFailed {
                bytes_written,
                ref source,
            } => write!(f, "write failed after {} bytes: {}", bytes_written, source),
        }
    }
}

impl error::Error for SendError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            SendError::InvalidFrame(ref e) => Some(e),
            SendError::WriteFailed { ref source, .. } => Some(source),
        }
    }
}

impl From<ConstructionError> for SendError {
    fn from(e: ConstructionError) -> SendError {
        SendError::InvalidFrame(e)
    }
}

/// Errors reading a frame
#[derive(Debug)]
pub enum ReadError {
    /// The socket reported an error, or the read timeout expired
    Io(io::Error),

    /// The kernel handed back fewer bytes than one `struct can_frame`
    ShortRead(usize),

    /// A full-size frame arrived with a data length code above 8
    Malformed(ConstructionError),

    /// The session was closed through a `CloseHandle`
    Closed,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ReadError::Io(ref e) => write!(f, "read failed: {}", e),
            ReadError::ShortRead(n) => write!(f, "short read of {} bytes", n),
            ReadError::Malformed(ref e) => write!(f, "malformed frame: {}", e),
            ReadError::Closed => write!(f, "session closed"),
        }
    }
}

impl error::Error for ReadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ReadError::Io(ref e) => Some(e),
            ReadError::Malformed(ref e) => Some(e),
            ReadError::ShortRead(_) | ReadError::Closed => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> ReadError {
        ReadError::Io(e)
    }
}
