use std::{fmt, io};

use crate::errors::{ReadError, SendError};

/// Check an error return value for timeouts.
///
/// Due to the fact that timeouts are reported as errors, calling `read_frame`
/// on a session with a timeout that does not receive a frame in time will
/// result in an error being returned. This trait adds a `should_retry` method
/// to errors and `Result`s to check for this condition.
///
/// Nothing in this crate retries on its own; this is for callers that want
/// to.
pub trait ShouldRetry {
    /// Check for timeout
    ///
    /// If `true`, the error is probably due to a timeout.
    fn should_retry(&self) -> bool;
}

impl ShouldRetry for io::Error {
    fn should_retry(&self) -> bool {
        match self.kind() {
            // EAGAIN, EINPROGRESS and EWOULDBLOCK are the three possible codes
            // returned when a timeout occurs. the stdlib already maps EAGAIN
            // and EWOULDBLOCK os WouldBlock
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => true,
            // however, EINPROGRESS is also valid
            _ => self.raw_os_error() == Some(libc::EINPROGRESS),
        }
    }
}

impl ShouldRetry for ReadError {
    fn should_retry(&self) -> bool {
        match *self {
            ReadError::Io(ref e) => e.should_retry(),
            _ => false,
        }
    }
}

impl ShouldRetry for SendError {
    fn should_retry(&self) -> bool {
        match *self {
            SendError::WriteFailed { ref source, .. } => source.should_retry(),
            SendError::InvalidFrame(_) => false,
        }
    }
}

impl<T: fmt::Debug, E: ShouldRetry> ShouldRetry for Result<T, E> {
    fn should_retry(&self) -> bool {
        if let Err(ref e) = *self {
            e.should_retry()
        } else {
            false
        }
    }
}
