use std::io;
use std::os::raw::{c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

/// Shared between a session and its close handles. The eventfd becomes
/// readable once the session is closed, which wakes any `poll` waiting on
/// it.
#[derive(Debug)]
pub(crate) struct CloseSignal {
    closed: AtomicBool,
    event_fd: c_int,
}

impl CloseSignal {
    pub(crate) fn new() -> io::Result<Arc<CloseSignal>> {
        let event_fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };

        if event_fd == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(Arc::new(CloseSignal {
            closed: AtomicBool::new(false),
            event_fd,
        }))
    }

    #[inline]
    pub(crate) fn event_fd(&self) -> c_int {
        self.event_fd
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // the counter only ever goes from 0 to 1, so this cannot overflow
        let one: u64 = 1;
        let rv = unsafe {
            libc::write(
                self.event_fd,
                &one as *const u64 as *const c_void,
                std::mem::size_of::<u64>(),
            )
        };

        if rv == -1 {
            warn!(
                "failed to wake blocked readers: {}",
                io::Error::last_os_error()
            );
        }
    }
}

impl Drop for CloseSignal {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.event_fd);
        }
    }
}

/// Closes a `CanSession` from another thread.
///
/// A read blocked in `read_frame` returns `ReadError::Closed`; every later
/// read or send on the session fails right away. The socket descriptor
/// itself is released when the session is dropped or closed by its owner.
///
/// Handles may outlive their session; closing one then has no effect.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    signal: Arc<CloseSignal>,
}

impl CloseHandle {
    pub(crate) fn new(signal: Arc<CloseSignal>) -> CloseHandle {
        CloseHandle { signal }
    }

    pub fn close(&self) {
        self.signal.close();
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}
