use std::os::raw::{c_int, c_short, c_uint, c_void};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::sync::Arc;
use std::{io, mem, time};

use log::{debug, trace, warn};
use nix::net::if_::if_nametoindex;

use crate::close::{CloseHandle, CloseSignal};
use crate::constants::*;
use crate::errors::{OpenError, ReadError, SendError};
use crate::fragment::{send_fragmented, FrameWrite};
use crate::frame::CanFrame;
use crate::ifname::InterfaceName;
use crate::util::{
    poll_timeout_ms, set_socket_flag, set_socket_option, system_time_from_timespec,
    timeval_from_duration,
};

#[derive(Debug)]
#[repr(C)]
struct CanAddr {
    _af_can: c_short,
    if_index: c_int,
    rx_id: u32,
    tx_id: u32,
}

/// Socket settings applied while a session is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// How long `read_frame` waits for a frame. `None` waits forever.
    pub read_timeout: Option<time::Duration>,
    /// How long a frame write may block. `None` blocks until the frame is
    /// queued.
    pub write_timeout: Option<time::Duration>,
    /// Let other sockets on this host see the frames we send.
    pub loopback: bool,
    /// Receive our own frames back (only with loopback).
    pub recv_own_msgs: bool,
}

impl Default for SessionOptions {
    fn default() -> SessionOptions {
        SessionOptions {
            read_timeout: None,
            write_timeout: None,
            loopback: true,
            recv_own_msgs: false,
        }
    }
}

impl SessionOptions {
    pub fn read_timeout(mut self, timeout: time::Duration) -> SessionOptions {
        self.read_timeout = Some(timeout);
        self
    }

    /// A zero timeout is raised to 1µs: the kernel reads a zero
    /// `SO_SNDTIMEO` as "block forever".
    pub fn write_timeout(mut self, timeout: time::Duration) -> SessionOptions {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn loopback(mut self, enabled: bool) -> SessionOptions {
        self.loopback = enabled;
        self
    }

    pub fn recv_own_msgs(mut self, enabled: bool) -> SessionOptions {
        self.recv_own_msgs = enabled;
        self
    }
}

/// A raw CAN socket bound to one interface.
///
/// The session owns the socket: it is closed by `close`, or when the
/// session is dropped. Sending and reading need `&mut self`, so one
/// session is used by one thread at a time; wrap it in a `Mutex` to share
/// it. A read blocked in another thread can be ended through a
/// `CloseHandle`.
#[derive(Debug)]
pub struct CanSession {
    fd: c_int,
    if_index: c_uint,
    read_timeout: Option<time::Duration>,
    nonblocking: bool,
    signal: Arc<CloseSignal>,
}

impl CanSession {
    /// Open a named CAN device.
    ///
    /// Usually the more common case, opens a socket can device by name, such
    /// as "vcan0" or "can0".
    pub fn open(ifname: &str) -> Result<CanSession, OpenError> {
        CanSession::open_with(ifname, &SessionOptions::default())
    }

    /// Open a named CAN device with non-default socket settings.
    pub fn open_with(ifname: &str, options: &SessionOptions) -> Result<CanSession, OpenError> {
        let name = InterfaceName::new(ifname)?;

        let if_index =
            if_nametoindex(name.as_str()).map_err(|source| OpenError::InterfaceNotFound {
                interface: name.to_string(),
                source,
            })?;

        debug!("{} at index {}", name, if_index);
        CanSession::open_if_with(if_index, options)
    }

    /// Open CAN device by interface number.
    pub fn open_if(if_index: c_uint) -> Result<CanSession, OpenError> {
        CanSession::open_if_with(if_index, &SessionOptions::default())
    }

    /// Open CAN device by interface number with non-default socket settings.
    ///
    /// Index 0 is refused: the kernel reads it as "any interface", which is
    /// not a binding.
    pub fn open_if_with(if_index: c_uint, options: &SessionOptions) -> Result<CanSession, OpenError> {
        if if_index == 0 {
            return Err(OpenError::InterfaceNotFound {
                interface: format!("#{}", if_index),
                source: nix::errno::Errno::ENODEV,
            });
        }

        let signal = CloseSignal::new().map_err(OpenError::SocketCreationFailed)?;

        let sock_fd = unsafe { libc::socket(PF_CAN, libc::SOCK_RAW | libc::SOCK_CLOEXEC, CAN_RAW) };

        if sock_fd == -1 {
            return Err(OpenError::SocketCreationFailed(io::Error::last_os_error()));
        }

        // from here on, returning early drops `session`, which closes the socket
        let mut session = CanSession {
            fd: sock_fd,
            if_index,
            read_timeout: None,
            nonblocking: false,
            signal,
        };

        let addr = CanAddr {
            _af_can: AF_CAN as c_short,
            if_index: if_index as c_int,
            rx_id: 0,
            tx_id: 0,
        };

        let bind_rv = unsafe {
            let sockaddr_ptr = &addr as *const CanAddr;
            libc::bind(
                sock_fd,
                sockaddr_ptr as *const libc::sockaddr,
                mem::size_of::<CanAddr>() as libc::socklen_t,
            )
        };

        if bind_rv == -1 {
            return Err(OpenError::BindFailed(io::Error::last_os_error()));
        }

        session
            .apply_options(options)
            .map_err(OpenError::SocketOptionFailed)?;

        debug!("opened CAN socket {} on interface {}", sock_fd, if_index);
        Ok(session)
    }

    /// Wrap an already bound socket.
    ///
    /// # Safety
    ///
    /// `fd` must be an open socket descriptor that nothing else owns; the
    /// session closes it.
    pub unsafe fn from_raw_socket(fd: RawFd, if_index: c_uint) -> io::Result<CanSession> {
        let signal = match CloseSignal::new() {
            Ok(signal) => signal,
            Err(e) => {
                libc::close(fd);
                return Err(e);
            }
        };

        Ok(CanSession {
            fd,
            if_index,
            read_timeout: None,
            nonblocking: false,
            signal,
        })
    }

    fn apply_options(&mut self, options: &SessionOptions) -> io::Result<()> {
        self.set_read_timeout(options.read_timeout);
        self.set_write_timeout(options.write_timeout)?;
        self.set_loopback(options.loopback)?;
        self.set_recv_own_msgs(options.recv_own_msgs)
    }

    /// Kernel index of the bound interface.
    #[inline]
    pub fn if_index(&self) -> c_uint {
        self.if_index
    }

    /// A handle that can close this session from another thread.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle::new(Arc::clone(&self.signal))
    }

    /// Whether the session was closed through a `CloseHandle`.
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    /// Change socket to non-blocking mode
    ///
    /// In non-blocking mode `read_frame` returns a `WouldBlock` error
    /// instead of waiting when no frame is queued.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        // retrieve current flags
        let oldfl = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };

        if oldfl == -1 {
            return Err(io::Error::last_os_error());
        }

        let newfl = if nonblocking {
            oldfl | libc::O_NONBLOCK
        } else {
            oldfl & !libc::O_NONBLOCK
        };

        let rv = unsafe { libc::fcntl(self.fd, libc::F_SETFL, newfl) };

        if rv != 0 {
            return Err(io::Error::last_os_error());
        }

        self.nonblocking = nonblocking;
        Ok(())
    }

    /// Sets the read timeout on the session
    ///
    /// For convenience, the result value can be checked using
    /// `ShouldRetry::should_retry` when a timeout is set.
    pub fn set_read_timeout(&mut self, timeout: Option<time::Duration>) {
        self.read_timeout = timeout;
    }

    /// Sets the write timeout on the socket
    ///
    /// `Some(Duration::ZERO)` is raised to 1µs; use `None` to block.
    pub fn set_write_timeout(&mut self, timeout: Option<time::Duration>) -> io::Result<()> {
        set_socket_option(
            self.fd,
            libc::SOL_SOCKET,
            libc::SO_SNDTIMEO,
            &timeval_from_duration(timeout),
        )
    }

    /// Enable or disable loopback.
    ///
    /// By default, loopback is enabled, causing other applications that open
    /// the same CAN bus to see frames emitted by different applications on
    /// the same system.
    pub fn set_loopback(&mut self, enabled: bool) -> io::Result<()> {
        set_socket_flag(self.fd, SOL_CAN_RAW, CAN_RAW_LOOPBACK, enabled)
    }

    /// Enable or disable receiving of own frames.
    ///
    /// When loopback is enabled, this settings controls if CAN frames sent
    /// are received back immediately by sender. Default is off.
    pub fn set_recv_own_msgs(&mut self, enabled: bool) -> io::Result<()> {
        set_socket_flag(self.fd, SOL_CAN_RAW, CAN_RAW_RECV_OWN_MSGS, enabled)
    }

    /// Send `payload` as consecutive frames with identifier `id`.
    ///
    /// Returns the number of payload bytes written, which is the payload
    /// length on success. The first failing frame aborts the send; the
    /// error reports how many bytes made it out before it.
    pub fn send(&mut self, id: u32, payload: &[u8]) -> Result<usize, SendError> {
        send_fragmented(self, id, payload)
    }

    /// Blocking read a single can frame.
    pub fn read_frame(&mut self) -> Result<CanFrame, ReadError> {
        self.wait_readable()?;

        let mut buf = [0u8; CAN_MTU];
        let read_rv = loop {
            let rv = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut c_void, CAN_MTU) };

            if rv == -1 {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ReadError::Io(e));
            }

            break rv as usize;
        };

        if read_rv != CAN_MTU {
            return Err(ReadError::ShortRead(read_rv));
        }

        let frame = CanFrame::from_bytes(&buf).map_err(ReadError::Malformed)?;
        trace!("received {}", frame);
        Ok(frame)
    }

    /// Blocking read a single can frame with timestamp
    ///
    /// Note that reading a frame and retrieving the timestamp requires two
    /// consecutive syscalls. The frame is already consumed when the
    /// timestamp is asked for, so if the kernel has none to give, the
    /// frame is returned with the current time instead of being dropped.
    pub fn read_frame_with_timestamp(&mut self) -> Result<(CanFrame, time::SystemTime), ReadError> {
        let frame = self.read_frame()?;

        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rval = unsafe { libc::ioctl(self.fd, SIOCGSTAMPNS as _, &mut ts as *mut libc::timespec) };

        if rval == -1 {
            debug!(
                "no kernel timestamp for {}: {}",
                frame,
                io::Error::last_os_error()
            );
            return Ok((frame, time::SystemTime::now()));
        }

        Ok((frame, system_time_from_timespec(ts)))
    }

    /// Wait until the socket has a frame queued or the session is closed.
    fn wait_readable(&self) -> Result<(), ReadError> {
        if self.signal.is_closed() {
            return Err(ReadError::Closed);
        }

        let timeout = if self.nonblocking {
            0
        } else {
            poll_timeout_ms(self.read_timeout)
        };

        let mut fds = [
            libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.signal.event_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        loop {
            let rv = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };

            if rv == -1 {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ReadError::Io(e));
            }

            if rv == 0 {
                return Err(ReadError::Io(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "no frame received before timeout",
                )));
            }

            if fds[1].revents != 0 || self.signal.is_closed() {
                return Err(ReadError::Closed);
            }

            if fds[0].revents & libc::POLLNVAL != 0 {
                return Err(ReadError::Io(io::Error::from_raw_os_error(libc::EBADF)));
            }

            // POLLERR and POLLHUP fall through: the read reports the error
            return Ok(());
        }
    }

    /// Close the socket, reporting the result of `close(2)`.
    ///
    /// Dropping the session closes it as well, but swallows errors.
    pub fn close(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        if self.fd == -1 {
            return Ok(());
        }

        self.signal.close();

        let fd = mem::replace(&mut self.fd, -1);
        let rv = unsafe { libc::close(fd) };

        if rv == -1 {
            return Err(io::Error::last_os_error());
        }

        debug!("closed CAN socket {} on interface {}", fd, self.if_index);
        Ok(())
    }
}

impl FrameWrite for CanSession {
    fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()> {
        if self.signal.is_closed() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "session closed"));
        }

        let bytes = frame.to_bytes();

        loop {
            let write_rv = unsafe { libc::write(self.fd, bytes.as_ptr() as *const c_void, CAN_MTU) };

            if write_rv == -1 {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }

            if write_rv as usize != CAN_MTU {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write of {} bytes", write_rv),
                ));
            }

            return Ok(());
        }
    }
}

impl AsRawFd for CanSession {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl IntoRawFd for CanSession {
    fn into_raw_fd(mut self) -> RawFd {
        mem::replace(&mut self.fd, -1)
    }
}

impl Drop for CanSession {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("closing CAN socket failed: {}", e);
        }
    }
}
