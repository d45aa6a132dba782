use std::{io, mem, time};

/// `setsockopt` wrapper
///
/// The libc `setsockopt` function is set to set various options on a socket.
/// `set_socket_option` offers a somewhat type-safe wrapper that does not
/// require messing around with `*const c_void`s.
///
/// A proper `std::io::Error` will be returned on failure.
///
/// Note that the `val` parameter must be specified correctly; if an option
/// expects an integer, it is advisable to pass in a `c_int`, not the default
/// of `i32`.
pub fn set_socket_option<T>(
    fd: libc::c_int,
    level: libc::c_int,
    name: libc::c_int,
    val: &T,
) -> io::Result<()> {
    let r = unsafe {
        let val_ptr: *const T = val as *const T;
        libc::setsockopt(
            fd,
            level,
            name,
            val_ptr as *const libc::c_void,
            mem::size_of::<T>() as libc::socklen_t,
        )
    };

    if r != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

pub fn set_socket_flag(
    fd: libc::c_int,
    level: libc::c_int,
    name: libc::c_int,
    enabled: bool,
) -> io::Result<()> {
    let val: libc::c_int = if enabled { 1 } else { 0 };
    set_socket_option(fd, level, name, &val)
}

/// `None` maps to a zero timeval, which the kernel reads as "no timeout".
/// A `Some` timeout shorter than a microsecond becomes 1µs so that it does
/// not turn into "no timeout" as well.
pub fn timeval_from_duration(t: Option<time::Duration>) -> libc::timeval {
    let t = match t {
        None => time::Duration::default(),
        Some(t) if t.as_micros() == 0 => time::Duration::from_micros(1),
        Some(t) => t,
    };
    libc::timeval {
        tv_sec: t.as_secs() as libc::time_t,
        tv_usec: (t.subsec_micros()) as libc::suseconds_t,
    }
}

/// Timeout argument for `poll(2)`: -1 blocks forever, sub-millisecond
/// durations round up so they do not turn into a busy poll.
pub fn poll_timeout_ms(t: Option<time::Duration>) -> libc::c_int {
    match t {
        None => -1,
        Some(t) => {
            let mut ms = t.as_millis();
            if t.subsec_nanos() % 1_000_000 != 0 {
                ms += 1;
            }
            if ms > libc::c_int::MAX as u128 {
                libc::c_int::MAX
            } else {
                ms as libc::c_int
            }
        }
    }
}

pub fn duration_from_timespec(ts: libc::timespec) -> time::Duration {
    time::Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

pub fn system_time_from_timespec(ts: libc::timespec) -> time::SystemTime {
    time::UNIX_EPOCH + duration_from_timespec(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn poll_timeout_rounds_up() {
        assert_eq!(poll_timeout_ms(None), -1);
        assert_eq!(poll_timeout_ms(Some(Duration::from_millis(0))), 0);
        assert_eq!(poll_timeout_ms(Some(Duration::from_micros(1))), 1);
        assert_eq!(poll_timeout_ms(Some(Duration::from_millis(250))), 250);
        assert_eq!(poll_timeout_ms(Some(Duration::from_secs(u64::MAX))), libc::c_int::MAX);
    }

    #[test]
    fn timeval_conversion() {
        let tv = timeval_from_duration(Some(Duration::from_micros(1_500_000)));
        assert_eq!(tv.tv_sec, 1);
        assert_eq!(tv.tv_usec, 500_000);

        let tv = timeval_from_duration(None);
        assert_eq!((tv.tv_sec, tv.tv_usec), (0, 0));
    }

    #[test]
    fn zero_timeval_is_not_infinite() {
        let tv = timeval_from_duration(Some(Duration::from_secs(0)));
        assert_eq!((tv.tv_sec, tv.tv_usec), (0, 1));

        let tv = timeval_from_duration(Some(Duration::from_nanos(500)));
        assert_eq!((tv.tv_sec, tv.tv_usec), (0, 1));
    }
}
