//! Payload transport over SocketCAN.
//!
//! The Linux kernel supports using CAN-devices through a network-like API
//! (see https://www.kernel.org/doc/Documentation/networking/can.txt). This
//! crate binds a raw CAN socket to one interface and moves byte payloads of
//! any length across it, without having to wrestle libc calls.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes. If two
//! devices attempt to send a frame at the same time, the device with the
//! higher ID will notice the conflict, stop sending and reattempt to sent its
//! frame in the next time slot. This means that the lower the ID, the higher
//! the priority.
//!
//! # Fragmentation
//!
//! `CanSession::send` cuts a payload into 8-byte pieces and sends one frame
//! per piece, all with the same ID. Nothing on the wire marks where a
//! payload starts or ends; `CanSession::read_frame` hands back single
//! frames and leaves reassembly to the application.
//!
//! ```no_run
//! use canlink::CanSession;
//!
//! let mut session = CanSession::open("vcan0")?;
//! let sent = session.send(0x123, &[0xAA; 17])?; // three frames: 8 + 8 + 1
//! assert_eq!(sent, 17);
//!
//! let frame = session.read_frame()?;
//! println!("{}", frame);
//! session.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Threads
//!
//! A session is used from one thread at a time (`send` and `read_frame`
//! take `&mut self`). To stop a read that blocks in another thread, take a
//! `CloseHandle` before handing the session over.
//!
//! # RawFd
//!
//! Raw access to the underlying file descriptor is available through the
//! `AsRawFd` and `IntoRawFd` implementations, and an existing socket can be
//! adopted with `CanSession::from_raw_socket`.

pub extern crate libc;
pub extern crate log;
pub extern crate nix;

mod bus;
mod close;
mod constants;
mod errors;
mod fragment;
mod frame;
mod ifname;
mod retry;
mod session;
mod util;

pub use bus::CanBus;
pub use close::CloseHandle;
pub use constants::{CAN_MAX_DLEN, CAN_MTU, EFF_MASK, IFNAMSIZ, SFF_MASK};
pub use errors::{ConstructionError, NameError, OpenError, ReadError, SendError};
pub use fragment::{fragment, send_fragmented, Fragments, FrameWrite};
pub use frame::CanFrame;
pub use ifname::InterfaceName;
pub use retry::ShouldRetry;
pub use session::{CanSession, SessionOptions};

#[cfg(test)]
mod tests;
