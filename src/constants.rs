// information from https://raw.githubusercontent.com/torvalds/linux/master/
//                  /include/uapi/linux/can.h and /include/uapi/linux/can/raw.h

use std::os::raw::c_int;

/// Address family of SocketCAN
pub const AF_CAN: c_int = 29;
/// Protocol family of SocketCAN
pub const PF_CAN: c_int = AF_CAN;

// Protocol of the PF_CAN Family: raw sockets
pub const CAN_RAW: c_int = 1;

pub const SOL_CAN_BASE: c_int = 100;
pub const SOL_CAN_RAW: c_int = SOL_CAN_BASE + CAN_RAW;
pub const CAN_RAW_LOOPBACK: c_int = 3;
pub const CAN_RAW_RECV_OWN_MSGS: c_int = 4;

// get timestamp from ioctl in a struct timespec (ns accuracy)
pub const SIOCGSTAMPNS: c_int = 0x8907;

/// Special address description flags for the CAN_ID
///
/// EFF/SFF is set in the MSB
pub const EFF_FLAG: u32 = 0x80000000;
/// remote transmission request
pub const RTR_FLAG: u32 = 0x40000000;
/// error message frame
pub const ERR_FLAG: u32 = 0x20000000;

/// valid bits in CAN ID for frame formats
/// standard frame format (SFF)
pub const SFF_MASK: u32 = 0x000007ff;
/// extended frame format (EFF)
pub const EFF_MASK: u32 = 0x1fffffff;

/// Maximum payload of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;

/// Size of `struct can_frame`, the unit of every read and write
pub const CAN_MTU: usize = 16;

/// Size of the kernel's interface name buffer, terminator included
pub const IFNAMSIZ: usize = 16;
