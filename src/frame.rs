use std::fmt;

use itertools::Itertools;

use crate::constants::*;
use crate::errors::ConstructionError;

/// CanFrame
///
/// Uses the same memory layout as the underlying kernel struct, so that
/// `to_bytes` produces exactly what `write(2)` expects on a raw socket.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CanFrame {
    /// 32 bit CAN_ID + EFF/RTR/ERR flags
    _id: u32,
    /// data length. Bytes beyond are not valid
    _data_len: u8,
    /// padding
    _pad: u8,
    /// reserved
    _res0: u8,
    /// reserved
    _res1: u8,
    /// buffer for data
    _data: [u8; 8],
}

impl CanFrame {
    /// Build a data frame. IDs above `SFF_MASK` get the extended frame flag.
    pub fn new(id: u32, data: &[u8]) -> Result<CanFrame, ConstructionError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData(data.len()));
        }

        let id = check_id(id)?;
        Ok(CanFrame::from_raw_id(id, data))
    }

    /// `raw_id` must already carry its flags and `data` must fit.
    pub(crate) fn from_raw_id(raw_id: u32, data: &[u8]) -> CanFrame {
        debug_assert!(data.len() <= CAN_MAX_DLEN);

        let mut full_data = [0; 8];
        full_data[..data.len()].copy_from_slice(data);

        CanFrame {
            _id: raw_id,
            _data_len: data.len() as u8,
            _pad: 0,
            _res0: 0,
            _res1: 0,
            _data: full_data,
        }
    }

    /// Decode a frame in kernel layout (native byte order).
    ///
    /// Fails if the data length code claims more than 8 bytes.
    pub fn from_bytes(bytes: &[u8; CAN_MTU]) -> Result<CanFrame, ConstructionError> {
        let data_len = bytes[4];
        if data_len as usize > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData(data_len as usize));
        }

        let mut id = [0; 4];
        id.copy_from_slice(&bytes[..4]);
        let mut data = [0; 8];
        data.copy_from_slice(&bytes[8..]);

        Ok(CanFrame {
            _id: u32::from_ne_bytes(id),
            _data_len: data_len,
            _pad: bytes[5],
            _res0: bytes[6],
            _res1: bytes[7],
            _data: data,
        })
    }

    /// Encode into kernel layout (native byte order).
    pub fn to_bytes(&self) -> [u8; CAN_MTU] {
        let mut bytes = [0; CAN_MTU];
        bytes[..4].copy_from_slice(&self._id.to_ne_bytes());
        bytes[4] = self._data_len;
        bytes[5] = self._pad;
        bytes[6] = self._res0;
        bytes[7] = self._res1;
        bytes[8..].copy_from_slice(&self._data);
        bytes
    }

    /// Return the actual CAN ID (without EFF/RTR/ERR flags)
    #[inline]
    pub fn id(&self) -> u32 {
        if self.is_extended() {
            self._id & EFF_MASK
        } else {
            self._id & SFF_MASK
        }
    }

    /// Data length code, always in `0..=8`
    #[inline]
    pub fn dlc(&self) -> u8 {
        self._data_len
    }

    /// Check if frame uses 29 bit extended frame format
    #[inline]
    pub fn is_extended(&self) -> bool {
        self._id & EFF_FLAG != 0
    }

    /// Check if frame is an error message
    #[inline]
    pub fn is_error(&self) -> bool {
        self._id & ERR_FLAG != 0
    }

    /// Check if frame is a remote transmission request
    #[inline]
    pub fn is_rtr(&self) -> bool {
        self._id & RTR_FLAG != 0
    }

    /// A slice into the actual data. Slice will always be <= 8 bytes in length
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self._data[..(self._data_len as usize)]
    }
}

/// Validate a CAN ID and return the identifier word to put on the wire.
pub(crate) fn check_id(id: u32) -> Result<u32, ConstructionError> {
    if id > EFF_MASK {
        return Err(ConstructionError::IdTooLarge(id));
    }

    // set EFF_FLAG on large message
    if id > SFF_MASK {
        Ok(id | EFF_FLAG)
    } else {
        Ok(id)
    }
}

/// candump notation, e.g. `123#DEADBEEF`
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "{:08X}#{}", self.id(), hex::encode_upper(self.data()))
        } else {
            write!(f, "{:03X}#{}", self.id(), hex::encode_upper(self.data()))
        }
    }
}

impl fmt::UpperHex for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}#", self.id())?;

        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));

        let sep = if f.alternate() { " " } else { "" };
        write!(f, "{}", parts.join(sep))
    }
}
