//! Splitting payloads into CAN frames.
//!
//! A payload of `L` bytes becomes `ceil(L / 8)` frames that all carry the
//! same identifier. There is no sequence number and no "more fragments"
//! marker: the receiving side has to know how to put the frames back
//! together.

use std::io;
use std::slice::Chunks;

use log::{debug, trace};

use crate::constants::CAN_MAX_DLEN;
use crate::errors::{ConstructionError, SendError};
use crate::frame::{check_id, CanFrame};

/// Anything a single CAN frame can be written to.
pub trait FrameWrite {
    /// Write exactly one frame. An `Ok` means the whole frame went out.
    fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()>;
}

/// Collects frames in memory.
impl FrameWrite for Vec<CanFrame> {
    fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()> {
        self.push(*frame);
        Ok(())
    }
}

impl<W: FrameWrite + ?Sized> FrameWrite for &mut W {
    fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()> {
        (**self).write_frame(frame)
    }
}

/// Iterator over the frames of one payload, see `fragment`.
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    raw_id: u32,
    chunks: Chunks<'a, u8>,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = CanFrame;

    fn next(&mut self) -> Option<CanFrame> {
        self.chunks
            .next()
            .map(|chunk| CanFrame::from_raw_id(self.raw_id, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<'a> ExactSizeIterator for Fragments<'a> {}

/// Split `payload` into frames of at most 8 bytes, left to right.
///
/// The identifier is checked once up front, so iteration itself cannot
/// fail. An empty payload produces no frames.
pub fn fragment(id: u32, payload: &[u8]) -> Result<Fragments<'_>, ConstructionError> {
    Ok(Fragments {
        raw_id: check_id(id)?,
        chunks: payload.chunks(CAN_MAX_DLEN),
    })
}

/// Write `payload` as a sequence of frames with identifier `id`.
///
/// Stops at the first frame that fails to go out. On success the payload
/// length is returned.
pub fn send_fragmented<W>(writer: &mut W, id: u32, payload: &[u8]) -> Result<usize, SendError>
where
    W: FrameWrite + ?Sized,
{
    let mut bytes_written = 0;

    for frame in fragment(id, payload)? {
        if let Err(source) = writer.write_frame(&frame) {
            debug!(
                "write of frame {} failed after {} of {} bytes: {}",
                frame,
                bytes_written,
                payload.len(),
                source
            );
            return Err(SendError::WriteFailed {
                bytes_written,
                source,
            });
        }

        trace!("sent {}", frame);
        bytes_written += frame.data().len();
    }

    Ok(bytes_written)
}
