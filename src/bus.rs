use crate::errors::{ReadError, SendError};
use crate::session::CanSession;

/// A CAN bus seen as an addressed byte pipe.
///
/// `write` takes any amount of data for one identifier and splits it into
/// frames. `read` returns one frame's identifier and data; frames are not
/// joined back into the payload they came from. Resources are released on
/// drop.
pub trait CanBus {
    /// Write `data` to the device at `id`, returning the bytes written.
    fn write(&mut self, id: u32, data: &[u8]) -> Result<usize, SendError>;

    /// Read the next frame as `(id, data)`.
    fn read(&mut self) -> Result<(u32, Vec<u8>), ReadError>;
}

impl CanBus for CanSession {
    fn write(&mut self, id: u32, data: &[u8]) -> Result<usize, SendError> {
        self.send(id, data)
    }

    fn read(&mut self) -> Result<(u32, Vec<u8>), ReadError> {
        let frame = self.read_frame()?;
        Ok((frame.id(), frame.data().to_vec()))
    }
}

impl<B: CanBus + ?Sized> CanBus for Box<B> {
    fn write(&mut self, id: u32, data: &[u8]) -> Result<usize, SendError> {
        (**self).write(id, data)
    }

    fn read(&mut self) -> Result<(u32, Vec<u8>), ReadError> {
        (**self).read()
    }
}
