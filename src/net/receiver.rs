//! Inbound frame reading.
//!
//! The wire protocol is a stream of encoded objects, each one a 4-byte size
//! prefix followed by that many payload bytes. The prefix doubles as the
//! object's own string framing, so the packet handed to the codec keeps the
//! header bytes at the front.

use std::io::Read;

use thiserror::Error;

use crate::serial::MAX_ARCHIVE_SIZE;

pub(crate) const FRAME_HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame size: {size}")]
    InvalidSize { size: i32 },
    #[error("frame truncated: {wanted} bytes missing")]
    Truncated { wanted: usize },
}

/// Reads one frame. `Ok(None)` is a clean close: the peer shut down between
/// frames. A close mid-frame is an error.
pub(crate) fn read_frame<R: Read>(stream: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut read = 0usize;
    while read < header.len() {
        let count = stream.read(&mut header[read..])?;
        if count == 0 {
            if read == 0 {
                return Ok(None);
            }
            return Err(FrameError::Truncated {
                wanted: header.len() - read,
            });
        }
        read += count;
    }

    let size = i32::from_be_bytes(header);
    if size < 0 || size as usize > MAX_ARCHIVE_SIZE {
        return Err(FrameError::InvalidSize { size });
    }

    let mut packet = vec![0u8; FRAME_HEADER_LEN + size as usize];
    packet[..FRAME_HEADER_LEN].copy_from_slice(&header);
    let mut read = FRAME_HEADER_LEN;
    while read < packet.len() {
        let count = stream.read(&mut packet[read..])?;
        if count == 0 {
            return Err(FrameError::Truncated {
                wanted: packet.len() - read,
            });
        }
        read += count;
    }

    Ok(Some(packet))
}
