use core::fmt;

use log::trace;

use crate::{
    Decode, Encode, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE,
    serial::Transport,
    stuffing::{stuff, unstuff},
};

/// Payload bytes as handed to [`send_frame`] or [`Encode::encode`].
pub type FrameDataSlice<'a> = &'a [u8];

/// Error type for stuffing, unstuffing and the length prefix check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    MessageTooLong {
        max: usize,
        found: usize,
    },
    EncodeBufferTooSmall {
        expected: usize,
        found: usize,
    },
    DecodeBufferTooSmall {
        expected_at_least: usize,
        found: usize,
    },
    MissingTerminator,
    /// Frame is nothing but a terminator
    EmptyFrame,
    UnexpectedTerminator {
        index: usize,
    },
    /// Code byte at `index` runs past the end of the frame
    TruncatedBlock {
        index: usize,
        code: u8,
    },
    MissingLength,
    LengthMismatch {
        declared: usize,
        decoded: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MessageTooLong { max, found } => {
                write!(f, "message of {found} bytes exceeds {max}")
            }
            FrameError::EncodeBufferTooSmall { expected, found } => {
                write!(f, "encode buffer holds {found} bytes, need {expected}")
            }
            FrameError::DecodeBufferTooSmall {
                expected_at_least,
                found,
            } => write!(
                f,
                "decode buffer holds {found} bytes, need at least {expected_at_least}"
            ),
            FrameError::MissingTerminator => f.write_str("frame does not end in a terminator"),
            FrameError::EmptyFrame => f.write_str("empty frame"),
            FrameError::UnexpectedTerminator { index } => {
                write!(f, "terminator inside stuffed data at {index}")
            }
            FrameError::TruncatedBlock { index, code } => {
                write!(f, "block code {code} at {index} runs past end of frame")
            }
            FrameError::MissingLength => f.write_str("frame carries no length byte"),
            FrameError::LengthMismatch { declared, decoded } => {
                write!(f, "length byte says {declared}, decoded {decoded}")
            }
        }
    }
}

impl core::error::Error for FrameError {}

/// Errors surfaced while moving frames over a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIOError<E> {
    Frame(FrameError),
    /// Accumulator filled up without seeing a terminator
    Overflow { capacity: usize },
    Read(E),
    Write(E),
    ShortWrite { expected: usize, written: usize },
}

impl<E> From<FrameError> for FrameIOError<E> {
    fn from(value: FrameError) -> Self {
        FrameIOError::Frame(value)
    }
}

impl<E: fmt::Debug> fmt::Display for FrameIOError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameIOError::Frame(e) => write!(f, "framing: {e}"),
            FrameIOError::Overflow { capacity } => {
                write!(f, "no terminator within {capacity} bytes")
            }
            FrameIOError::Read(e) => write!(f, "transport read: {e:?}"),
            FrameIOError::Write(e) => write!(f, "transport write: {e:?}"),
            FrameIOError::ShortWrite { expected, written } => {
                write!(f, "transport took {written} of {expected} bytes")
            }
        }
    }
}

impl<E: fmt::Debug> core::error::Error for FrameIOError<E> {}

impl<'a> Encode for FrameDataSlice<'a> {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if self.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::MessageTooLong {
                max: MAX_PAYLOAD_SIZE,
                found: self.len(),
            });
        }
        // Length: 1, Data: len
        // The length byte counts itself
        let mut message = [0; MAX_MESSAGE_SIZE];
        let size = self.len() + 1;
        message[0] = size as u8;
        message[1..size].copy_from_slice(self);

        stuff(&message[..size], buffer)
    }
}

/// Unstuff `frame` into `scratch` and strip the length prefix.
///
/// The prefix has to agree with what was actually decoded, otherwise the
/// frame is rejected.
pub fn decode_payload<'s>(frame: &[u8], scratch: &'s mut [u8]) -> Result<&'s [u8], FrameError> {
    let decoded = unstuff(frame, scratch)?;
    if decoded == 0 {
        return Err(FrameError::MissingLength);
    }
    let declared = scratch[0] as usize;
    if declared != decoded {
        return Err(FrameError::LengthMismatch { declared, decoded });
    }
    Ok(&scratch[1..decoded])
}

/// A decoded message that owns its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: heapless::Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Length on the wire including code overhead and terminator
    pub fn len(&self) -> usize {
        self.data.len() + 3
    }

    pub fn payload(&self) -> &[u8] {
        &self.data
    }
}

impl<'a> Decode<'a> for Frame {
    type Error = FrameError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let mut scratch = [0; MAX_MESSAGE_SIZE];
        let payload = decode_payload(data, &mut scratch)?;
        let mut v = heapless::Vec::new();
        // decode_payload never hands back more than MAX_PAYLOAD_SIZE bytes
        v.extend_from_slice(payload)
            .map_err(|_| FrameError::DecodeBufferTooSmall {
                expected_at_least: payload.len(),
                found: MAX_PAYLOAD_SIZE,
            })?;
        Ok(Frame { data: v })
    }
}

/// Encode `data` and hand the frame to `transport` in a single write.
///
/// Returns the number of bytes the transport accepted. Anything short of the
/// whole frame is an error; nothing is retried.
pub fn send_frame<T: Transport>(
    transport: &mut T,
    data: &[u8],
) -> Result<usize, FrameIOError<T::Error>> {
    let mut buf = [0; MAX_FRAME_SIZE];
    let size = data.encode(&mut buf)?;
    let written = transport
        .write(&buf[..size])
        .map_err(FrameIOError::Write)?;
    if written < size {
        return Err(FrameIOError::ShortWrite {
            expected: size,
            written,
        });
    }
    trace!("sent frame of {} bytes ({} payload)", size, data.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{Loopback, LoopbackFull};

    #[test]
    fn encodes_length_prefixed_payload() {
        let mut buf = [0; MAX_FRAME_SIZE];
        let n = [0x01u8, 0x02].as_slice().encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x04, 0x03, 0x01, 0x02, 0x00]);
    }

    #[test]
    fn encodes_empty_payload() {
        let mut buf = [0; MAX_FRAME_SIZE];
        let n = [0u8; 0].as_slice().encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x02, 0x01, 0x00]);

        let f = Frame::decode(&buf[..n]).unwrap();
        assert!(f.payload().is_empty());
        assert_eq!(f.len(), n);
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = [0x42; MAX_PAYLOAD_SIZE + 1];
        let mut buf = [0; MAX_FRAME_SIZE + 1];
        assert_eq!(
            payload.as_slice().encode(&mut buf),
            Err(FrameError::MessageTooLong {
                max: MAX_PAYLOAD_SIZE,
                found: MAX_PAYLOAD_SIZE + 1
            })
        );
    }

    #[test]
    fn decodes_embedded_zero() {
        let f = Frame::decode(&[0x03, 0x04, 0x05, 0x02, 0x07, 0x00]).unwrap();
        assert_eq!(f.payload(), &[0x05, 0x00, 0x07]);
        assert_eq!(f.len(), 6);
    }

    #[test]
    fn rejects_wrong_length_byte() {
        // Length byte claims 5, only 3 bytes decoded
        let mut scratch = [0; MAX_MESSAGE_SIZE];
        assert_eq!(
            decode_payload(&[0x04, 0x05, 0x01, 0x02, 0x00], &mut scratch),
            Err(FrameError::LengthMismatch {
                declared: 5,
                decoded: 3
            })
        );
    }

    #[test]
    fn rejects_frame_without_length_byte() {
        let mut scratch = [0; MAX_MESSAGE_SIZE];
        assert_eq!(
            decode_payload(&[0x01, 0x00], &mut scratch),
            Err(FrameError::MissingLength)
        );
    }

    #[test]
    fn send_writes_whole_frame() {
        let mut wire = Loopback::<16>::new();
        assert_eq!(send_frame(&mut wire, &[0x01, 0x02]), Ok(5));
        let mut got = [0; 5];
        for b in got.iter_mut() {
            *b = wire.read_one().unwrap();
        }
        assert_eq!(got, [0x04, 0x03, 0x01, 0x02, 0x00]);
    }

    #[test]
    fn send_reports_short_write() {
        let mut wire = Loopback::<4>::new();
        assert_eq!(
            send_frame(&mut wire, &[0x01, 0x02]),
            Err(FrameIOError::ShortWrite {
                expected: 5,
                written: 4
            })
        );
    }

    #[test]
    fn send_reports_transport_error() {
        let mut wire = Loopback::<4>::new();
        wire.inject(&[1, 2, 3, 4]).unwrap();
        assert_eq!(
            send_frame(&mut wire, b"x"),
            Err(FrameIOError::Write(LoopbackFull))
        );
        assert_eq!(wire.len(), 4);
    }
}
