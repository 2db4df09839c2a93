//! Zero-byte stuffing.
//!
//! A stuffed region is a run of blocks, each led by a code byte that counts
//! the block including itself. Every block boundary stands for one zero byte
//! of the input, so the stuffed region never contains `0x00` and the
//! terminator is free to mark the end of the frame.
//!
//! ```text
//! [0x03, 0x01, 0x02]       -> [0x04, 0x03, 0x01, 0x02, 0x00]
//! [0x04, 0x05, 0x00, 0x07] -> [0x03, 0x04, 0x05, 0x02, 0x07, 0x00]
//! ```
//!
//! Runs are never split, which caps the input at [`MAX_MESSAGE_SIZE`] bytes.

use crate::{MAX_MESSAGE_SIZE, TERMINATOR, frame::FrameError};

/// Stuff `src` into `dst` and append the terminator.
///
/// Returns the number of bytes written, always `src.len() + 2`. Nothing is
/// written when `src` is too long or `dst` too short.
pub fn stuff(src: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
    if src.len() > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLong {
            max: MAX_MESSAGE_SIZE,
            found: src.len(),
        });
    }
    // One code byte per zero plus the leading one, one terminator
    let size = src.len() + 2;
    if dst.len() < size {
        return Err(FrameError::EncodeBufferTooSmall {
            expected: size,
            found: dst.len(),
        });
    }

    let mut code_idx = 0;
    let mut out = 1;
    let mut code: u8 = 1;
    for &b in src {
        if b == TERMINATOR {
            dst[code_idx] = code;
            code_idx = out;
            out += 1;
            code = 1;
        } else {
            dst[out] = b;
            out += 1;
            code += 1;
        }
    }
    dst[out] = TERMINATOR;
    dst[code_idx] = code;

    Ok(out + 1)
}

/// Undo [`stuff`]. `src` is a whole frame, terminator included.
///
/// Returns the number of bytes written to `dst`, which is the exact length of
/// the original input.
pub fn unstuff(src: &[u8], dst: &mut [u8]) -> Result<usize, FrameError> {
    let body = match src.split_last() {
        Some((&TERMINATOR, body)) => body,
        _ => return Err(FrameError::MissingTerminator),
    };
    if body.is_empty() {
        return Err(FrameError::EmptyFrame);
    }

    let mut out = 0;
    let mut push = |b: u8, out: &mut usize| -> Result<(), FrameError> {
        let slot = dst.get_mut(*out).ok_or(FrameError::DecodeBufferTooSmall {
            expected_at_least: *out + 1,
            found: *out,
        })?;
        *slot = b;
        *out += 1;
        Ok(())
    };

    let mut index = 0;
    while index < body.len() {
        let code = body[index];
        if code == TERMINATOR {
            return Err(FrameError::UnexpectedTerminator { index });
        }
        let end = index + code as usize;
        if end > body.len() {
            return Err(FrameError::TruncatedBlock { index, code });
        }
        for (offset, &b) in body[index + 1..end].iter().enumerate() {
            if b == TERMINATOR {
                return Err(FrameError::UnexpectedTerminator {
                    index: index + 1 + offset,
                });
            }
            push(b, &mut out)?;
        }
        index = end;
        // The last block is closed by the terminator, not by a zero of the input
        if index < body.len() {
            push(TERMINATOR, &mut out)?;
        }
    }

    Ok(out)
}
