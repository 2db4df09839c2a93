//! Incremental frame reception from a polled [`Transport`].
//!
//! Bytes are pulled one at a time into a fixed accumulator until a
//! terminator shows up, then the accumulated frame is unstuffed and handed
//! out. Every framing error leaves the receiver empty, so the next byte is
//! treated as the first byte of a new frame.
//!
//! After an overflow the new frame starts with the tail of the over-long
//! run. If that tail happens to unstuff into a message whose length byte
//! matches, it is delivered; the length byte is the only guard against that.

use log::{debug, trace, warn};

use crate::{
    MAX_FRAME_SIZE, MAX_MESSAGE_SIZE, TERMINATOR,
    frame::{FrameError, FrameIOError, decode_payload},
    serial::Transport,
};

/// Consumer of decoded payloads. Called from inside `poll`, must not block.
pub trait MessageHandler {
    fn on_message(&mut self, payload: &[u8]);
}

impl<F: FnMut(&[u8])> MessageHandler for F {
    fn on_message(&mut self, payload: &[u8]) {
        self(payload)
    }
}

#[derive(Debug)]
pub struct StreamReceiver {
    acc: heapless::Vec<u8, MAX_FRAME_SIZE>,
    scratch: [u8; MAX_MESSAGE_SIZE],
}

impl StreamReceiver {
    pub const fn new() -> StreamReceiver {
        StreamReceiver {
            acc: heapless::Vec::new(),
            scratch: [0; MAX_MESSAGE_SIZE],
        }
    }

    /// Drop any partial frame.
    pub fn init(&mut self) {
        if !self.acc.is_empty() {
            debug!("discarding {} buffered bytes", self.acc.len());
        }
        self.acc.clear();
    }

    /// Bytes of the frame currently being received
    pub fn pending(&self) -> usize {
        self.acc.len()
    }

    /// Pull bytes until one frame completes.
    ///
    /// `WouldBlock` means the transport ran dry first; the partial frame is
    /// kept for the next call.
    pub fn recv<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> nb::Result<&[u8], FrameIOError<T::Error>> {
        loop {
            if transport.available().map_err(read_err)? == 0 {
                return Err(nb::Error::WouldBlock);
            }
            let b = transport
                .read_one()
                .map_err(|e| e.map(read_err))?;

            if self.acc.push(b).is_err() {
                warn!("no terminator within {} bytes, resynchronizing", MAX_FRAME_SIZE);
                self.acc.clear();
                return Err(nb::Error::Other(FrameIOError::Overflow {
                    capacity: MAX_FRAME_SIZE,
                }));
            }
            if b != TERMINATOR {
                continue;
            }

            let len = self.acc.len();
            let decoded = decode_payload(&self.acc, &mut self.scratch).map(|p| p.len());
            self.acc.clear();
            match decoded {
                Ok(n) => {
                    trace!("frame of {} bytes, payload {}", len, n);
                    // Payload sits behind the length byte
                    return Ok(&self.scratch[1..n + 1]);
                }
                // Lone terminator, nothing to deliver
                Err(FrameError::EmptyFrame) => trace!("empty frame"),
                Err(e) => {
                    warn!("dropping malformed frame of {} bytes: {}", len, e);
                    return Err(nb::Error::Other(FrameIOError::Frame(e)));
                }
            }
        }
    }

    /// Deliver every frame the transport has ready to `handler`.
    ///
    /// Returns how many payloads were delivered. The first error stops the
    /// pass; the receiver has already resynchronized, so polling again picks
    /// up with the bytes that follow.
    pub fn poll<T: Transport, H: MessageHandler + ?Sized>(
        &mut self,
        transport: &mut T,
        handler: &mut H,
    ) -> Result<usize, FrameIOError<T::Error>> {
        let mut delivered = 0;
        loop {
            match self.recv(transport) {
                Ok(payload) => {
                    handler.on_message(payload);
                    delivered += 1;
                }
                Err(nb::Error::WouldBlock) => return Ok(delivered),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
    }
}

impl Default for StreamReceiver {
    fn default() -> Self {
        StreamReceiver::new()
    }
}

fn read_err<E>(e: E) -> FrameIOError<E> {
    FrameIOError::Read(e)
}
