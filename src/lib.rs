#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod frame;
pub mod link;
pub mod receiver;
pub mod serial;
pub mod stuffing;
pub mod time;

pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

/// Marks the end of every frame. Never appears inside a stuffed region.
pub const TERMINATOR: u8 = 0x00;
/// Length byte + payload. A single block of this many literals still fits a code byte.
pub const MAX_MESSAGE_SIZE: usize = u8::MAX as usize - 1;
/// Largest application payload
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - 1;
/// Code byte overhead: 1, Message: MAX_MESSAGE_SIZE, Terminator: 1
pub const MAX_FRAME_SIZE: usize = MAX_MESSAGE_SIZE + 2;

pub use config::{CommMode, Config};
pub use frame::{Frame, FrameDataSlice, FrameError, FrameIOError, decode_payload, send_frame};
pub use link::Messenger;
pub use receiver::{MessageHandler, StreamReceiver};
pub use serial::{
    Comm, CommError, HalSerial, IoSerial, Loopback, LoopbackFull, NullSerial, Transport,
};
pub use stuffing::{stuff, unstuff};
pub use time::{Clock, Ticker};
