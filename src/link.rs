use log::{debug, error};

use crate::{
    config::Config,
    frame::{FrameIOError, send_frame},
    receiver::{MessageHandler, StreamReceiver},
    serial::Transport,
    time::{Clock, Ticker},
};

/// One end of a message link: the transport plus everything needed to
/// drive it from a cooperative main loop.
#[derive(Debug)]
pub struct Messenger<T: Transport> {
    transport: T,
    receiver: StreamReceiver,
    ticker: Ticker,
}

impl<T: Transport> Messenger<T> {
    pub fn new(transport: T, config: &Config, now_ms: u32) -> Messenger<T> {
        debug!(
            "messenger up, {:?} link, polling every {} ms",
            config.mode, config.poll_interval_ms
        );
        Messenger {
            transport,
            receiver: StreamReceiver::new(),
            ticker: Ticker::new(config.poll_interval_ms, now_ms),
        }
    }

    /// Forget any partial frame and restart the poll interval.
    pub fn init(&mut self, now_ms: u32) {
        self.receiver.init();
        self.ticker.init(now_ms);
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<usize, FrameIOError<T::Error>> {
        send_frame(&mut self.transport, payload).inspect_err(|e| {
            error!("send of {} bytes failed: {}", payload.len(), e);
        })
    }

    /// Receive pass regardless of the poll interval.
    pub fn poll<H: MessageHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<usize, FrameIOError<T::Error>> {
        self.receiver.poll(&mut self.transport, handler)
    }

    /// Main loop entry point.
    ///
    /// `WouldBlock` until the poll interval has elapsed, then one receive
    /// pass returning the number of messages delivered.
    pub fn update<C: Clock + ?Sized, H: MessageHandler + ?Sized>(
        &mut self,
        clock: &mut C,
        handler: &mut H,
    ) -> nb::Result<usize, FrameIOError<T::Error>> {
        if self.ticker.update(clock.now_ms()).is_none() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.poll(handler)?)
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn receiver(&self) -> &StreamReceiver {
        &self.receiver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
