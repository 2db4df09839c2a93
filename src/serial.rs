use core::{convert::Infallible, fmt};

use embedded_hal_nb::serial::{Read as HalRead, Write as HalWrite};
use embedded_io::{Read as IoRead, ReadReady, Write as IoWrite, WriteReady};
use heapless::Deque;

use crate::config::CommMode;

/// A polled byte link.
///
/// `available` and `read_one` must never block. `read_one` is only
/// meaningful after `available` reported something; otherwise it may
/// return `WouldBlock`.
pub trait Transport {
    type Error: fmt::Debug;

    /// Bytes that can be read right now without blocking
    fn available(&mut self) -> Result<usize, Self::Error>;

    fn read_one(&mut self) -> nb::Result<u8, Self::Error>;

    /// Write as much of `data` as the link takes, returning the count.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;
}

/// Hardware UART driven through the `embedded-hal-nb` serial traits.
///
/// The HAL has no "bytes available" query, so `available` pulls one byte
/// ahead into a holding slot.
#[derive(Debug)]
pub struct HalSerial<S> {
    serial: S,
    held: Option<u8>,
}

impl<S> HalSerial<S>
where
    S: HalRead + HalWrite,
{
    pub fn new(serial: S) -> HalSerial<S> {
        HalSerial { serial, held: None }
    }

    pub fn into_inner(self) -> S {
        self.serial
    }
}

impl<S> Transport for HalSerial<S>
where
    S: HalRead + HalWrite,
{
    type Error = S::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        if self.held.is_none() {
            match self.serial.read() {
                Ok(b) => self.held = Some(b),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(self.held.is_some() as usize)
    }

    fn read_one(&mut self) -> nb::Result<u8, Self::Error> {
        match self.held.take() {
            Some(b) => Ok(b),
            None => self.serial.read(),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut written = 0;
        for &b in data {
            match HalWrite::write(&mut self.serial, b) {
                Ok(()) => written += 1,
                // Peripheral is full, report what made it in
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        match HalWrite::flush(&mut self.serial) {
            Ok(()) | Err(nb::Error::WouldBlock) => Ok(written),
            Err(nb::Error::Other(e)) => Err(e),
        }
    }
}

/// Software (bit-banged) serial exposed through `embedded-io`.
///
/// Reads and writes are gated on `ReadReady`/`WriteReady`, so a full TX
/// buffer shows up as a short write count.
#[derive(Debug)]
pub struct IoSerial<S> {
    serial: S,
}

impl<S> IoSerial<S>
where
    S: IoRead + ReadReady + IoWrite + WriteReady,
{
    pub fn new(serial: S) -> IoSerial<S> {
        IoSerial { serial }
    }

    pub fn into_inner(self) -> S {
        self.serial
    }
}

impl<S> Transport for IoSerial<S>
where
    S: IoRead + ReadReady + IoWrite + WriteReady,
{
    type Error = S::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        // ReadReady only promises at least one byte
        Ok(self.serial.read_ready()? as usize)
    }

    fn read_one(&mut self) -> nb::Result<u8, Self::Error> {
        if !self.serial.read_ready()? {
            return Err(nb::Error::WouldBlock);
        }
        let mut b = [0; 1];
        match self.serial.read(&mut b)? {
            0 => Err(nb::Error::WouldBlock),
            _ => Ok(b[0]),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut written = 0;
        // Only write while the port can take a byte without blocking
        while written < data.len() && self.serial.write_ready()? {
            match IoWrite::write(&mut self.serial, &data[written..])? {
                0 => break,
                n => written += n,
            }
        }
        Ok(written)
    }
}

/// No link at all. Never has input, swallows output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSerial;

impl Transport for NullSerial {
    type Error = Infallible;

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn read_one(&mut self) -> nb::Result<u8, Self::Error> {
        Err(nb::Error::WouldBlock)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        Ok(data.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackFull;

/// In-memory wire: whatever is written comes back out of the read side.
#[derive(Debug)]
pub struct Loopback<const N: usize> {
    buf: Deque<u8, N>,
}

impl<const N: usize> Loopback<N> {
    pub fn new() -> Loopback<N> {
        Loopback { buf: Deque::new() }
    }

    /// Queue bytes for the read side without framing them.
    pub fn inject(&mut self, data: &[u8]) -> Result<(), LoopbackFull> {
        for &b in data {
            self.buf.push_back(b).map_err(|_| LoopbackFull)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl<const N: usize> Default for Loopback<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Transport for Loopback<N> {
    type Error = LoopbackFull;

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.buf.len())
    }

    fn read_one(&mut self) -> nb::Result<u8, Self::Error> {
        self.buf.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if !data.is_empty() && self.buf.is_full() {
            return Err(LoopbackFull);
        }
        let mut written = 0;
        for &b in data {
            if self.buf.push_back(b).is_err() {
                break;
            }
            written += 1;
        }
        Ok(written)
    }
}

/// Error of whichever link [`Comm`] is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommError {
    Serial(embedded_hal_nb::serial::ErrorKind),
    Io(embedded_io::ErrorKind),
}

impl embedded_io::Error for CommError {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind::*;
        match self {
            CommError::Serial(kind) => match kind {
                Overrun => embedded_io::ErrorKind::OutOfMemory,
                FrameFormat => embedded_io::ErrorKind::InvalidData,
                Noise => embedded_io::ErrorKind::Other,
                Parity => embedded_io::ErrorKind::InvalidData,
                _ => embedded_io::ErrorKind::Other,
            },
            CommError::Io(kind) => *kind,
        }
    }
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommError::Serial(kind) => write!(f, "serial: {kind:?}"),
            CommError::Io(kind) => write!(f, "io: {kind:?}"),
        }
    }
}

/// Link chosen at start-up from [`CommMode`].
#[derive(Debug)]
pub enum Comm<H, S> {
    Null(NullSerial),
    Hardware(HalSerial<H>),
    Software(IoSerial<S>),
}

impl<H, S> Comm<H, S>
where
    H: HalRead + HalWrite,
    S: IoRead + ReadReady + IoWrite + WriteReady,
{
    /// Wrap the peripheral `mode` asks for and drop the other one.
    pub fn select(mode: CommMode, hardware: H, software: S) -> Comm<H, S> {
        match mode {
            CommMode::Null => Comm::Null(NullSerial),
            CommMode::Hardware => Comm::Hardware(HalSerial::new(hardware)),
            CommMode::Software => Comm::Software(IoSerial::new(software)),
        }
    }

    pub fn mode(&self) -> CommMode {
        match self {
            Comm::Null(_) => CommMode::Null,
            Comm::Hardware(_) => CommMode::Hardware,
            Comm::Software(_) => CommMode::Software,
        }
    }
}

fn hal_err<E: embedded_hal_nb::serial::Error>(e: E) -> CommError {
    CommError::Serial(e.kind())
}

fn io_err<E: embedded_io::Error>(e: E) -> CommError {
    CommError::Io(e.kind())
}

impl<H, S> Transport for Comm<H, S>
where
    H: HalRead + HalWrite,
    S: IoRead + ReadReady + IoWrite + WriteReady,
{
    type Error = CommError;

    fn available(&mut self) -> Result<usize, Self::Error> {
        match self {
            Comm::Null(_) => Ok(0),
            Comm::Hardware(h) => h.available().map_err(hal_err),
            Comm::Software(s) => s.available().map_err(io_err),
        }
    }

    fn read_one(&mut self) -> nb::Result<u8, Self::Error> {
        match self {
            Comm::Null(_) => Err(nb::Error::WouldBlock),
            Comm::Hardware(h) => h.read_one().map_err(|e| e.map(hal_err)),
            Comm::Software(s) => s.read_one().map_err(|e| e.map(io_err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        match self {
            Comm::Null(_) => Ok(data.len()),
            Comm::Hardware(h) => h.write(data).map_err(hal_err),
            Comm::Software(s) => s.write(data).map_err(io_err),
        }
    }
}
