use std::{collections::VecDeque, convert::Infallible};

use embedded_hal_nb::serial::{ErrorType, Read, Write};
use proptest::prelude::*;
use serial_stuffing::{
    Comm, CommMode, Config, Encode, FrameIOError, HalSerial, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE,
    MAX_PAYLOAD_SIZE, Messenger, NullSerial, StreamReceiver, Transport, stuff, unstuff,
};

/// UART double: reads come from `rx`, writes land in `tx`.
#[derive(Debug, Default)]
struct Wire {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl Wire {
    fn from_iter(data: impl Iterator<Item = u8>) -> Wire {
        Wire {
            rx: VecDeque::from_iter(data),
            tx: Vec::new(),
        }
    }
}

impl ErrorType for Wire {
    type Error = Infallible;
}

impl Read for Wire {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl Write for Wire {
    fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
        self.tx.push(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

/// Software serial that never has anything.
#[derive(Debug)]
struct Unplugged;

impl embedded_io::ErrorType for Unplugged {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for Unplugged {
    fn read(&mut self, _: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl embedded_io::ReadReady for Unplugged {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl embedded_io::WriteReady for Unplugged {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

impl embedded_io::Write for Unplugged {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn pre_stuff(payload: &[u8]) -> Vec<u8> {
    let mut v = vec![payload.len() as u8 + 1];
    v.extend_from_slice(payload);
    v
}

fn encode(payload: &[u8]) -> Vec<u8> {
    let mut buf = [0; MAX_FRAME_SIZE];
    let n = payload.encode(&mut buf).unwrap();
    buf[..n].to_vec()
}

fn drain<T: Transport>(rx: &mut StreamReceiver, t: &mut T) -> Vec<Vec<u8>> {
    let mut got = Vec::new();
    rx.poll(t, &mut |p: &[u8]| got.push(p.to_vec())).unwrap();
    got
}

#[test]
fn scenario_a_bytes_on_the_wire() {
    let mut m = Messenger::new(
        HalSerial::new(Wire::default()),
        &Config::new().with_poll_interval_ms(0),
        0,
    );
    assert_eq!(m.send(&[0x01, 0x02]), Ok(5));
    assert_eq!(m.into_inner().into_inner().tx, [0x04, 0x03, 0x01, 0x02, 0x00]);
}

#[test]
fn receives_over_hardware_comm() {
    let mut wire = encode(&[0x01, 0x02]);
    wire.extend(encode(&[0x05, 0x00, 0x07]));
    wire.extend(encode(&[]));
    let comm = Comm::select(
        CommMode::Hardware,
        Wire::from_iter(wire.into_iter()),
        Unplugged,
    );
    let mut m = Messenger::new(comm, &Config::new().with_poll_interval_ms(0), 0);

    let mut got = Vec::new();
    let mut clock = || 0u32;
    assert_eq!(
        m.update(&mut clock, &mut |p: &[u8]| got.push(p.to_vec())),
        Ok(3)
    );
    assert_eq!(got, vec![vec![0x01, 0x02], vec![0x05, 0x00, 0x07], vec![]]);
}

#[test]
fn null_comm_never_delivers() {
    let comm = Comm::select(
        CommMode::Null,
        Wire::from_iter(encode(b"ignored").into_iter()),
        Unplugged,
    );
    let mut m = Messenger::new(comm, &Config::new().with_mode(CommMode::Null), 0);
    let mut count = 0;
    assert_eq!(m.poll(&mut |_: &[u8]| count += 1), Ok(0));
    assert_eq!(m.send(b"dropped"), Ok(10));
    assert_eq!(count, 0);
}

#[test]
fn overflow_then_recovery_over_uart() {
    let mut wire = vec![0x7F; MAX_FRAME_SIZE + 1];
    wire.extend(encode(b"recovered"));
    let mut t = HalSerial::new(Wire::from_iter(wire.into_iter()));
    let mut rx = StreamReceiver::new();
    let mut got = Vec::new();

    assert_eq!(
        rx.poll(&mut t, &mut |p: &[u8]| got.push(p.to_vec())),
        Err(FrameIOError::Overflow {
            capacity: MAX_FRAME_SIZE
        })
    );
    assert_eq!(rx.poll(&mut t, &mut |p: &[u8]| got.push(p.to_vec())), Ok(1));
    assert_eq!(got, vec![b"recovered".to_vec()]);
}

#[test]
fn null_serial_transport_is_inert() {
    let mut rx = StreamReceiver::new();
    assert!(drain(&mut rx, &mut NullSerial).is_empty());
}

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Zeros are common on purpose, they are what stuffing has to handle
    prop::collection::vec(prop_oneof![Just(0u8), any::<u8>()], 0..=MAX_PAYLOAD_SIZE)
}

proptest! {
    #[test]
    fn prop_stuffing_roundtrips(payload in payload_strategy()) {
        let message = pre_stuff(&payload);
        let mut frame = [0; MAX_FRAME_SIZE];
        let n = stuff(&message, &mut frame).unwrap();
        prop_assert_eq!(n, message.len() + 2);

        let mut out = [0; MAX_MESSAGE_SIZE];
        let m = unstuff(&frame[..n], &mut out).unwrap();
        prop_assert_eq!(&out[..m], &message[..]);
    }

    #[test]
    fn prop_single_terminator_at_end(payload in payload_strategy()) {
        let frame = encode(&payload);
        prop_assert_eq!(frame.iter().filter(|b| **b == 0).count(), 1);
        prop_assert_eq!(frame.last(), Some(&0));
    }

    #[test]
    fn prop_chunking_does_not_change_delivery(
        payloads in prop::collection::vec(payload_strategy(), 1..4),
        chunk in 1usize..16,
    ) {
        let wire: Vec<u8> = payloads.iter().flat_map(|p| encode(p)).collect();

        let mut rx = StreamReceiver::new();
        let mut t = HalSerial::new(Wire::from_iter(wire.iter().copied()));
        let all_at_once = drain(&mut rx, &mut t);

        // A fresh link per chunk, so the receiver sees the transport run dry
        let mut rx = StreamReceiver::new();
        let mut piecewise = Vec::new();
        for piece in wire.chunks(chunk) {
            let mut t = HalSerial::new(Wire::from_iter(piece.iter().copied()));
            piecewise.extend(drain(&mut rx, &mut t));
        }

        prop_assert_eq!(&all_at_once, &payloads);
        prop_assert_eq!(&piecewise, &payloads);
    }
}
