//! Setup/loop skeleton on the host: a loopback link echoes every message it
//! receives until a few round trips have been made.

use std::time::Instant;

use serial_stuffing::{Config, Loopback, Messenger};

fn main() {
    let start = Instant::now();
    let mut clock = || start.elapsed().as_millis() as u32;

    // setup
    let config = Config::new().with_poll_interval_ms(5);
    let mut link = Messenger::new(Loopback::<512>::new(), &config, 0);
    link.init(0);
    link.send(&[0x01]).expect("first send");

    // loop
    let mut rounds = 0;
    while rounds < 5 {
        let mut inbox = Vec::new();
        match link.update(&mut clock, &mut |p: &[u8]| inbox.push(p.to_vec())) {
            Ok(n) if n > 0 => println!("tick {} ms: {n} message(s)", link.ticker().delta_ms()),
            Ok(_) | Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => eprintln!("receive failed: {e}"),
        }
        for mut msg in inbox {
            println!("got {msg:02x?}");
            msg.push(msg.len() as u8 + 1);
            link.send(&msg).expect("echo");
            rounds += 1;
        }
    }
}
