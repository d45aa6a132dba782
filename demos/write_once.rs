//! Send one payload, fragmented into CAN frames.
//!
//! Usage: `write_once [IFNAME] [ID] [HEX PAYLOAD]`, e.g.
//! `write_once vcan0 123 deadbeefcafebabe0011`.

use std::env;
use std::process;

use canlink::CanSession;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let ifname = args.next().unwrap_or_else(|| "vcan0".to_owned());
    let id = args.next().unwrap_or_else(|| "7B".to_owned());
    let payload = args.next().unwrap_or_else(|| "deadbeef".to_owned());

    let id = match u32::from_str_radix(&id, 16) {
        Ok(id) => id,
        Err(e) => {
            log::error!("bad CAN ID {:?}: {}", id, e);
            process::exit(2);
        }
    };

    let payload = match hex::decode(&payload) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("bad payload {:?}: {}", payload, e);
            process::exit(2);
        }
    };

    let mut bus = match CanSession::open(&ifname) {
        Ok(bus) => bus,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    match bus.send(id, &payload) {
        Ok(n) => log::info!("sent {} bytes in {} frames", n, (n + 7) / 8),
        Err(e) => log::error!("send error: {}", e),
    }

    if let Err(e) = bus.close() {
        log::error!("close error: {}", e);
    }
}
