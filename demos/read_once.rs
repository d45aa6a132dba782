//! Print frames from a CAN interface until an error occurs.
//!
//! Usage: `read_once [IFNAME]`. Set `RUST_LOG=info` to see the frames.

use std::env;
use std::time::UNIX_EPOCH;

use canlink::CanSession;

fn main() {
    env_logger::init();

    let ifname = env::args().nth(1).unwrap_or_else(|| "vcan0".to_owned());
    let mut bus = CanSession::open(&ifname).unwrap();

    loop {
        match bus.read_frame_with_timestamp() {
            Ok((frame, time)) => {
                let ts = time.duration_since(UNIX_EPOCH).unwrap_or_default();
                log::info!("({}.{:06}) {} {}", ts.as_secs(), ts.subsec_micros(), ifname, frame)
            }
            Err(e) => {
                log::error!("Error: {}", e);
                break;
            }
        }
    }
}
