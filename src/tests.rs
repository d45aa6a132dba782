use std::io;
use std::os::unix::io::IntoRawFd;
use std::os::unix::net::UnixDatagram;
use std::thread;
use std::time::{Duration, SystemTime};

use crate::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A session whose socket is one end of a datagram pair, so that frame
/// reads and writes hit the real syscalls without a CAN interface.
fn session_pair() -> (CanSession, UnixDatagram) {
    init_logging();
    let (ours, theirs) = UnixDatagram::pair().unwrap();
    let session = unsafe { CanSession::from_raw_socket(ours.into_raw_fd(), 7) }.unwrap();
    (session, theirs)
}

fn recv_frame(peer: &UnixDatagram) -> (usize, CanFrame) {
    let mut buf = [0u8; 64];
    let n = peer.recv(&mut buf).unwrap();
    let mut raw = [0u8; CAN_MTU];
    raw.copy_from_slice(&buf[..CAN_MTU]);
    (n, CanFrame::from_bytes(&raw).unwrap())
}

/// Accepts `fail_at` frames, then fails every write.
struct FailingWriter {
    accepted: Vec<CanFrame>,
    attempts: usize,
    fail_at: usize,
}

impl FailingWriter {
    fn new(fail_at: usize) -> FailingWriter {
        FailingWriter {
            accepted: Vec::new(),
            attempts: 0,
            fail_at,
        }
    }
}

impl FrameWrite for FailingWriter {
    fn write_frame(&mut self, frame: &CanFrame) -> io::Result<()> {
        self.attempts += 1;
        if self.accepted.len() == self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "bus off"));
        }
        self.accepted.push(*frame);
        Ok(())
    }
}

#[test]
fn seventeen_bytes_make_three_frames() {
    let mut frames: Vec<CanFrame> = Vec::new();
    let sent = send_fragmented(&mut frames, 0x123, &[0xAA; 17]).unwrap();

    assert_eq!(sent, 17);
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames.iter().map(|f| f.dlc()).collect::<Vec<_>>(),
        vec![8, 8, 1]
    );
    assert!(frames.iter().all(|f| f.id() == 0x123 && !f.is_extended()));
    assert!(frames.iter().all(|f| f.data().iter().all(|&b| b == 0xAA)));
}

#[test]
fn empty_payload_sends_nothing() {
    let mut frames: Vec<CanFrame> = Vec::new();
    assert_eq!(send_fragmented(&mut frames, 0x1, &[]).unwrap(), 0);
    assert!(frames.is_empty());
    assert_eq!(fragment(0x1, &[]).unwrap().len(), 0);
}

#[test]
fn multiple_of_eight_has_no_empty_tail() {
    let frames: Vec<_> = fragment(0x10, &[1; 16]).unwrap().collect();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.dlc() == 8));
}

#[test]
fn write_failure_stops_the_send() {
    let mut writer = FailingWriter::new(1);
    let err = send_fragmented(&mut writer, 0x42, &[0x55; 20]).unwrap_err();

    match err {
        SendError::WriteFailed {
            bytes_written,
            ref source,
        } => {
            assert_eq!(bytes_written, 8);
            assert_eq!(source.to_string(), "bus off");
        }
        ref other => panic!("unexpected error: {}", other),
    }
    assert_eq!(err.bytes_written(), 8);
    // the third chunk is never tried
    assert_eq!(writer.attempts, 2);
    assert_eq!(writer.accepted.len(), 1);
}

#[test]
fn oversized_id_sends_nothing() {
    let mut writer = FailingWriter::new(usize::MAX);
    let err = send_fragmented(&mut writer, EFF_MASK + 1, &[1, 2, 3]).unwrap_err();

    match err {
        SendError::InvalidFrame(ConstructionError::IdTooLarge(id)) => assert_eq!(id, EFF_MASK + 1),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(writer.attempts, 0);
}

#[test]
fn extended_ids_set_the_eff_flag() {
    let frames: Vec<_> = fragment(0x18FF_1234, &[0; 9]).unwrap().collect();
    assert!(frames.iter().all(|f| f.is_extended()));
    assert!(frames.iter().all(|f| f.id() == 0x18FF_1234));

    let frame = CanFrame::new(SFF_MASK, &[]).unwrap();
    assert!(!frame.is_extended());
}

#[test]
fn frame_construction_limits() {
    assert_eq!(
        CanFrame::new(0x1, &[0; 9]),
        Err(ConstructionError::TooMuchData(9))
    );
    assert_eq!(
        CanFrame::new(0x2000_0000, &[]),
        Err(ConstructionError::IdTooLarge(0x2000_0000))
    );

    let frame = CanFrame::new(0x7FF, &[1, 2, 3]).unwrap();
    assert_eq!(frame.data(), &[1, 2, 3]);
    assert!(!frame.is_rtr());
    assert!(!frame.is_error());
}

#[test]
fn frame_bytes_use_kernel_layout() {
    let frame = CanFrame::new(0x123, &[0xDE, 0xAD]).unwrap();
    let bytes = frame.to_bytes();

    assert_eq!(&bytes[..4], &0x123u32.to_ne_bytes());
    assert_eq!(bytes[4], 2);
    assert_eq!(&bytes[8..10], &[0xDE, 0xAD]);
    assert_eq!(&bytes[10..], &[0; 6]);
    assert_eq!(CanFrame::from_bytes(&bytes), Ok(frame));

    let mut bad = bytes;
    bad[4] = 9;
    assert_eq!(
        CanFrame::from_bytes(&bad),
        Err(ConstructionError::TooMuchData(9))
    );
}

#[test]
fn frame_formatting() {
    let frame = CanFrame::new(0x123, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    assert_eq!(frame.to_string(), "123#DEADBEEF");
    assert_eq!(format!("{:X}", frame), "123#DEADBEEF");
    assert_eq!(format!("{:#X}", frame), "123#DE AD BE EF");

    let frame = CanFrame::new(0x1234, &[]).unwrap();
    assert_eq!(frame.to_string(), "00001234#");
}

#[test]
fn interface_names() {
    assert_eq!(InterfaceName::new("can0").unwrap().as_str(), "can0");
    assert!(InterfaceName::new("abcdefghijklmno").is_ok());

    assert_eq!(
        InterfaceName::new("abcdefghijklmnop"),
        Err(NameError::TooLong(16))
    );
    assert_eq!(InterfaceName::new(""), Err(NameError::Empty));
    assert_eq!(InterfaceName::new(".."), Err(NameError::Reserved));
    assert_eq!(
        InterfaceName::new("can/0"),
        Err(NameError::InvalidCharacter('/'))
    );
    assert_eq!(
        InterfaceName::new("can 0"),
        Err(NameError::InvalidCharacter(' '))
    );
    assert_eq!(
        "vcan\00".parse::<InterfaceName>(),
        Err(NameError::InvalidCharacter('\0'))
    );
}

#[test]
fn open_rejects_long_names() {
    init_logging();
    let name = "x".repeat(64);
    match CanSession::open(&name) {
        Err(OpenError::InvalidInterfaceName(NameError::TooLong(64))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn open_unknown_interface() {
    init_logging();
    match CanSession::open("nosuchcan42") {
        Err(OpenError::InterfaceNotFound { interface, .. }) => assert_eq!(interface, "nosuchcan42"),
        other => panic!("unexpected result: {:?}", other),
    }

    match CanSession::open_if(0) {
        Err(OpenError::InterfaceNotFound { .. }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn socket_and_bind_failures_are_not_lookup_failures() {
    init_logging();
    // no interface has this index; hosts without PF_CAN fail one step earlier
    match CanSession::open_if(u32::MAX) {
        Err(OpenError::SocketCreationFailed(_)) | Err(OpenError::BindFailed(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn send_writes_whole_frames() {
    let (mut session, peer) = session_pair();
    let payload: Vec<u8> = (0..17).collect();

    assert_eq!(session.send(0x321, &payload).unwrap(), 17);

    let mut reassembled = Vec::new();
    for expected_dlc in &[8, 8, 1] {
        let (n, frame) = recv_frame(&peer);
        assert_eq!(n, CAN_MTU);
        assert_eq!(frame.id(), 0x321);
        assert_eq!(frame.dlc(), *expected_dlc);
        reassembled.extend_from_slice(frame.data());
    }
    assert_eq!(reassembled, payload);
}

#[test]
fn read_returns_one_frame() {
    let (mut session, peer) = session_pair();
    let frame = CanFrame::new(0x0AB, &[9, 8, 7]).unwrap();
    peer.send(&frame.to_bytes()).unwrap();

    assert_eq!(session.read_frame().unwrap(), frame);
    assert_eq!(session.if_index(), 7);
}

#[test]
fn timestamped_read_keeps_the_frame() {
    let (mut session, peer) = session_pair();
    let frame = CanFrame::new(0x0CD, &[1, 2]).unwrap();
    let before = SystemTime::now() - Duration::from_secs(60);
    peer.send(&frame.to_bytes()).unwrap();

    // datagram sockets carry no CAN timestamp; the frame must survive that
    let (received, time) = session.read_frame_with_timestamp().unwrap();
    assert_eq!(received, frame);
    assert!(time >= before);
    assert!(time <= SystemTime::now() + Duration::from_secs(60));
}

#[test]
fn short_read_is_an_error() {
    let (mut session, peer) = session_pair();
    peer.send(&[1, 2, 3, 4]).unwrap();

    match session.read_frame() {
        Err(ReadError::ShortRead(4)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn oversized_dlc_is_an_error() {
    let (mut session, peer) = session_pair();
    let mut bytes = CanFrame::new(0x1, &[0; 8]).unwrap().to_bytes();
    bytes[4] = 12;
    peer.send(&bytes).unwrap();

    match session.read_frame() {
        Err(ReadError::Malformed(ConstructionError::TooMuchData(12))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn close_handle_ends_blocked_read() {
    let (mut session, _peer) = session_pair();
    let handle = session.close_handle();

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.close();
    });

    match session.read_frame() {
        Err(ReadError::Closed) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    closer.join().unwrap();

    assert!(session.is_closed());
    match session.send(0x1, &[1]) {
        Err(SendError::WriteFailed {
            bytes_written: 0,
            ref source,
        }) => assert_eq!(source.kind(), io::ErrorKind::NotConnected),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn read_timeout_is_retryable() {
    let (mut session, _peer) = session_pair();
    session.set_read_timeout(Some(Duration::from_millis(20)));

    let res = session.read_frame();
    assert!(res.should_retry());
    match res {
        Err(ReadError::Io(ref e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn nonblocking_read_returns_immediately() {
    let (mut session, _peer) = session_pair();
    session.set_nonblocking(true).unwrap();

    assert!(session.read_frame().should_retry());
}

#[test]
fn closed_session_is_not_retryable() {
    let (mut session, _peer) = session_pair();
    session.close_handle().close();
    let res = session.read_frame();
    assert!(!res.should_retry());
}

#[test]
fn bus_trait_round_trip() {
    let (session, peer) = session_pair();
    let mut bus: Box<dyn CanBus> = Box::new(session);

    assert_eq!(bus.write(0x55, &[1, 2, 3]).unwrap(), 3);
    let (_, frame) = recv_frame(&peer);
    assert_eq!(frame.data(), &[1, 2, 3]);

    let frame = CanFrame::new(0x66, &[4, 5]).unwrap();
    peer.send(&frame.to_bytes()).unwrap();
    assert_eq!(bus.read().unwrap(), (0x66, vec![4, 5]));
}

#[test]
fn close_marks_handles() {
    let (session, _peer) = session_pair();
    let handle = session.close_handle();
    assert!(!handle.is_closed());

    session.close().unwrap();
    assert!(handle.is_closed());
    // closing again through the handle after the session is gone is harmless
    handle.close();
}

#[cfg(feature = "vcan_tests")]
mod vcan {
    use super::*;

    // requires a `vcan0` interface:
    //   ip link add dev vcan0 type vcan && ip link set up vcan0
    #[test]
    fn fragments_arrive_in_order() {
        init_logging();
        let mut rx = CanSession::open_with(
            "vcan0",
            &SessionOptions::default().read_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        let mut tx = CanSession::open("vcan0").unwrap();

        assert_eq!(tx.send(0x123, &[0xAA; 17]).unwrap(), 17);

        let mut dlcs = Vec::new();
        for _ in 0..3 {
            let (frame, _) = rx.read_frame_with_timestamp().unwrap();
            assert_eq!(frame.id(), 0x123);
            dlcs.push(frame.dlc());
        }
        assert_eq!(dlcs, vec![8, 8, 1]);

        tx.close().unwrap();
        rx.close().unwrap();
    }

    #[test]
    fn own_messages_loop_back() {
        init_logging();
        let options = SessionOptions::default()
            .recv_own_msgs(true)
            .read_timeout(Duration::from_secs(1));
        let mut session = CanSession::open_with("vcan0", &options).unwrap();

        session.send(0x7FF, &[1, 2]).unwrap();
        assert_eq!(session.read_frame().unwrap().data(), &[1, 2]);
    }
}
