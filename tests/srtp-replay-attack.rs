use skydd::SrtpError;

mod common;
use common::{connect_pair, control_packet, init_log, media_packet};

#[test]
fn duplicated_media_packets_are_dropped() {
    init_log();

    let (l, r) = connect_pair();
    let tx = l.rtp_transformer();
    let rx = r.rtp_transformer();

    const REPLAY_PER_PACKET: usize = 5;

    for seq in 1..=50_u16 {
        let mut packet = media_packet(42, seq, b"some audio");
        tx.protect(&mut packet).unwrap();

        let replayed = packet.clone();

        rx.unprotect(&mut packet).unwrap();

        // An attacker re-delivering the same wire bytes gets nowhere.
        for _ in 0..REPLAY_PER_PACKET {
            let mut copy = replayed.clone();
            assert_eq!(
                rx.unprotect(&mut copy),
                Err(SrtpError::ReplayDetected(u64::from(seq)))
            );
            // The payload is untouched on rejection.
            assert_eq!(copy.payload, replayed.payload);
        }
    }
}

#[test]
fn packets_behind_the_window_are_dropped() {
    init_log();

    let (l, r) = connect_pair();
    let tx = l.rtp_transformer();
    let rx = r.rtp_transformer();

    // Protect a batch up front, then deliver only the newest.
    let mut stale = Vec::new();
    for seq in 1..=200_u16 {
        let mut packet = media_packet(42, seq, b"some audio");
        tx.protect(&mut packet).unwrap();
        if seq <= 100 {
            stale.push(packet.clone());
        }
        if seq == 200 {
            rx.unprotect(&mut packet).unwrap();
        }
    }

    // Everything 64 or more behind the newest accepted index is rejected,
    // even though none of it was ever seen.
    for mut packet in stale {
        let seq = packet.seq_no;
        assert_eq!(
            rx.unprotect(&mut packet),
            Err(SrtpError::ReplayDetected(u64::from(seq)))
        );
    }
}

#[test]
fn replayed_control_packets_are_dropped() {
    init_log();

    let (l, r) = connect_pair();
    let tx = l.rtcp_transformer();
    let rx = r.rtcp_transformer();

    let mut packet = control_packet(42, b"sender report");
    tx.protect(&mut packet).unwrap();

    let replayed = packet.clone();

    rx.unprotect(&mut packet).unwrap();

    let mut copy = replayed.clone();
    assert_eq!(rx.unprotect(&mut copy), Err(SrtpError::ReplayDetected(1)));
}

#[test]
fn replay_does_not_disturb_the_stream() {
    init_log();

    let (l, r) = connect_pair();
    let tx = l.rtp_transformer();
    let rx = r.rtp_transformer();

    let mut first = media_packet(42, 1, b"one");
    tx.protect(&mut first).unwrap();
    let replayed = first.clone();

    rx.unprotect(&mut first).unwrap();

    let mut copy = replayed.clone();
    assert!(rx.unprotect(&mut copy).is_err());

    // The legitimate stream continues unharmed.
    for seq in 2..=10_u16 {
        let mut packet = media_packet(42, seq, b"more audio");
        tx.protect(&mut packet).unwrap();
        rx.unprotect(&mut packet).unwrap();
        assert_eq!(packet.payload, b"more audio");
    }
}
