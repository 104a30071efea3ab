//! Tests for parsing the byte stream from the controller

use bo_tie_hci_h4::{BufferKind, Direction};
use bo_tie_hci_tests::{acl_packet, connect, l2cap_pdu, ScriptedController};
use bo_tie_hci_util::{AclPacketBoundary, PacketIndicator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn body(rng: &mut ChaCha8Rng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

/// Generate a random packet that is not intercepted by the transport
fn random_packet(rng: &mut ChaCha8Rng) -> (PacketIndicator, Vec<u8>) {
    match rng.gen_range(0..4) {
        0 => {
            let len = rng.gen_range(0..=255usize);
            let code = rng.gen_range(0x10..=0x3Eu8);

            let mut event = vec![code, len as u8];

            event.extend(body(rng, len));

            (PacketIndicator::Event, event)
        }
        1 => {
            let handle = rng.gen_range(0..=0xEFFu16);
            let len = rng.gen_range(0..=600usize);

            let pdu = l2cap_pdu(0x40, &body(rng, len));

            (PacketIndicator::AclData, acl_packet(handle, AclPacketBoundary::FirstAutoFlushable, &pdu))
        }
        2 => {
            let handle = rng.gen_range(0..=0xEFFu16);
            let len = rng.gen_range(0..=255usize);

            let mut sco = handle.to_le_bytes().to_vec();

            sco.push(len as u8);
            sco.extend(body(rng, len));

            (PacketIndicator::ScoData, sco)
        }
        _ => {
            let len = rng.gen_range(0..=255usize);

            let mut command = vec![0x03, 0x0C, len as u8];

            command.extend(body(rng, len));

            (PacketIndicator::Command, command)
        }
    }
}

#[test]
fn every_kind_round_trips() {
    for seed in 0..32u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let max_chunk = rng.gen_range(1..=64);

        let mut h4 = connect(ScriptedController::new(seed).with_max_chunk(max_chunk));

        let packets: Vec<_> = (0..50).map(|_| random_packet(&mut rng)).collect();

        let mut total = 0;

        for (indicator, packet) in &packets {
            h4.transport_mut().send_packet(*indicator, packet);

            total += 1 + packet.len();
        }

        assert_eq!(h4.receive(), total, "seed {}", seed);

        let received = &h4.host().received;

        assert_eq!(received.len(), packets.len(), "seed {}", seed);

        for ((indicator, packet), buffer) in packets.iter().zip(received.iter()) {
            assert_eq!(&**buffer, &packet[..], "seed {}", seed);
            assert_eq!(buffer.kind(), BufferKind::from_controller(*indicator));
        }

        assert_eq!(h4.trace().filter(Direction::Inbound).count(), packets.len());
        assert_eq!(h4.parked_acl_count(), 0);
    }
}

#[test]
fn unknown_indicators_are_skipped() {
    for bad in [0x00u8, 0x05, 0x7F, 0xFF] {
        let mut h4 = connect(ScriptedController::new(bad.into()));

        let event = [0x10, 0x01, 0xAB];

        h4.transport_mut().inject(&[bad]);
        h4.transport_mut().send_packet(PacketIndicator::Event, &event);

        assert_eq!(h4.receive(), 1 + 1 + event.len());

        let received = &h4.host().received;

        assert_eq!(received.len(), 1);
        assert_eq!(&*received[0], &event);
    }
}

#[test]
fn bytes_arriving_over_many_receives() {
    let mut h4 = connect(ScriptedController::new(7).with_max_chunk(3));

    let pdu = l2cap_pdu(0x40, &[0x5A; 40]);
    let packet = acl_packet(0x10, AclPacketBoundary::FirstAutoFlushable, &pdu);

    let mut wire = vec![PacketIndicator::AclData.val()];

    wire.extend_from_slice(&packet);

    for byte in wire {
        assert!(h4.host().received.is_empty());

        h4.transport_mut().inject(&[byte]);

        assert_eq!(h4.receive(), 1);
    }

    assert_eq!(&*h4.host().received[0], &packet[..]);
}
