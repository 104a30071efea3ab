//! Tests for the recombination of L2CAP PDUs from ACL segments

use bo_tie_hci_tests::{acl_packet, connect, l2cap_pdu, random_split, ScriptedController};
use bo_tie_hci_util::{AclHeader, AclPacketBoundary, PacketIndicator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Make the ACL packets of a start segment followed by continuations
fn segments(handle: u16, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let boundary = if i == 0 {
                AclPacketBoundary::FirstAutoFlushable
            } else {
                AclPacketBoundary::ContinuingFragment
            };

            acl_packet(handle, boundary, chunk)
        })
        .collect()
}

#[test]
fn interleaved_connections() {
    for seed in 0..16u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut h4 = connect(ScriptedController::new(seed).with_max_chunk(rng.gen_range(1..=32)));

        let payload_a: Vec<u8> = (0..rng.gen_range(1..2000)).map(|_| rng.gen()).collect();
        let payload_b: Vec<u8> = (0..rng.gen_range(1..2000)).map(|_| rng.gen()).collect();

        let pdu_a = l2cap_pdu(0x40, &payload_a);
        let pdu_b = l2cap_pdu(0x41, &payload_b);

        // the first segment contains at least the L2CAP length
        let (head_a, tail_a) = pdu_a.split_at(rng.gen_range(2..=4));
        let (head_b, tail_b) = pdu_b.split_at(rng.gen_range(2..=4));

        let mut chunks_a = vec![head_a];
        let mut chunks_b = vec![head_b];

        chunks_a.extend(random_split(&mut rng, tail_a, 1, 300));
        chunks_b.extend(random_split(&mut rng, tail_b, 1, 300));

        let mut segments_a = segments(0x001, &chunks_a).into_iter().peekable();
        let mut segments_b = segments(0x0EFF, &chunks_b).into_iter().peekable();

        while segments_a.peek().is_some() || segments_b.peek().is_some() {
            let next = if rng.gen() {
                segments_a.next().or_else(|| segments_b.next())
            } else {
                segments_b.next().or_else(|| segments_a.next())
            };

            if let Some(segment) = next {
                h4.transport_mut().send_packet(PacketIndicator::AclData, &segment);
            }
        }

        h4.receive();

        let received = &h4.host().received;

        assert_eq!(received.len(), 2, "seed {}", seed);
        assert_eq!(h4.parked_acl_count(), 0);

        for buffer in received {
            let header = AclHeader::from_bytes(buffer).unwrap();

            let expected = if header.raw_handle == 0x001 { &pdu_a } else { &pdu_b };

            assert_eq!(header.packet_boundary_flag, AclPacketBoundary::FirstAutoFlushable);
            assert_eq!(usize::from(header.data_length), expected.len());
            assert_eq!(&buffer[4..], &expected[..], "seed {}", seed);
        }

        // every segment is traced on its own
        assert_eq!(h4.trace().captured().len(), chunks_a.len() + chunks_b.len());
    }
}

#[test]
fn too_few_continuations() {
    let mut h4 = connect(ScriptedController::new(1));

    let pdu = l2cap_pdu(0x40, &[0x11; 100]);

    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x5, AclPacketBoundary::FirstAutoFlushable, &pdu[..50]));
    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x5, AclPacketBoundary::ContinuingFragment, &pdu[50..80]));

    h4.receive();

    assert!(h4.host().received.is_empty());
    assert_eq!(h4.parked_acl_count(), 1);

    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x5, AclPacketBoundary::ContinuingFragment, &pdu[80..]));

    h4.receive();

    assert_eq!(&h4.host().received[0][4..], &pdu[..]);
    assert_eq!(h4.parked_acl_count(), 0);
}

#[test]
fn start_segment_with_only_the_l2cap_length() {
    let mut h4 = connect(ScriptedController::new(4).with_max_chunk(3));

    let empty = l2cap_pdu(0x40, &[]);

    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x9, AclPacketBoundary::FirstAutoFlushable, &empty[..2]));

    h4.receive();

    assert!(h4.host().received.is_empty());
    assert_eq!(h4.parked_acl_count(), 1);

    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x9, AclPacketBoundary::ContinuingFragment, &empty[2..]));

    h4.receive();

    let received = &h4.host().received;

    assert_eq!(received.len(), 1);
    assert_eq!(&received[0][4..], &empty[..]);
    assert_eq!(h4.parked_acl_count(), 0);
}

#[test]
fn second_start_discards_pending() {
    let mut h4 = connect(ScriptedController::new(2));

    let abandoned = l2cap_pdu(0x40, &[0x22; 100]);
    let replacement = l2cap_pdu(0x40, &[0x33; 10]);

    h4.transport_mut().send_packet(
        PacketIndicator::AclData,
        &acl_packet(0x7, AclPacketBoundary::FirstAutoFlushable, &abandoned[..60]),
    );

    h4.receive();

    assert_eq!(h4.provider().outstanding(), 1);

    h4.transport_mut().send_packet(
        PacketIndicator::AclData,
        &acl_packet(0x7, AclPacketBoundary::FirstAutoFlushable, &replacement),
    );

    h4.receive();

    let received = &h4.host().received;

    assert_eq!(received.len(), 1);
    assert_eq!(&received[0][4..], &replacement[..]);

    // the abandoned base went back to the pool
    assert_eq!(h4.provider().outstanding(), 1);
    assert_eq!(h4.parked_acl_count(), 0);

    // a late continuation of the abandoned PDU is dropped
    h4.transport_mut().send_packet(
        PacketIndicator::AclData,
        &acl_packet(0x7, AclPacketBoundary::ContinuingFragment, &abandoned[60..]),
    );

    h4.receive();

    assert_eq!(h4.host().received.len(), 1);
}

#[test]
fn segments_of_other_packets_in_between() {
    let mut h4 = connect(ScriptedController::new(3).with_max_chunk(5));

    let pdu = l2cap_pdu(0x40, &[0x44; 64]);

    let event = [0x13, 0x05, 0x01, 0x05, 0x00, 0x01, 0x00];

    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x5, AclPacketBoundary::FirstAutoFlushable, &pdu[..20]));
    h4.transport_mut().send_packet(PacketIndicator::Event, &event);
    h4.transport_mut()
        .send_packet(PacketIndicator::AclData, &acl_packet(0x5, AclPacketBoundary::ContinuingFragment, &pdu[20..]));

    h4.receive();

    let received = &h4.host().received;

    assert_eq!(received.len(), 2);
    assert_eq!(&*received[0], &event);
    assert_eq!(&received[1][4..], &pdu[..]);
}
