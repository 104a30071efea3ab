//! Tests for sending ACL data larger than the controller's ACL data size

use bo_tie_hci_h4::{BufferKind, ControllerKind, MessageBuffer, TxStatus};
use bo_tie_hci_tests::{acl_packet, connect, l2cap_pdu, run_discovery, Frame, ScriptedController};
use bo_tie_hci_util::{AclHeader, AclPacketBoundary, PacketIndicator};

const HANDLE: u16 = 0x0A1;

fn outbound_acl(frames: Vec<Frame>) -> Vec<Vec<u8>> {
    frames
        .into_iter()
        .filter(|frame| frame.indicator == PacketIndicator::AclData)
        .map(|frame| frame.packet)
        .collect()
}

fn le_acl_buffer(payload_len: usize) -> (MessageBuffer, Vec<u8>) {
    let pdu = l2cap_pdu(0x04, &(0..payload_len).map(|v| v as u8).collect::<Vec<_>>());

    let packet = acl_packet(HANDLE, AclPacketBoundary::FirstNonFlushable, &pdu);

    let mut buffer = MessageBuffer::from_packet(BufferKind::ToControllerAcl, &packet);

    buffer.set_controller(ControllerKind::Le);

    (buffer, pdu)
}

#[test]
fn segments_use_discovered_size() {
    let data_size = 40;

    let mut h4 = connect(ScriptedController::new(1).with_acl_data_sizes(310, data_size));

    run_discovery(&mut h4);

    assert_eq!(h4.acl_data_sizes().le, data_size);

    h4.transport_mut().take_frames();

    // an ACL payload of 3 * D + 10 bytes
    let (buffer, pdu) = le_acl_buffer(3 * usize::from(data_size) + 10 - 4);

    assert_eq!(pdu.len(), 3 * usize::from(data_size) + 10);

    h4.send(buffer);

    let segments = outbound_acl(h4.transport_mut().take_frames());

    assert_eq!(segments.len(), 4);

    let mut recombined = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let header = AclHeader::from_bytes(segment).unwrap();

        assert_eq!(header.raw_handle, HANDLE);
        assert_eq!(usize::from(header.data_length), segment.len() - AclHeader::SIZE);

        if i == 0 {
            assert_eq!(header.packet_boundary_flag, AclPacketBoundary::FirstNonFlushable);
        } else {
            assert_eq!(header.packet_boundary_flag, AclPacketBoundary::ContinuingFragment);
        }

        if i < 3 {
            assert_eq!(header.data_length, data_size);
        } else {
            assert_eq!(header.data_length, 10);
        }

        recombined.extend_from_slice(&segment[AclHeader::SIZE..]);
    }

    assert_eq!(recombined, pdu);

    let (_, status) = h4.host_mut().sent.pop().unwrap();

    assert_eq!(status, TxStatus::Success);
}

#[test]
fn budgeted_transmission() {
    let mut h4 = connect(ScriptedController::new(2));

    let (mut buffer, pdu) = le_acl_buffer(200);

    buffer.set_fragment_budget(3);

    let mut passes = 0;

    loop {
        passes += 1;

        h4.send(buffer);

        let (returned, status) = h4.host_mut().sent.pop().unwrap();

        if status == TxStatus::Success {
            break;
        }

        assert_eq!(status, TxStatus::Fragment);
        assert_eq!(returned.kind(), BufferKind::SegmentTransmitted);

        buffer = returned;

        buffer.set_fragment_budget(3);
    }

    // 204 bytes at 27 bytes a segment is 8 segments, written three at a time
    assert_eq!(passes, 3);

    let segments = outbound_acl(h4.transport_mut().take_frames());

    assert_eq!(segments.len(), 8);

    let recombined: Vec<u8> = segments.iter().flat_map(|s| s[AclHeader::SIZE..].iter().copied()).collect();

    assert_eq!(recombined, pdu);
}

#[test]
fn classic_and_le_sizes_are_separate() {
    let mut h4 = connect(ScriptedController::new(3).with_acl_data_sizes(64, 0));

    run_discovery(&mut h4);

    // a LE size of zero means the LE controller uses the BR/EDR buffers
    assert_eq!(h4.acl_data_sizes().le, 64);

    h4.transport_mut().take_frames();

    let (buffer, _) = le_acl_buffer(100);

    h4.send(buffer);

    let segments = outbound_acl(h4.transport_mut().take_frames());

    assert_eq!(segments.iter().map(|s| s.len()).collect::<Vec<_>>(), [68, 44]);
}
