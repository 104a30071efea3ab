//! Tests for commands sent by the transport itself

use bo_tie_hci_h4::{H4Config, InternalCommandError, MessageBuffer, PostloadStatus};
use bo_tie_hci_tests::{connect, connect_with, run_discovery, ScriptedController};
use bo_tie_hci_util::PacketIndicator;
use std::cell::RefCell;
use std::rc::Rc;

const RESET: u16 = 0x0C03;

#[test]
fn callback_receives_the_completion() {
    let mut h4 = connect(ScriptedController::new(1));

    let completed = Rc::new(RefCell::new(Vec::new()));

    let record = completed.clone();

    h4.send_internal_command(RESET, MessageBuffer::command(RESET, &[]).unwrap(), move |_, event| {
        record.borrow_mut().push(event.to_vec())
    })
    .unwrap();

    // the command buffer goes back to the provider rather than the host stack
    assert!(h4.host().sent.is_empty());
    assert_eq!(h4.pending_internal_commands(), 1);

    h4.transport_mut().complete_next_command();

    h4.receive();

    assert_eq!(completed.borrow().len(), 1);
    assert_eq!(&completed.borrow()[0][3..5], &RESET.to_le_bytes());
    assert!(h4.host().received.is_empty());
    assert_eq!(h4.pending_internal_commands(), 0);
    assert_eq!(h4.command_credits(), 1);
}

#[test]
fn queue_is_bounded() {
    let mut h4 = connect_with(
        H4Config::default().internal_command_capacity(8),
        ScriptedController::new(2).with_command_capacity(16),
    );

    for _ in 0..8 {
        h4.send_internal_command(RESET, MessageBuffer::command(RESET, &[]).unwrap(), |_, _| ())
            .unwrap();
    }

    let error = h4
        .send_internal_command(RESET, MessageBuffer::command(RESET, &[0xAA]).unwrap(), |_, _| ())
        .unwrap_err();

    assert!(matches!(error, InternalCommandError::QueueFull { opcode: RESET, .. }));

    // nothing was sent for the rejected command
    assert_eq!(h4.transport().frames().len(), 8);
    assert_eq!(&*error.into_buffer(), &[0x03, 0x0C, 0x01, 0xAA]);
}

#[test]
fn bootstrap_discovers_both_sizes() {
    let mut h4 = connect(ScriptedController::new(3).with_acl_data_sizes(310, 251));

    run_discovery(&mut h4);

    assert_eq!(h4.host().postload, [PostloadStatus::Success]);
    assert_eq!(h4.acl_data_sizes().classic, 310);
    assert_eq!(h4.acl_data_sizes().le, 251);

    // neither command nor completion reached the host stack
    assert!(h4.host().received.is_empty());
    assert!(h4.host().sent.is_empty());
    assert_eq!(h4.provider().outstanding(), 0);

    let opcodes: Vec<&[u8]> = h4
        .transport()
        .frames()
        .iter()
        .filter(|frame| frame.indicator == PacketIndicator::Command)
        .map(|frame| &frame.packet[..2])
        .collect();

    assert_eq!(opcodes, [&[0x05, 0x10][..], &[0x02, 0x20][..]]);
}

#[test]
fn bootstrap_shared_buffers() {
    let mut h4 = connect(ScriptedController::new(4).with_acl_data_sizes(310, 0));

    run_discovery(&mut h4);

    assert_eq!(h4.host().postload, [PostloadStatus::Success]);
    assert_eq!(h4.acl_data_sizes().le, 310);
}

#[test]
fn bootstrap_classic_failure() {
    let mut h4 = connect(ScriptedController::new(5).with_failing_command(0x1005));

    run_discovery(&mut h4);

    assert_eq!(h4.host().postload, [PostloadStatus::Failure]);
    assert_eq!(h4.transport().frames().len(), 1);
    assert_eq!(h4.acl_data_sizes().classic, H4Config::DEFAULT_CLASSIC_ACL_DATA_SIZE);
}

#[test]
fn bootstrap_le_failure_keeps_initial_size() {
    let mut h4 = connect(
        ScriptedController::new(6)
            .with_acl_data_sizes(600, 200)
            .with_failing_command(0x2002),
    );

    run_discovery(&mut h4);

    assert_eq!(h4.host().postload, [PostloadStatus::Success]);
    assert_eq!(h4.acl_data_sizes().classic, 600);
    assert_eq!(h4.acl_data_sizes().le, H4Config::DEFAULT_LE_ACL_DATA_SIZE);
}
