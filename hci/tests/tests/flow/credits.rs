//! Tests for the command credits kept by the transport

use bo_tie_hci_h4::{MessageBuffer, TxStatus};
use bo_tie_hci_tests::{connect, ScriptedController};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Opcode of *Read Local Name*
const OPCODE: u16 = 0x0C14;

#[test]
fn controller_is_never_overrun() {
    for seed in 0..16u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let capacity = rng.gen_range(1..=4);

        let mut h4 = connect(ScriptedController::new(seed).with_command_capacity(capacity));

        let mut to_send = 40;

        while to_send > 0 {
            assert!(h4.command_credits() >= 0, "seed {}", seed);

            if h4.command_credits() > 0 {
                h4.send(MessageBuffer::command(OPCODE, &[]).unwrap());

                to_send -= 1;
            } else {
                assert!(h4.transport_mut().complete_next_command(), "seed {}", seed);

                h4.receive();
            }
        }

        while h4.transport_mut().complete_next_command() {
            h4.receive();
        }

        let controller = h4.transport();

        assert_eq!(controller.overruns(), 0, "seed {}", seed);
        assert_eq!(controller.in_flight(), 0);
        assert_eq!(h4.command_credits(), capacity as i32);

        // every completion was given to the host stack
        assert_eq!(h4.host().received.len(), 40);
        assert!(h4.host().sent.iter().all(|(_, status)| *status == TxStatus::Success));
    }
}

#[test]
fn command_status_updates_credits() {
    let mut h4 = connect(ScriptedController::new(1).with_command_capacity(3));

    h4.send(MessageBuffer::command(OPCODE, &[]).unwrap());

    assert_eq!(h4.command_credits(), 0);

    h4.transport_mut().status_next_command(0x00);

    h4.receive();

    assert_eq!(h4.command_credits(), 3);

    let status = &h4.host().received[0];

    assert_eq!(status[0], 0x0F);
    assert_eq!(&status[4..6], &OPCODE.to_le_bytes());
}

#[test]
fn credits_without_an_opcode() {
    let mut h4 = connect(ScriptedController::new(2).with_command_capacity(2));

    h4.transport_mut().announce_credits();

    h4.receive();

    assert_eq!(h4.command_credits(), 2);
    assert_eq!(h4.host().received.len(), 1);
}
