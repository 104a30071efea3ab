//! Packet tracers

use crate::driver::{Direction, TraceSink};
use alloc::vec::Vec;
use bo_tie_hci_util::PacketIndicator;
use core::fmt;

/// A packet captured by a [`SnoopRecorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    pub indicator: PacketIndicator,
    pub direction: Direction,
    pub packet: Vec<u8>,
}

/// Records every traced packet in memory
#[derive(Debug, Default)]
pub struct SnoopRecorder {
    captured: Vec<CapturedPacket>,
}

impl SnoopRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> &[CapturedPacket] {
        &self.captured
    }

    /// Iterate over the captured packets travelling in `direction`
    pub fn filter(&self, direction: Direction) -> impl Iterator<Item = &CapturedPacket> + '_ {
        self.captured.iter().filter(move |c| c.direction == direction)
    }

    /// Take the captured packets, leaving the recorder empty
    pub fn take(&mut self) -> Vec<CapturedPacket> {
        core::mem::take(&mut self.captured)
    }
}

impl TraceSink for SnoopRecorder {
    fn capture(&mut self, indicator: PacketIndicator, packet: &[u8], direction: Direction) {
        self.captured.push(CapturedPacket {
            indicator,
            direction,
            packet: packet.to_vec(),
        })
    }
}

/// Emits every traced packet through `log::trace!`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

struct HexDump<'a>(&'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }

            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

impl TraceSink for LogTrace {
    fn capture(&mut self, indicator: PacketIndicator, packet: &[u8], direction: Direction) {
        let arrow = match direction {
            Direction::Inbound => "<-",
            Direction::Outbound => "->",
        };

        log::trace!("(H4) {} {} [{}]", arrow, indicator, HexDump(packet));
    }
}
