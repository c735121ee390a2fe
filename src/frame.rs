//! VE.Direct text-protocol frame assembly.
//!
//! The SmartShunt streams one register per line (`key<TAB>value`). A poll
//! cycle ends with the `H18` register; the CRC line (`Checksum`) carries no
//! data and is dropped wherever it appears.

use std::collections::HashMap;

/// Raw registers accumulated over one poll cycle, keyed by register name.
pub type RawFrame = HashMap<String, String>;

/// Register key that completes a poll cycle when it arrives.
const BOUNDARY_PREFIX: &str = "H18";

/// Register key prefix of the CRC line.
const CHECKSUM_PREFIX: &str = "Checksum";

/// Split one serial line into a (key, value) register pair.
///
/// Empty lines and lines without a TAB separator are protocol noise and
/// yield `None`; they must never reach the assembler.
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    line.split_once('\t')
}

/// Folds a stream of register pairs into complete raw frames.
///
/// Exactly one frame is accumulating at any time; it is taken atomically
/// when the boundary register arrives, leaving a fresh empty frame behind.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    current: RawFrame,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one register into the current frame.
    ///
    /// Returns the completed frame when `key` is the boundary register
    /// (which is included in the frame). Checksum lines are ignored.
    /// A repeated key before the boundary overwrites the earlier value.
    pub fn feed(&mut self, key: &str, value: &str) -> Option<RawFrame> {
        if key.starts_with(CHECKSUM_PREFIX) {
            return None;
        }

        self.current.insert(key.to_string(), value.to_string());

        if key.starts_with(BOUNDARY_PREFIX) {
            return Some(std::mem::take(&mut self.current));
        }

        None
    }

    /// Registers accumulated so far in the open frame.
    pub fn current(&self) -> &RawFrame {
        &self.current
    }
}
