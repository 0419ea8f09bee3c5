//! M-Bus long-frame reassembly.
//!
//! The meter pushes one logical telegram as one or more long frames
//! (`0x68 L L 0x68 C A CI STSAP DTSAP <payload> CS 0x16`). The payloads of all
//! frames found in the receive buffer are concatenated into the ciphertext that the
//! DLMS layer parses.

use alloc::vec::Vec;
use core::convert::TryFrom;

use log::{debug, trace};
use thiserror::Error;

use crate::control_information::ControlInformation;

pub(crate) const START_BYTE: u8 = 0x68;
pub(crate) const STOP_BYTE: u8 = 0x16;

/// `0x68 L L 0x68`
pub(crate) const HEADER_INTRO_LENGTH: usize = 4;
/// Intro plus C, A, CI, STSAP and DTSAP.
pub(crate) const FULL_HEADER_LENGTH: usize = 9;
/// Checksum and stop byte.
pub(crate) const FOOTER_LENGTH: usize = 2;
/// Control bytes counted in `L` before the payload starts.
pub(crate) const CONTROL_LENGTH: usize = FULL_HEADER_LENGTH - HEADER_INTRO_LENGTH;

const START1_OFFSET: usize = 0;
const LENGTH1_OFFSET: usize = 1;
const LENGTH2_OFFSET: usize = 2;
const START2_OFFSET: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("start bytes do not match at offset {offset}")]
    BadStartMarker { offset: usize },
    #[error("length bytes do not match at offset {offset}: {length1:#04x} != {length2:#04x}")]
    LengthMismatch { offset: usize, length1: u8, length2: u8 },
    #[error("frame length {length} at offset {offset} cannot hold the control fields")]
    LengthTooSmall { offset: usize, length: u8 },
    #[error("frame at offset {offset} needs {needed} byte(s), only {available} received")]
    Truncated { offset: usize, needed: usize, available: usize },
    #[error("invalid stop byte {found:#04x} at offset {offset}")]
    BadStopMarker { offset: usize, found: u8 },
}

/// One physical long frame, borrowed from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MbusFrame<'a> {
    pub length: u8,
    pub control: u8,
    pub address: u8,
    pub control_information: u8,
    pub source_tsap: u8,
    pub destination_tsap: u8,
    pub payload: &'a [u8],
    pub checksum: u8,
}

impl<'a> MbusFrame<'a> {
    /// Validates the frame starting at `offset` and returns it together with the
    /// offset of the byte following its stop byte.
    pub fn parse_at(buffer: &'a [u8], offset: usize) -> Result<(Self, usize), FramingError> {
        let available = buffer.len().saturating_sub(offset);

        if available < HEADER_INTRO_LENGTH {
            return Err(FramingError::Truncated { offset, needed: HEADER_INTRO_LENGTH, available });
        }

        let frame = &buffer[offset..];

        if frame[START1_OFFSET] != START_BYTE || frame[START2_OFFSET] != START_BYTE {
            return Err(FramingError::BadStartMarker { offset });
        }

        let (length1, length2) = (frame[LENGTH1_OFFSET], frame[LENGTH2_OFFSET]);
        if length1 != length2 {
            return Err(FramingError::LengthMismatch { offset, length1, length2 });
        }

        let length = usize::from(length1);
        if length < CONTROL_LENGTH {
            return Err(FramingError::LengthTooSmall { offset, length: length1 });
        }

        let frame_length = HEADER_INTRO_LENGTH + length + FOOTER_LENGTH;
        if available < frame_length {
            return Err(FramingError::Truncated { offset, needed: frame_length, available });
        }

        let stop = frame[frame_length - 1];
        if stop != STOP_BYTE {
            return Err(FramingError::BadStopMarker { offset: offset + frame_length - 1, found: stop });
        }

        let frame = Self {
            length: length1,
            control: frame[4],
            address: frame[5],
            control_information: frame[6],
            source_tsap: frame[7],
            destination_tsap: frame[8],
            payload: &frame[FULL_HEADER_LENGTH..HEADER_INTRO_LENGTH + length],
            checksum: frame[frame_length - 2],
        };

        Ok((frame, offset + frame_length))
    }

    pub fn control_information(&self) -> Result<ControlInformation, u8> {
        ControlInformation::try_from(self.control_information)
    }

    /// Arithmetic sum of every byte from the C field to the end of the payload.
    pub fn computed_checksum(&self) -> u8 {
        [
            self.control,
            self.address,
            self.control_information,
            self.source_tsap,
            self.destination_tsap,
        ]
        .iter()
        .chain(self.payload)
        .fold(0u8, |sum, &b| sum.wrapping_add(b))
    }

    pub fn checksum_valid(&self) -> bool {
        self.computed_checksum() == self.checksum
    }
}

/// Reassembles every frame in `buffer` into one contiguous payload.
///
/// The whole buffer must consist of back-to-back valid frames; any violation
/// aborts the telegram.
pub fn assemble(buffer: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut payload = Vec::with_capacity(buffer.len());
    let mut frame_offset = 0;

    loop {
        let (frame, next_offset) = MbusFrame::parse_at(buffer, frame_offset)?;

        trace!(
            "M-Bus frame at {}: L={} CI={:?} payload={} byte(s)",
            frame_offset,
            frame.length,
            frame.control_information(),
            frame.payload.len()
        );
        if !frame.checksum_valid() {
            debug!(
                "M-Bus frame at {} has checksum {:#04x}, computed {:#04x}",
                frame_offset,
                frame.checksum,
                frame.computed_checksum()
            );
        }

        payload.extend_from_slice(frame.payload);
        frame_offset = next_offset;

        if frame_offset >= buffer.len() {
            break;
        }
    }

    Ok(payload)
}

/// Wraps `payload` into long frames of at most `max_payload` bytes each, the way a
/// meter segments a push telegram.
#[cfg(test)]
pub(crate) fn encode_frames(payload: &[u8], max_payload: usize) -> Vec<u8> {
    let chunks: Vec<&[u8]> = payload.chunks(max_payload).collect();
    let mut out = Vec::new();

    for (segment, chunk) in chunks.iter().enumerate() {
        let last = segment + 1 == chunks.len();
        let ci = (segment as u8 & 0x0f) | if last { 0x10 } else { 0x00 };
        let control = [0x53, 0xff, ci, 0x67, 0xdb];
        let length = (control.len() + chunk.len()) as u8;
        let checksum = control.iter().chain(chunk.iter()).fold(0u8, |s, &b| s.wrapping_add(b));

        out.extend_from_slice(&[START_BYTE, length, length, START_BYTE]);
        out.extend_from_slice(&control);
        out.extend_from_slice(chunk);
        out.extend_from_slice(&[checksum, STOP_BYTE]);
    }

    out
}
