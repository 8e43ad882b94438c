//! Scanning-sonar message definitions.
//!
//! Payload structs mirror the device's fixed little-endian layout and are
//! (de)serialized with `bincode`, which matches the wire format exactly for
//! fixed-size integer fields.

use serde::{Deserialize, Serialize};

use super::Frame;
use crate::error::ParseError;
use crate::transducer::DeviceSettings;

// =============================================================================
// Message ids
// =============================================================================

/// Intensity profile response, one per ping
pub const DEVICE_DATA: u16 = 2300;

/// Transducer command: step the motor, ping and listen
pub const TRANSDUCER: u16 = 2601;

/// Fixed size of the transducer command payload
pub const TRANSDUCER_PAYLOAD_SIZE: usize = 14;

/// Fixed size of the device-data header preceding the intensity bytes
pub const DEVICE_DATA_HEADER_SIZE: usize = 14;

// =============================================================================
// Transducer command
// =============================================================================

/// Payload of a [`TRANSDUCER`] command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransducerCommand {
    pub mode: u8,
    pub gain_setting: u8,
    /// Beam angle in grads (0-400)
    pub angle: u16,
    /// Transmit pulse duration in microseconds
    pub transmit_duration: u16,
    /// Sample period in 25 ns firmware ticks
    pub sample_period: u16,
    /// Acoustic frequency in kHz
    pub transmit_frequency: u16,
    pub number_of_samples: u16,
    /// 1 to transmit after stepping, 0 to step silently
    pub transmit: u8,
    pub reserved: u8,
}

impl TransducerCommand {
    /// Build the command for one ping at `angle` with the given settings.
    pub fn new(settings: &DeviceSettings, angle: u16) -> Self {
        TransducerCommand {
            mode: settings.mode,
            gain_setting: settings.gain,
            angle,
            transmit_duration: settings.transmit_duration,
            sample_period: settings.sample_period,
            transmit_frequency: settings.transmit_frequency,
            number_of_samples: settings.sample_count,
            transmit: 1,
            reserved: 0,
        }
    }

    /// Wrap the command in a wire frame.
    pub fn to_frame(&self) -> Frame {
        // fixed-size struct of integers, serialization cannot fail
        let payload = bincode::serialize(self).unwrap_or_default();
        debug_assert_eq!(payload.len(), TRANSDUCER_PAYLOAD_SIZE);
        Frame::new(TRANSDUCER, payload)
    }
}

// =============================================================================
// Device data
// =============================================================================

/// Header of a [`DEVICE_DATA`] response, before the intensity bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDataHeader {
    pub mode: u8,
    pub gain_setting: u8,
    pub angle: u16,
    pub transmit_duration: u16,
    pub sample_period: u16,
    pub transmit_frequency: u16,
    pub number_of_samples: u16,
    pub data_length: u16,
}

/// Decoded [`DEVICE_DATA`] response: the device's echo of its settings plus
/// the intensity profile for this ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceData {
    pub header: DeviceDataHeader,
    pub intensities: Vec<u8>,
}

/// Parse a [`DEVICE_DATA`] frame.
pub fn parse_device_data(frame: &Frame) -> Result<DeviceData, ParseError> {
    if frame.message_id != DEVICE_DATA {
        return Err(ParseError::UnexpectedMessage {
            expected: DEVICE_DATA,
            actual: frame.message_id,
        });
    }
    if frame.payload.len() < DEVICE_DATA_HEADER_SIZE {
        return Err(ParseError::TooShort {
            expected: DEVICE_DATA_HEADER_SIZE,
            actual: frame.payload.len(),
        });
    }

    let header: DeviceDataHeader =
        bincode::deserialize(&frame.payload[..DEVICE_DATA_HEADER_SIZE])?;
    let data = &frame.payload[DEVICE_DATA_HEADER_SIZE..];
    if data.len() != header.data_length as usize {
        return Err(ParseError::LengthMismatch {
            header_len: header.data_length as usize,
            actual_len: data.len(),
        });
    }

    Ok(DeviceData {
        header,
        intensities: data.to_vec(),
    })
}

/// Build a [`DEVICE_DATA`] frame from settings and intensities, as the device
/// would. Used by the emulation and the tests.
pub fn encode_device_data(settings: &DeviceSettings, angle: u16, intensities: &[u8]) -> Frame {
    let header = DeviceDataHeader {
        mode: settings.mode,
        gain_setting: settings.gain,
        angle,
        transmit_duration: settings.transmit_duration,
        sample_period: settings.sample_period,
        transmit_frequency: settings.transmit_frequency,
        number_of_samples: settings.sample_count,
        data_length: intensities.len() as u16,
    };
    let mut payload = bincode::serialize(&header).unwrap_or_default();
    payload.extend_from_slice(intensities);
    let mut frame = Frame::new(DEVICE_DATA, payload);
    // responses travel device-to-host
    frame.src_device_id = 1;
    frame.dst_device_id = 0;
    frame
}
