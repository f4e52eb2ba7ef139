//! `SensorEvent` class payload (spec §4.4 table): a sensor id, a sub-class
//! byte, and sub-class-specific data. The numeric sensor's present-reading
//! width depends on its own `sensor_data_size` byte, so this is hand
//! decoded rather than derived.

use crate::error::PldmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEventData {
    pub sensor_id: u16,
    pub payload: SensorEventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEventPayload {
    StateSensorState(StateSensorState),
    NumericSensorState(NumericSensorState),
    /// A sub-class this crate does not interpret; carried through so the
    /// dispatcher can no-op rather than fail the whole decode.
    Other { sub_class: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSensorState {
    pub sensor_offset: u8,
    pub event_state: u8,
    pub previous_event_state: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDataSize {
    Uint8,
    Sint8,
    Uint16,
    Sint16,
    Uint32,
    Sint32,
}

impl SensorDataSize {
    fn byte_width(self) -> usize {
        match self {
            SensorDataSize::Uint8 | SensorDataSize::Sint8 => 1,
            SensorDataSize::Uint16 | SensorDataSize::Sint16 => 2,
            SensorDataSize::Uint32 | SensorDataSize::Sint32 => 4,
        }
    }

    fn from_u8(v: u8) -> Result<Self, PldmError> {
        match v {
            0 => Ok(SensorDataSize::Uint8),
            1 => Ok(SensorDataSize::Sint8),
            2 => Ok(SensorDataSize::Uint16),
            3 => Ok(SensorDataSize::Sint16),
            4 => Ok(SensorDataSize::Uint32),
            5 => Ok(SensorDataSize::Sint32),
            other => Err(PldmError::decode_failed(format!(
                "unknown sensor data size 0x{other:02x}"
            ))),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SensorDataSize::Uint8 => 0,
            SensorDataSize::Sint8 => 1,
            SensorDataSize::Uint16 => 2,
            SensorDataSize::Sint16 => 3,
            SensorDataSize::Uint32 => 4,
            SensorDataSize::Sint32 => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSensorState {
    pub event_state: u8,
    pub previous_event_state: u8,
    pub sensor_data_size: SensorDataSize,
    /// Raw little-endian reading, sign/width per `sensor_data_size`.
    pub present_reading: i64,
}

const STATE_SENSOR_STATE: u8 = 0x00;
const NUMERIC_SENSOR_STATE: u8 = 0x01;

impl SensorEventData {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.sensor_id.to_le_bytes());
        match &self.payload {
            SensorEventPayload::StateSensorState(s) => {
                out.push(STATE_SENSOR_STATE);
                out.push(s.sensor_offset);
                out.push(s.event_state);
                out.push(s.previous_event_state);
            }
            SensorEventPayload::NumericSensorState(n) => {
                out.push(NUMERIC_SENSOR_STATE);
                out.push(n.event_state);
                out.push(n.previous_event_state);
                out.push(n.sensor_data_size.as_u8());
                let width = n.sensor_data_size.byte_width();
                out.extend_from_slice(&n.present_reading.to_le_bytes()[..width]);
            }
            SensorEventPayload::Other { sub_class, data } => {
                out.push(*sub_class);
                out.extend_from_slice(data);
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PldmError> {
        if bytes.len() < 3 {
            return Err(PldmError::InvalidLength);
        }
        let sensor_id = u16::from_le_bytes(bytes[0..2].try_into().unwrap());
        let sub_class = bytes[2];
        let rest = &bytes[3..];
        let payload = match sub_class {
            STATE_SENSOR_STATE => {
                if rest.len() < 3 {
                    return Err(PldmError::InvalidLength);
                }
                SensorEventPayload::StateSensorState(StateSensorState {
                    sensor_offset: rest[0],
                    event_state: rest[1],
                    previous_event_state: rest[2],
                })
            }
            NUMERIC_SENSOR_STATE => {
                if rest.len() < 3 {
                    return Err(PldmError::InvalidLength);
                }
                let sensor_data_size = SensorDataSize::from_u8(rest[2])?;
                let width = sensor_data_size.byte_width();
                if rest.len() < 3 + width {
                    return Err(PldmError::InvalidLength);
                }
                let mut buf = [0u8; 8];
                buf[..width].copy_from_slice(&rest[3..3 + width]);
                let present_reading = i64::from_le_bytes(buf);
                SensorEventPayload::NumericSensorState(NumericSensorState {
                    event_state: rest[0],
                    previous_event_state: rest[1],
                    sensor_data_size,
                    present_reading,
                })
            }
            other => SensorEventPayload::Other {
                sub_class: other,
                data: rest.to_vec(),
            },
        };
        Ok(SensorEventData { sensor_id, payload })
    }
}
