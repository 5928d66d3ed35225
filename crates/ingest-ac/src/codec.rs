//! Wire codec for AC's remote telemetry datagrams.
//!
//! Every packet starts with a 4-byte little-endian type tag. The update
//! payload is a fixed little-endian layout read through an explicit offset
//! table after a single up-front length check; bytes past the table are
//! extension fields and are ignored.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

pub const PACKET_HANDSHAKE: u32 = 0;
pub const PACKET_UPDATE: u32 = 1;
pub const PACKET_SPOT: u32 = 2;
pub const PACKET_DISMISS: u32 = 3;

/// Minimum update payload length.
pub const UPDATE_PAYLOAD_MIN: usize = 328;

pub const KMH_TO_MPH: f32 = 0.621371;

// Byte offsets into the update payload.
pub(crate) const OFF_SPEED_KMH: usize = 0;
pub(crate) const OFF_RPM: usize = 12;
pub(crate) const OFF_MAX_RPM: usize = 16;
pub(crate) const OFF_GEAR: usize = 20;
pub(crate) const OFF_G_FORCE: usize = 24; // lateral, longitudinal, vertical
pub(crate) const OFF_LAP_TIME_MS: usize = 36;
pub(crate) const OFF_LAST_LAP_MS: usize = 40;
pub(crate) const OFF_BEST_LAP_MS: usize = 44;
pub(crate) const OFF_LAP_COUNT: usize = 48;
pub(crate) const OFF_FUEL: usize = 52;
// 56..68 is world position, unused here
pub(crate) const OFF_VELOCITY: usize = 68;
pub(crate) const OFF_ACCELERATION: usize = 80;
pub(crate) const OFF_WHEEL_ANGULAR_SPEED: usize = 92;
pub(crate) const OFF_WHEEL_SLIP: usize = 108;
pub(crate) const OFF_WHEEL_LOAD: usize = 124;
pub(crate) const OFF_TIRE_PRESSURE: usize = 140;
pub(crate) const OFF_TIRE_TEMP_CORE: usize = 156;
pub(crate) const OFF_SUSPENSION_TRAVEL: usize = 172;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("packet truncated ({len} bytes)")]
    Truncated { len: usize },
    #[error("unknown packet type {0}")]
    UnknownType(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeInfo {
    pub car_name: String,
    pub driver_name: String,
}

/// Fields decoded from one update payload, before derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarUpdate {
    pub speed_kmh: f32,
    pub speed_mph: f32,
    pub rpm: f32,
    pub max_rpm: f32,
    pub gear: i32,
    pub g_force_lateral: f32,
    pub g_force_longitudinal: f32,
    pub g_force_vertical: f32,
    pub lap_time_s: f32,
    pub last_lap_s: f32,
    pub best_lap_s: f32,
    pub lap_count: i32,
    pub fuel_l: f32,
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    pub wheel_angular_speed: [f32; 4],
    pub wheel_slip: [f32; 4],
    pub wheel_load: [f32; 4],
    pub tire_pressure: [f32; 4],
    pub tire_temperature_core: [f32; 4],
    pub suspension_travel: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPacket {
    Handshake(HandshakeInfo),
    Update(CarUpdate),
    Spot,
    Dismiss,
}

pub fn decode(data: &[u8]) -> Result<DecodedPacket, DecodeError> {
    let mut cursor = Cursor::new(data);
    let tag = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| DecodeError::Truncated { len: data.len() })?;
    let payload = &data[4..];

    match tag {
        PACKET_HANDSHAKE => Ok(DecodedPacket::Handshake(decode_handshake(payload))),
        PACKET_UPDATE => decode_update(payload).map(DecodedPacket::Update),
        PACKET_SPOT => Ok(DecodedPacket::Spot),
        PACKET_DISMISS => Ok(DecodedPacket::Dismiss),
        other => Err(DecodeError::UnknownType(other)),
    }
}

/// Short handshake payloads degrade to empty names rather than failing.
fn decode_handshake(payload: &[u8]) -> HandshakeInfo {
    let mut cursor = Cursor::new(payload);
    let car_len = cursor.read_u32::<LittleEndian>();
    let driver_len = cursor.read_u32::<LittleEndian>();
    let (car_len, driver_len) = match (car_len, driver_len) {
        (Ok(car), Ok(driver)) => (car as usize, driver as usize),
        _ => return HandshakeInfo::default(),
    };

    let names = &payload[8..];
    let car_end = car_len.min(names.len());
    let driver_end = names.len().min(car_end + driver_len);
    HandshakeInfo {
        car_name: decode_name(&names[..car_end]),
        driver_name: decode_name(&names[car_end..driver_end]),
    }
}

fn decode_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

fn decode_update(payload: &[u8]) -> Result<CarUpdate, DecodeError> {
    if payload.len() < UPDATE_PAYLOAD_MIN {
        return Err(DecodeError::Truncated { len: payload.len() });
    }

    let speed_kmh = f32_at(payload, OFF_SPEED_KMH);
    Ok(CarUpdate {
        speed_kmh,
        speed_mph: speed_kmh * KMH_TO_MPH,
        rpm: f32_at(payload, OFF_RPM),
        max_rpm: f32_at(payload, OFF_MAX_RPM),
        gear: i32_at(payload, OFF_GEAR),
        g_force_lateral: f32_at(payload, OFF_G_FORCE),
        g_force_longitudinal: f32_at(payload, OFF_G_FORCE + 4),
        g_force_vertical: f32_at(payload, OFF_G_FORCE + 8),
        lap_time_s: i32_at(payload, OFF_LAP_TIME_MS) as f32 / 1000.0,
        last_lap_s: i32_at(payload, OFF_LAST_LAP_MS) as f32 / 1000.0,
        best_lap_s: i32_at(payload, OFF_BEST_LAP_MS) as f32 / 1000.0,
        lap_count: i32_at(payload, OFF_LAP_COUNT),
        fuel_l: f32_at(payload, OFF_FUEL),
        velocity: f32x3_at(payload, OFF_VELOCITY),
        acceleration: f32x3_at(payload, OFF_ACCELERATION),
        wheel_angular_speed: f32x4_at(payload, OFF_WHEEL_ANGULAR_SPEED),
        wheel_slip: f32x4_at(payload, OFF_WHEEL_SLIP),
        wheel_load: f32x4_at(payload, OFF_WHEEL_LOAD),
        tire_pressure: f32x4_at(payload, OFF_TIRE_PRESSURE),
        tire_temperature_core: f32x4_at(payload, OFF_TIRE_TEMP_CORE),
        suspension_travel: f32x4_at(payload, OFF_SUSPENSION_TRAVEL),
    })
}

// The length precheck in decode_update keeps these in bounds; a short slice
// still reads as zero instead of panicking.
fn f32_at(payload: &[u8], offset: usize) -> f32 {
    payload
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
        .unwrap_or(0.0)
}

fn i32_at(payload: &[u8], offset: usize) -> i32 {
    payload
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
        .unwrap_or(0)
}

fn f32x3_at(payload: &[u8], offset: usize) -> [f32; 3] {
    std::array::from_fn(|i| f32_at(payload, offset + i * 4))
}

fn f32x4_at(payload: &[u8], offset: usize) -> [f32; 4] {
    std::array::from_fn(|i| f32_at(payload, offset + i * 4))
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn rejects_short_header() {
        assert_eq!(decode(&[1, 0]), Err(DecodeError::Truncated { len: 2 }));
        assert_eq!(decode(&[]), Err(DecodeError::Truncated { len: 0 }));
    }

    #[test]
    fn rejects_unknown_tag() {
        let packet = datagram(99, &[]);
        assert_eq!(decode(&packet), Err(DecodeError::UnknownType(99)));
    }

    #[test]
    fn spot_and_dismiss_are_tag_only() {
        assert_eq!(decode(&datagram(PACKET_SPOT, &[1, 2, 3])), Ok(DecodedPacket::Spot));
        assert_eq!(decode(&datagram(PACKET_DISMISS, &[])), Ok(DecodedPacket::Dismiss));
    }

    #[test]
    fn decodes_handshake_names() {
        let payload = handshake_payload(b"Lotus Exige\0\0", b"A. Senna");
        let packet = datagram(PACKET_HANDSHAKE, &payload);
        match decode(&packet).unwrap() {
            DecodedPacket::Handshake(info) => {
                assert_eq!(info.car_name, "Lotus Exige");
                assert_eq!(info.driver_name, "A. Senna");
            }
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    #[test]
    fn short_handshake_yields_empty_names() {
        let packet = datagram(PACKET_HANDSHAKE, &[0, 0, 0]);
        assert_eq!(
            decode(&packet),
            Ok(DecodedPacket::Handshake(HandshakeInfo::default()))
        );
    }

    #[test]
    fn handshake_lengths_clamped_to_available_bytes() {
        // claims a 100-byte car name but only 3 bytes follow
        let mut payload = Vec::new();
        payload.extend_from_slice(&100u32.to_le_bytes());
        payload.extend_from_slice(&5u32.to_le_bytes());
        payload.extend_from_slice(b"abc");
        let packet = datagram(PACKET_HANDSHAKE, &payload);
        match decode(&packet).unwrap() {
            DecodedPacket::Handshake(info) => {
                assert_eq!(info.car_name, "abc");
                assert_eq!(info.driver_name, "");
            }
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    #[test]
    fn handshake_invalid_utf8_is_replaced() {
        let payload = handshake_payload(&[0xff, 0xfe, b'X'], b"ok");
        let packet = datagram(PACKET_HANDSHAKE, &payload);
        match decode(&packet).unwrap() {
            DecodedPacket::Handshake(info) => {
                assert!(info.car_name.ends_with('X'));
                assert_eq!(info.driver_name, "ok");
            }
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_update_payload() {
        let packet = datagram(PACKET_UPDATE, &vec![0u8; UPDATE_PAYLOAD_MIN - 1]);
        assert_eq!(
            decode(&packet),
            Err(DecodeError::Truncated {
                len: UPDATE_PAYLOAD_MIN - 1
            })
        );
    }

    #[test]
    fn decodes_update_fields_from_offsets() {
        let packet = datagram(PACKET_UPDATE, &sample_update_payload());
        let update = match decode(&packet).unwrap() {
            DecodedPacket::Update(u) => u,
            other => panic!("expected update, got {other:?}"),
        };

        assert_eq!(update.speed_kmh, 120.0);
        assert!((update.speed_mph - 74.56452).abs() < 1e-3);
        assert_eq!(update.rpm, 7200.0);
        assert_eq!(update.max_rpm, 8000.0);
        assert_eq!(update.gear, 4);
        assert_eq!(update.g_force_lateral, 1.2);
        assert_eq!(update.g_force_longitudinal, 0.9);
        assert_eq!(update.g_force_vertical, 0.1);
        assert!((update.lap_time_s - 95.432).abs() < 1e-4);
        assert!((update.last_lap_s - 96.010).abs() < 1e-4);
        assert!((update.best_lap_s - 94.500).abs() < 1e-4);
        assert_eq!(update.lap_count, 12);
        assert_eq!(update.fuel_l, 42.5);
        assert_eq!(update.velocity, [33.0, 0.5, -1.0]);
        assert_eq!(update.acceleration, [2.0, 0.0, 0.0]);
        // FL, FR, RL, RR ordering preserved from the wire
        assert_eq!(update.wheel_angular_speed, [51.0, 0.5, 30.0, 49.0]);
        assert_eq!(update.wheel_slip, [0.05, 0.2, 0.3, 0.0]);
        assert_eq!(update.wheel_load, [3100.0, 2900.0, 2500.0, 2400.0]);
        assert_eq!(update.tire_pressure, [1.9; 4]);
        assert_eq!(update.tire_temperature_core, [85.0, 88.0, 80.0, 81.0]);
        assert_eq!(update.suspension_travel, [0.02, 0.03, 0.01, 0.015]);
    }

    #[test]
    fn tolerates_extension_bytes_past_the_table() {
        let mut payload = sample_update_payload();
        payload.extend_from_slice(&[0xab; 72]);
        let packet = datagram(PACKET_UPDATE, &payload);
        match decode(&packet).unwrap() {
            DecodedPacket::Update(update) => assert_eq!(update.speed_kmh, 120.0),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn negative_gear_is_reverse() {
        let mut payload = empty_update_payload();
        put_i32(&mut payload, OFF_GEAR, -1);
        let packet = datagram(PACKET_UPDATE, &payload);
        match decode(&packet).unwrap() {
            DecodedPacket::Update(update) => assert_eq!(update.gear, -1),
            other => panic!("expected update, got {other:?}"),
        }
    }
}
