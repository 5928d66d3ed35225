//! Command registry and wire encoding for the control channel.
//!
//! A command datagram is `[u32 command_type][u32 value_type][value]`, all
//! little-endian. Value-type tags: 1 = boolean (sent as a u32 0/1),
//! 2 = signed 32-bit integer, 3 = 32-bit float.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

const VALUE_TAG_BOOL: u32 = 1;
const VALUE_TAG_INT: u32 = 2;
const VALUE_TAG_FLOAT: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

/// Documented range for a physically bounded command. Enforcement is the
/// caller's job; the session sends whatever it is given.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueRange {
    Int { min: i32, max: i32 },
    Float { min: f32, max: f32 },
}

#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub code: u32,
    pub range: Option<ValueRange>,
}

/// The builtin AC command set.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "tc_level", code: 1, range: Some(ValueRange::Int { min: 0, max: 10 }) },
    CommandSpec { name: "abs_level", code: 2, range: Some(ValueRange::Int { min: 0, max: 10 }) },
    CommandSpec { name: "brake_bias", code: 3, range: Some(ValueRange::Float { min: 0.0, max: 1.0 }) },
    CommandSpec { name: "turbo_pressure", code: 4, range: Some(ValueRange::Float { min: 0.0, max: 3.0 }) },
    CommandSpec { name: "headlights", code: 5, range: None },
    CommandSpec { name: "left_indicator", code: 6, range: None },
    CommandSpec { name: "right_indicator", code: 7, range: None },
    CommandSpec { name: "hazard_lights", code: 8, range: None },
    CommandSpec { name: "wipers", code: 9, range: None },
    CommandSpec { name: "pit_limiter", code: 10, range: None },
    CommandSpec { name: "open_pit_menu", code: 11, range: None },
    CommandSpec { name: "engine_map", code: 12, range: Some(ValueRange::Int { min: 1, max: 8 }) },
    CommandSpec { name: "ignition", code: 13, range: None },
];

/// Injected name-to-wire-code table; `default()` is the builtin set.
#[derive(Clone, Debug)]
pub struct CommandRegistry {
    entries: Vec<CommandSpec>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self {
            entries: COMMANDS.to_vec(),
        }
    }
}

impl CommandRegistry {
    pub fn new(entries: Vec<CommandSpec>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.iter().find(|spec| spec.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|spec| spec.name)
    }
}

pub fn encode_command(code: u32, value: CommandValue) -> Vec<u8> {
    let mut packet = Vec::with_capacity(12);
    packet.extend_from_slice(&code.to_le_bytes());
    match value {
        CommandValue::Bool(flag) => {
            packet.extend_from_slice(&VALUE_TAG_BOOL.to_le_bytes());
            packet.extend_from_slice(&u32::from(flag).to_le_bytes());
        }
        CommandValue::Int(v) => {
            packet.extend_from_slice(&VALUE_TAG_INT.to_le_bytes());
            packet.extend_from_slice(&v.to_le_bytes());
        }
        CommandValue::Float(v) => {
            packet.extend_from_slice(&VALUE_TAG_FLOAT.to_le_bytes());
            packet.extend_from_slice(&v.to_le_bytes());
        }
    }
    packet
}

/// Symmetric inverse of `encode_command`, for tooling and tests.
pub fn decode_command(data: &[u8]) -> Option<(u32, CommandValue)> {
    let mut cursor = Cursor::new(data);
    let code = cursor.read_u32::<LittleEndian>().ok()?;
    let tag = cursor.read_u32::<LittleEndian>().ok()?;
    let value = match tag {
        VALUE_TAG_BOOL => CommandValue::Bool(cursor.read_u32::<LittleEndian>().ok()? != 0),
        VALUE_TAG_INT => CommandValue::Int(cursor.read_i32::<LittleEndian>().ok()?),
        VALUE_TAG_FLOAT => CommandValue::Float(cursor.read_f32::<LittleEndian>().ok()?),
        _ => return None,
    };
    Some((code, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_every_command() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.lookup("tc_level").unwrap().code, 1);
        assert_eq!(registry.lookup("ignition").unwrap().code, 13);
        assert_eq!(registry.names().count(), 13);
        assert!(registry.lookup("launch_control").is_none());
    }

    #[test]
    fn bool_encodes_as_tagged_u32() {
        let packet = encode_command(5, CommandValue::Bool(true));
        assert_eq!(
            packet,
            [5, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]
        );
        let packet = encode_command(5, CommandValue::Bool(false));
        assert_eq!(&packet[8..], [0, 0, 0, 0]);
    }

    #[test]
    fn int_and_float_round_trip_bit_for_bit() {
        for value in [CommandValue::Int(-3), CommandValue::Int(i32::MAX)] {
            let packet = encode_command(1, value);
            assert_eq!(decode_command(&packet), Some((1, value)));
        }
        let packet = encode_command(3, CommandValue::Float(0.515));
        let (code, value) = decode_command(&packet).unwrap();
        assert_eq!(code, 3);
        match value {
            CommandValue::Float(f) => assert_eq!(f.to_bits(), 0.515f32.to_bits()),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_command(&[1, 0, 0]), None);
        // valid code, bogus value tag
        let mut packet = 1u32.to_le_bytes().to_vec();
        packet.extend_from_slice(&9u32.to_le_bytes());
        packet.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode_command(&packet), None);
    }
}
