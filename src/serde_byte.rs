//! (De)serialize a configuration byte as a one character string, falling
//! back to a number for bytes that are not ASCII.

use std::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Serializer;

pub fn serialize<S: Serializer>(byte: &u8, ser: S) -> Result<S::Ok, S::Error> {
    if byte.is_ascii() {
        let mut buf = [0; 4];
        ser.serialize_str(char::from(*byte).encode_utf8(&mut buf))
    } else {
        ser.serialize_u8(*byte)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<u8, D::Error> {
    de.deserialize_any(ByteVisitor)
}

struct ByteVisitor;

impl<'de> Visitor<'de> for ByteVisitor {
    type Value = u8;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a single byte character or a number from 0 to 255")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u8, E> {
        match *v.as_bytes() {
            [byte] => Ok(byte),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u8, E> {
        if v <= u64::from(u8::MAX) {
            Ok(v as u8)
        } else {
            Err(E::invalid_value(Unexpected::Unsigned(v), &self))
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u8, E> {
        if 0 <= v && v <= i64::from(u8::MAX) {
            Ok(v as u8)
        } else {
            Err(E::invalid_value(Unexpected::Signed(v), &self))
        }
    }
}
