//! MsgPack codec using `rmp-serde`.
//!
//! Uses `to_vec_named` so structs serialize as maps keyed by field name
//! rather than positional arrays. Object messages crossing the wire are
//! self-describing, which lets independently versioned peers add fields
//! without breaking older readers.

use crate::error::Result;

/// MessagePack codec for structured object messages.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes in struct-as-map format.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct CommandMessage {
        id: u32,
        command: String,
        interactive: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = CommandMessage {
            id: 42,
            command: "get-status".to_string(),
            interactive: true,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: CommandMessage = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_struct_encodes_as_map() {
        // Struct-as-map keeps messages self-describing: the leading byte
        // must be a fixmap (0x8X), not a fixarray (0x9X).
        let message = CommandMessage {
            id: 1,
            command: "x".to_string(),
            interactive: false,
        };

        let encoded = MsgPackCodec::encode(&message).unwrap();
        assert_eq!(
            encoded[0] & 0xF0,
            0x80,
            "expected map format (0x8X), got {:02X}",
            encoded[0]
        );
    }

    #[test]
    fn test_encode_decode_collections() {
        let items = vec!["out".to_string(), "err".to_string(), "verbose".to_string()];
        let encoded = MsgPackCodec::encode(&items).unwrap();
        let decoded: Vec<String> = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_encode_decode_option() {
        let some_val: Option<i32> = Some(42);
        let encoded = MsgPackCodec::encode(&some_val).unwrap();
        let decoded: Option<i32> = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, some_val);

        let none_val: Option<i32> = None;
        let encoded = MsgPackCodec::encode(&none_val).unwrap();
        assert_eq!(encoded, vec![0xc0]);
        let decoded: Option<i32> = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, none_val);
    }

    #[test]
    fn test_binary_payload_uses_bin_format() {
        // serde_bytes buffers should hit the compact bin8 representation.
        let data: Vec<u8> = vec![0x01, 0x02, 0x03, 0x04, 0x05];
        let encoded = MsgPackCodec::encode(&serde_bytes::Bytes::new(&data)).unwrap();
        assert_eq!(encoded[0], 0xc4, "expected bin8 format");

        let decoded: serde_bytes::ByteBuf = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded.as_ref(), &data);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let invalid = b"not valid msgpack";
        let result: Result<CommandMessage> = MsgPackCodec::decode(invalid);
        assert!(result.is_err());
    }
}
