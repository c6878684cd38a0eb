//! Scalar and compound decoders.
//!
//! Every decoder reads from a [`Cursor`] and nothing else, so the bytes a
//! compound value consumes are exactly the sum of the bytes its parts
//! consume. Compound decoders call back into [`decode_value`] for their
//! elements, which is where the recursion in the format lives. Each
//! compound level is counted on the cursor and capped by its maximum
//! depth.
//!
//! # Wire shapes
//!
//! ```text
//! chr  u8
//! int  i32 (big-endian)
//! lon  i8 len, len ASCII digits (optionally signed)
//! str  i32 len (-1 = absent), len bytes
//! buf  same as str
//! ptr  i8 len, len ASCII hex digits
//! tim  i8 len, len ASCII decimal digits
//! arr  type, i32 count, count values
//! htb  key type, value type, i32 count, count (key, value) pairs
//! inf  str name, str value
//! inl  str name, i32 count, count × (i32 n, n × (str name, type, value))
//! hda  str path, str keys, i32 count, count × (ptr per segment, value per key)
//! ```

use crate::cursor::Cursor;
use crate::types::{Fields, HData, HDataObject, TypeTag, Value};
use crate::ProtocolError;

/// Whether a decode site accepts "no value" for types that can signal it.
///
/// Only infolist field values are decoded with [`Nullable::Yes`]. Strings
/// are nullable everywhere (their `-1` length is unambiguous); the flag
/// matters for `tim`, whose one-byte length can only mean "absent" where
/// absence is expected. Types without a null sentinel ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullable {
    No,
    Yes,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Reads a 3-byte type tag.
pub fn decode_type(c: &mut Cursor<'_>) -> Result<TypeTag, ProtocolError> {
    TypeTag::from_code(c.read_bytes(3)?)
}

/// Decodes one value of the given type.
pub fn decode_value(
    c: &mut Cursor<'_>,
    tag: TypeTag,
    nullable: Nullable,
) -> Result<Value, ProtocolError> {
    let value = match tag {
        TypeTag::Char => Value::Char(decode_char(c)?),
        TypeTag::Int => Value::Int(decode_int(c)?),
        TypeTag::Long => Value::Long(decode_long(c)?),
        TypeTag::Str | TypeTag::Buffer => Value::Str(decode_string(c)?),
        TypeTag::Pointer => Value::Pointer(decode_pointer(c)?),
        TypeTag::Time => Value::Time(decode_time(c, nullable)?),
        TypeTag::HashTable => nested(c, decode_hashtable)?,
        TypeTag::HData => Value::HData(nested(c, decode_hdata)?),
        TypeTag::Info => decode_info(c)?,
        TypeTag::InfoList => nested(c, decode_infolist)?,
        TypeTag::Array => nested(c, decode_array)?,
    };
    Ok(value)
}

/// Runs a compound decoder one nesting level down.
fn nested<'a, T>(
    c: &mut Cursor<'a>,
    decode: impl FnOnce(&mut Cursor<'a>) -> Result<T, ProtocolError>,
) -> Result<T, ProtocolError> {
    c.descend()?;
    let out = decode(c);
    c.ascend();
    out
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Decodes a `chr`: one raw byte.
pub fn decode_char(c: &mut Cursor<'_>) -> Result<u8, ProtocolError> {
    c.read_u8()
}

/// Decodes an `int`: big-endian `i32`.
pub fn decode_int(c: &mut Cursor<'_>) -> Result<i32, ProtocolError> {
    c.read_i32_be()
}

/// Decodes a `lon`: a short length then the integer as ASCII text.
pub fn decode_long(c: &mut Cursor<'_>) -> Result<i64, ProtocolError> {
    let raw = short_field(c, "lon")?;
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| malformed("lon", raw))
}

/// Decodes a `str` (or `buf`).
///
/// Length `-1` is an absent string and decodes to `None`; length `0` is a
/// present empty string. The two never collapse into each other.
pub fn decode_string(c: &mut Cursor<'_>) -> Result<Option<String>, ProtocolError> {
    let len = c.read_i32_be()?;
    if len == -1 {
        return Ok(None);
    }
    let len = usize::try_from(len).map_err(|_| ProtocolError::InvalidLength {
        what: "str",
        len: i64::from(len),
    })?;
    let bytes = c.read_bytes(len)?;
    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|_| ProtocolError::InvalidUtf8)
}

/// Decodes a `ptr` as `0x` followed by its hex digits.
pub fn decode_pointer(c: &mut Cursor<'_>) -> Result<String, ProtocolError> {
    let raw = short_field(c, "ptr")?;
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_hexdigit) {
        return Err(malformed("ptr", raw));
    }
    let mut ptr = String::with_capacity(2 + raw.len());
    ptr.push_str("0x");
    // All ASCII, checked above.
    ptr.extend(raw.iter().map(|&b| char::from(b)));
    Ok(ptr)
}

/// Decodes a `tim` as its digit text.
///
/// With [`Nullable::Yes`] a length of `-1` means "no value".
pub fn decode_time(
    c: &mut Cursor<'_>,
    nullable: Nullable,
) -> Result<Option<String>, ProtocolError> {
    let len = c.read_u8()? as i8;
    if len == -1 && nullable == Nullable::Yes {
        return Ok(None);
    }
    let raw = short_body(c, len, "tim")?;
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
        return Err(malformed("tim", raw));
    }
    Ok(Some(raw.iter().map(|&b| char::from(b)).collect()))
}

/// Reads a one-byte length then that many bytes.
fn short_field<'a>(
    c: &mut Cursor<'a>,
    what: &'static str,
) -> Result<&'a [u8], ProtocolError> {
    let len = c.read_u8()? as i8;
    short_body(c, len, what)
}

fn short_body<'a>(
    c: &mut Cursor<'a>,
    len: i8,
    what: &'static str,
) -> Result<&'a [u8], ProtocolError> {
    let len = usize::try_from(len).map_err(|_| ProtocolError::InvalidLength {
        what,
        len: i64::from(len),
    })?;
    c.read_bytes(len)
}

fn malformed(kind: &'static str, raw: &[u8]) -> ProtocolError {
    ProtocolError::MalformedInteger {
        kind,
        text: String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Decodes a string that names structure rather than carrying a value.
///
/// The value model has no "absent" for these, so an absent string reads
/// as empty text.
pub(crate) fn decode_text(c: &mut Cursor<'_>) -> Result<String, ProtocolError> {
    Ok(decode_string(c)?.unwrap_or_default())
}

/// Reads an element count. `-1` is an empty sequence.
fn decode_count(c: &mut Cursor<'_>, what: &'static str) -> Result<usize, ProtocolError> {
    let n = c.read_i32_be()?;
    if n == -1 {
        return Ok(0);
    }
    usize::try_from(n).map_err(|_| ProtocolError::InvalidLength {
        what,
        len: i64::from(n),
    })
}

/// Capacity to reserve for `count` elements without trusting the wire:
/// every element takes at least one byte, so the budget is an upper bound.
fn capacity(c: &Cursor<'_>, count: usize) -> usize {
    count.min(c.remaining())
}

// ---------------------------------------------------------------------------
// Compounds
// ---------------------------------------------------------------------------

/// Decodes an `arr`: element type, count, then untagged elements.
pub fn decode_array(c: &mut Cursor<'_>) -> Result<Value, ProtocolError> {
    let element_type = decode_type(c)?;
    let count = decode_count(c, "arr")?;
    let mut items = Vec::with_capacity(capacity(c, count));
    for _ in 0..count {
        items.push(decode_value(c, element_type, Nullable::No)?);
    }
    Ok(Value::Array {
        element_type,
        items,
    })
}

/// Decodes an `htb`. Entries keep wire order; duplicate keys are kept.
pub fn decode_hashtable(c: &mut Cursor<'_>) -> Result<Value, ProtocolError> {
    let key_type = decode_type(c)?;
    let value_type = decode_type(c)?;
    let count = decode_count(c, "htb")?;
    let mut entries = Vec::with_capacity(capacity(c, count));
    for _ in 0..count {
        let key = decode_value(c, key_type, Nullable::No)?;
        let value = decode_value(c, value_type, Nullable::No)?;
        entries.push((key, value));
    }
    Ok(Value::HashTable {
        key_type,
        value_type,
        entries,
    })
}

/// Decodes an `inf`: one name/value pair of strings.
pub fn decode_info(c: &mut Cursor<'_>) -> Result<Value, ProtocolError> {
    let key = decode_text(c)?;
    let value = decode_string(c)?;
    Ok(Value::Info { key, value })
}

/// Decodes an `inl`.
///
/// Field values are decoded with [`Nullable::Yes`]. A field name repeated
/// within one item replaces the earlier value (see [`Fields::insert`]).
pub fn decode_infolist(c: &mut Cursor<'_>) -> Result<Value, ProtocolError> {
    let name = decode_text(c)?;
    let count = decode_count(c, "inl")?;
    let mut items = Vec::with_capacity(capacity(c, count));
    for _ in 0..count {
        let field_count = decode_count(c, "inl item")?;
        let mut fields = Fields::with_capacity(capacity(c, field_count));
        for _ in 0..field_count {
            let field_name = decode_text(c)?;
            let tag = decode_type(c)?;
            let value = decode_value(c, tag, Nullable::Yes)?;
            fields.insert(field_name, value);
        }
        items.push(fields);
    }
    Ok(Value::InfoList { name, items })
}

/// Decodes an `hda`.
///
/// The path and keys strings are parsed once; every object then carries
/// one pointer per path segment followed by one value per key.
pub fn decode_hdata(c: &mut Cursor<'_>) -> Result<HData, ProtocolError> {
    let path = split_path(&decode_text(c)?);
    let keys = parse_keys(&decode_text(c)?)?;
    let count = decode_count(c, "hda")?;

    let mut objects = Vec::with_capacity(capacity(c, count));
    for _ in 0..count {
        let mut pointers = Vec::with_capacity(path.len());
        for _ in &path {
            pointers.push(decode_pointer(c)?);
        }
        let mut fields = Fields::with_capacity(keys.len());
        for (name, tag) in &keys {
            fields.insert(name.clone(), decode_value(c, *tag, Nullable::No)?);
        }
        objects.push(HDataObject { pointers, fields });
    }

    Ok(HData {
        path,
        keys,
        objects,
    })
}

/// `"buffer/lines/line"` → `["buffer", "lines", "line"]`; `""` → `[]`.
fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').map(str::to_owned).collect()
}

/// `"number:int,name:str"` → `[("number", Int), ("name", Str)]`.
fn parse_keys(keys: &str) -> Result<Vec<(String, TypeTag)>, ProtocolError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    keys.split(',')
        .map(|entry| {
            let (name, code) = entry
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedKeys(entry.to_owned()))?;
            Ok((name.to_owned(), TypeTag::from_code(code.as_bytes())?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(bytes: &[u8]) -> Cursor<'_> {
        Cursor::new(bytes)
    }

    // =====================================================================
    // Scalars
    // =====================================================================

    #[test]
    fn test_decode_char_and_int() {
        let mut c = cursor(&[b'A', 0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(decode_char(&mut c), Ok(b'A'));
        assert_eq!(decode_int(&mut c), Ok(-2));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_long_signed_text() {
        let mut c = cursor(b"\x0a1234567890\x03-42");
        assert_eq!(decode_long(&mut c), Ok(1_234_567_890));
        assert_eq!(decode_long(&mut c), Ok(-42));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_long_rejects_non_digits() {
        let mut c = cursor(b"\x0312a");
        assert_eq!(
            decode_long(&mut c),
            Err(ProtocolError::MalformedInteger {
                kind: "lon",
                text: "12a".into()
            })
        );
    }

    #[test]
    fn test_decode_long_rejects_empty_and_overflow() {
        assert!(matches!(
            decode_long(&mut cursor(b"\x00")),
            Err(ProtocolError::MalformedInteger { .. })
        ));
        assert!(matches!(
            decode_long(&mut cursor(b"\x1399999999999999999999")),
            Err(ProtocolError::MalformedInteger { .. })
        ));
    }

    #[test]
    fn test_decode_string_three_way() {
        let mut c = cursor(&[
            0xFF, 0xFF, 0xFF, 0xFF, // -1
            0x00, 0x00, 0x00, 0x00, // 0
            0x00, 0x00, 0x00, 0x02, b'h', b'i',
        ]);
        assert_eq!(decode_string(&mut c), Ok(None));
        assert_eq!(decode_string(&mut c), Ok(Some(String::new())));
        assert_eq!(decode_string(&mut c), Ok(Some("hi".into())));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_string_rejects_other_negative_lengths() {
        let mut c = cursor(&[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(
            decode_string(&mut c),
            Err(ProtocolError::InvalidLength { what: "str", len: -2 })
        );
    }

    #[test]
    fn test_decode_string_rejects_invalid_utf8() {
        let mut c = cursor(&[0, 0, 0, 2, 0xC3, 0x28]);
        assert_eq!(decode_string(&mut c), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn test_decode_string_truncated() {
        let mut c = cursor(&[0, 0, 0, 5, b'a', b'b']);
        assert_eq!(
            decode_string(&mut c),
            Err(ProtocolError::Truncated {
                needed: 5,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_pointer_renders_hex() {
        let mut c = cursor(b"\x091a2b3c4d5\x010");
        assert_eq!(decode_pointer(&mut c), Ok("0x1a2b3c4d5".into()));
        assert_eq!(decode_pointer(&mut c), Ok("0x0".into()));
    }

    #[test]
    fn test_decode_pointer_rejects_non_hex_and_empty() {
        assert!(matches!(
            decode_pointer(&mut cursor(b"\x02zz")),
            Err(ProtocolError::MalformedInteger { kind: "ptr", .. })
        ));
        assert!(matches!(
            decode_pointer(&mut cursor(b"\x00")),
            Err(ProtocolError::MalformedInteger { kind: "ptr", .. })
        ));
    }

    #[test]
    fn test_decode_time_is_text() {
        let mut c = cursor(b"\x0a1321993456");
        assert_eq!(
            decode_time(&mut c, Nullable::No),
            Ok(Some("1321993456".into()))
        );
    }

    #[test]
    fn test_decode_time_null_only_when_nullable() {
        assert_eq!(decode_time(&mut cursor(&[0xFF]), Nullable::Yes), Ok(None));
        assert_eq!(
            decode_time(&mut cursor(&[0xFF]), Nullable::No),
            Err(ProtocolError::InvalidLength { what: "tim", len: -1 })
        );
    }

    #[test]
    fn test_decode_time_rejects_non_digits() {
        assert!(matches!(
            decode_time(&mut cursor(b"\x0212:"), Nullable::No),
            Err(ProtocolError::MalformedInteger { kind: "tim", .. })
        ));
    }

    #[test]
    fn test_unknown_type_reads_only_the_tag() {
        let mut c = cursor(b"xyz\x00\x00\x00\x01");
        assert_eq!(
            decode_type(&mut c),
            Err(ProtocolError::UnknownType("xyz".into()))
        );
        assert_eq!(c.position(), 3);
    }

    // =====================================================================
    // Compounds
    // =====================================================================

    #[test]
    fn test_decode_array_of_ints() {
        let mut c = cursor(b"int\x00\x00\x00\x02\x00\x00\x00\x01\x00\x00\x00\x02");
        assert_eq!(
            decode_array(&mut c),
            Ok(Value::Array {
                element_type: TypeTag::Int,
                items: vec![Value::Int(1), Value::Int(2)],
            })
        );
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_array_empty_consumes_tag_and_count_only() {
        let bytes = b"str\x00\x00\x00\x00trailing";
        let mut c = cursor(bytes);
        let v = decode_array(&mut c).unwrap();
        assert_eq!(
            v,
            Value::Array {
                element_type: TypeTag::Str,
                items: vec![],
            }
        );
        assert_eq!(c.position(), 7);
    }

    #[test]
    fn test_decode_array_minus_one_is_empty() {
        let mut c = cursor(b"int\xFF\xFF\xFF\xFF");
        let v = decode_array(&mut c).unwrap();
        assert!(matches!(v, Value::Array { ref items, .. } if items.is_empty()));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_array_rejects_negative_count() {
        let mut c = cursor(b"int\xFF\xFF\xFF\xFE");
        assert_eq!(
            decode_array(&mut c),
            Err(ProtocolError::InvalidLength { what: "arr", len: -2 })
        );
    }

    #[test]
    fn test_decode_array_huge_count_fails_without_allocating() {
        let mut c = cursor(b"int\x7F\xFF\xFF\xFF\x00\x00\x00\x01");
        assert!(matches!(
            decode_array(&mut c),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_hashtable_keeps_duplicates_in_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"strint\x00\x00\x00\x02");
        bytes.extend_from_slice(b"\x00\x00\x00\x02k1\x00\x00\x00\x01");
        bytes.extend_from_slice(b"\x00\x00\x00\x02k1\x00\x00\x00\x02");
        let mut c = cursor(&bytes);

        let v = decode_hashtable(&mut c).unwrap();
        assert_eq!(
            v,
            Value::HashTable {
                key_type: TypeTag::Str,
                value_type: TypeTag::Int,
                entries: vec![
                    (Value::Str(Some("k1".into())), Value::Int(1)),
                    (Value::Str(Some("k1".into())), Value::Int(2)),
                ],
            }
        );
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_decode_info_pair() {
        let mut c = cursor(b"\x00\x00\x00\x07version\x00\x00\x00\x033.0");
        assert_eq!(
            decode_info(&mut c),
            Ok(Value::Info {
                key: "version".into(),
                value: Some("3.0".into()),
            })
        );
    }

    #[test]
    fn test_decode_info_absent_value_stays_absent() {
        let mut c = cursor(b"\x00\x00\x00\x01x\xFF\xFF\xFF\xFF");
        assert_eq!(
            decode_info(&mut c),
            Ok(Value::Info {
                key: "x".into(),
                value: None,
            })
        );
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            parse_keys("number:int,full_name:str"),
            Ok(vec![
                ("number".into(), TypeTag::Int),
                ("full_name".into(), TypeTag::Str),
            ])
        );
        assert_eq!(parse_keys(""), Ok(vec![]));
        assert_eq!(
            parse_keys("number"),
            Err(ProtocolError::MalformedKeys("number".into()))
        );
        assert_eq!(
            parse_keys("n:xyz"),
            Err(ProtocolError::UnknownType("xyz".into()))
        );
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("buffer/lines/line"), ["buffer", "lines", "line"]);
        assert_eq!(split_path("buffer"), ["buffer"]);
        assert!(split_path("").is_empty());
    }
}
