//! Typed view of the relay's buffer list.
//!
//! `hdata buffer:gui_buffers(*) <keys>` returns one hdata object per
//! buffer. [`Buffer`] pulls the fields a client needs out of such an
//! object so callers don't have to match on [`Value`]s by hand.

use serde::Serialize;

use crate::types::{HData, HDataObject, Message, Value};
use crate::ProtocolError;

/// Hdata path that lists every buffer.
pub const BUFFER_HDATA_PATH: &str = "buffer:gui_buffers(*)";

/// Keys requested for each buffer.
pub const BUFFER_HDATA_KEYS: &str = "local_variables,notify,number,full_name,short_name,title";

/// One buffer as listed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buffer {
    /// Hdata path pointers, outermost first. The last one is the buffer.
    pub pointers: Vec<String>,
    /// Position in the buffer list.
    pub number: i32,
    /// Unique name, e.g. `irc.libera.#rust`.
    pub full_name: String,
    /// Display name, e.g. `#rust`.
    pub short_name: Option<String>,
    /// Topic or description line.
    pub title: Option<String>,
    /// Notify level (0 = none, 3 = all messages).
    pub notify: i32,
    /// Buffer-local variables in wire order. Absent values read as empty.
    pub local_variables: Vec<(String, String)>,
}

impl Buffer {
    /// Short name when the buffer has one, full name otherwise.
    pub fn canonical_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.full_name)
    }

    /// The buffer's own pointer: the last segment of its hdata path.
    pub fn pointer(&self) -> Option<&str> {
        self.pointers.last().map(String::as_str)
    }

    /// Looks up a local variable such as `type` or `nick`.
    pub fn local_variable(&self, name: &str) -> Option<&str> {
        self.local_variables
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Converts every object of a buffer hdata.
    pub fn list(hdata: &HData) -> Result<Vec<Self>, ProtocolError> {
        hdata.objects.iter().map(Self::try_from).collect()
    }

    /// Converts the reply to a buffer-list request.
    ///
    /// A reply without items is an empty list; a first item other than
    /// hdata is [`ProtocolError::UnexpectedValue`].
    pub fn from_message(msg: &Message) -> Result<Vec<Self>, ProtocolError> {
        match msg.first() {
            None => Ok(Vec::new()),
            Some(Value::HData(hdata)) => Self::list(hdata),
            Some(other) => Err(ProtocolError::UnexpectedValue {
                expected: "hdata",
                found: other.type_name(),
            }),
        }
    }
}

impl TryFrom<&HDataObject> for Buffer {
    type Error = ProtocolError;

    fn try_from(obj: &HDataObject) -> Result<Self, Self::Error> {
        let full_name = optional_str(obj, "full_name")?
            .ok_or_else(|| invalid("full_name", "a string"))?;
        Ok(Self {
            pointers: obj.pointers.clone(),
            number: int_or_zero(obj, "number")?,
            full_name,
            short_name: optional_str(obj, "short_name")?,
            title: optional_str(obj, "title")?,
            notify: int_or_zero(obj, "notify")?,
            local_variables: local_variables(obj)?,
        })
    }
}

fn invalid(field: &str, expected: &'static str) -> ProtocolError {
    ProtocolError::InvalidField {
        field: field.to_owned(),
        expected,
    }
}

/// A `str` field; absent from the object and null both read as `None`.
fn optional_str(obj: &HDataObject, name: &str) -> Result<Option<String>, ProtocolError> {
    match obj.fields.get(name) {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(name, "a string")),
    }
}

fn int_or_zero(obj: &HDataObject, name: &str) -> Result<i32, ProtocolError> {
    match obj.fields.get(name) {
        None => Ok(0),
        Some(Value::Int(i)) => Ok(*i),
        Some(_) => Err(invalid(name, "an int")),
    }
}

fn local_variables(obj: &HDataObject) -> Result<Vec<(String, String)>, ProtocolError> {
    let entries = match obj.fields.get("local_variables") {
        None => return Ok(Vec::new()),
        Some(Value::HashTable { entries, .. }) => entries,
        Some(_) => return Err(invalid("local_variables", "a hashtable")),
    };
    entries
        .iter()
        .map(|(k, v)| match (k, v) {
            (Value::Str(k), Value::Str(v)) => Ok((
                k.clone().unwrap_or_default(),
                v.clone().unwrap_or_default(),
            )),
            _ => Err(invalid("local_variables", "a string hashtable")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fields, TypeTag};

    fn s(text: &str) -> Value {
        Value::Str(Some(text.to_string()))
    }

    fn object(fields: Vec<(&str, Value)>) -> HDataObject {
        HDataObject {
            pointers: vec!["0x5555".into()],
            fields: fields
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect::<Fields>(),
        }
    }

    #[test]
    fn test_buffer_from_object() {
        let obj = object(vec![
            (
                "local_variables",
                Value::HashTable {
                    key_type: TypeTag::Str,
                    value_type: TypeTag::Str,
                    entries: vec![(s("plugin"), s("core")), (s("name"), Value::Str(None))],
                },
            ),
            ("notify", Value::Int(3)),
            ("number", Value::Int(1)),
            ("full_name", s("core.weechat")),
            ("short_name", s("weechat")),
            ("title", Value::Str(None)),
        ]);

        let buf = Buffer::try_from(&obj).unwrap();
        assert_eq!(buf.number, 1);
        assert_eq!(buf.notify, 3);
        assert_eq!(buf.full_name, "core.weechat");
        assert_eq!(buf.canonical_name(), "weechat");
        assert_eq!(buf.title, None);
        assert_eq!(buf.pointer(), Some("0x5555"));
        assert_eq!(buf.local_variable("plugin"), Some("core"));
        assert_eq!(buf.local_variable("name"), Some(""));
        assert_eq!(buf.local_variable("nick"), None);
    }

    #[test]
    fn test_canonical_name_falls_back_to_full_name() {
        let buf = Buffer::try_from(&object(vec![
            ("full_name", s("irc.server.libera")),
            ("short_name", Value::Str(None)),
        ]))
        .unwrap();
        assert_eq!(buf.canonical_name(), "irc.server.libera");

        // Present-but-empty is still a short name.
        let buf = Buffer::try_from(&object(vec![
            ("full_name", s("irc.server.libera")),
            ("short_name", s("")),
        ]))
        .unwrap();
        assert_eq!(buf.canonical_name(), "");
    }

    #[test]
    fn test_missing_full_name_is_an_error() {
        assert_eq!(
            Buffer::try_from(&object(vec![("number", Value::Int(2))])),
            Err(ProtocolError::InvalidField {
                field: "full_name".into(),
                expected: "a string",
            })
        );
    }

    #[test]
    fn test_wrong_field_type_is_an_error() {
        let obj = object(vec![("full_name", s("core.weechat")), ("number", s("1"))]);
        assert!(matches!(
            Buffer::try_from(&obj),
            Err(ProtocolError::InvalidField { ref field, .. }) if field == "number"
        ));
    }

    #[test]
    fn test_from_message_needs_hdata() {
        let msg = Message {
            length: 0,
            compressed: false,
            identifier: "x".into(),
            body: vec![(TypeTag::Int, Value::Int(1))],
        };
        assert_eq!(
            Buffer::from_message(&msg),
            Err(ProtocolError::UnexpectedValue {
                expected: "hdata",
                found: "int",
            })
        );

        let empty = Message { body: vec![], ..msg };
        assert_eq!(Buffer::from_message(&empty), Ok(vec![]));
    }
}
