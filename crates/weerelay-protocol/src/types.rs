//! The value model shared by every decoder.
//!
//! A relay message is self-describing: each item on the wire is a 3-byte
//! type tag followed by a value of that type, and compound values carry
//! the tags of their elements. Decoding turns that into a tree of
//! [`Value`]s, a closed sum type so every consumer has to handle every
//! wire type.
//!
//! There are no back-references in the format, so the tree is plain
//! owned data: no `Rc`, no cycles.

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// The twelve wire types, each written as a fixed 3-byte ASCII code.
///
/// Serializes as its wire code (`"int"`, `"hda"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeTag {
    /// `chr`: one raw byte.
    #[serde(rename = "chr")]
    Char,
    /// `int`: big-endian signed 32-bit integer.
    #[serde(rename = "int")]
    Int,
    /// `lon`: signed 64-bit integer written as length-prefixed ASCII.
    #[serde(rename = "lon")]
    Long,
    /// `str`: length-prefixed string, nullable.
    #[serde(rename = "str")]
    Str,
    /// `buf`: same wire shape as `str`.
    #[serde(rename = "buf")]
    Buffer,
    /// `ptr`: pointer written as length-prefixed hex digits.
    #[serde(rename = "ptr")]
    Pointer,
    /// `tim`: timestamp written as length-prefixed decimal digits.
    #[serde(rename = "tim")]
    Time,
    /// `htb`: hash table.
    #[serde(rename = "htb")]
    HashTable,
    /// `hda`: bulk tagged objects.
    #[serde(rename = "hda")]
    HData,
    /// `inf`: one name/value pair.
    #[serde(rename = "inf")]
    Info,
    /// `inl`: list of loosely-typed field maps.
    #[serde(rename = "inl")]
    InfoList,
    /// `arr`: homogeneous array.
    #[serde(rename = "arr")]
    Array,
}

impl TypeTag {
    /// Every tag, in wire-table order.
    pub const ALL: [TypeTag; 12] = [
        TypeTag::Char,
        TypeTag::Int,
        TypeTag::Long,
        TypeTag::Str,
        TypeTag::Buffer,
        TypeTag::Pointer,
        TypeTag::Time,
        TypeTag::HashTable,
        TypeTag::HData,
        TypeTag::Info,
        TypeTag::InfoList,
        TypeTag::Array,
    ];

    /// Returns the 3-letter wire code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Char => "chr",
            Self::Int => "int",
            Self::Long => "lon",
            Self::Str => "str",
            Self::Buffer => "buf",
            Self::Pointer => "ptr",
            Self::Time => "tim",
            Self::HashTable => "htb",
            Self::HData => "hda",
            Self::Info => "inf",
            Self::InfoList => "inl",
            Self::Array => "arr",
        }
    }

    /// Looks up a tag by its wire code.
    ///
    /// Anything that isn't exactly one of the twelve codes (including
    /// a code of the wrong length) is [`ProtocolError::UnknownType`].
    pub fn from_code(code: &[u8]) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.code().as_bytes() == code)
            .ok_or_else(|| {
                ProtocolError::UnknownType(
                    String::from_utf8_lossy(code).into_owned(),
                )
            })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Fields: ordered, unique-name mapping
// ---------------------------------------------------------------------------

/// An ordered mapping from field name to [`Value`].
///
/// Used for infolist items and hdata objects. Names are unique: inserting
/// a name that is already present replaces its value but keeps the
/// position where the name first arrived (last write wins).
///
/// Entries live in a `Vec` in arrival order; a name index beside it
/// keeps insert and lookup constant-time however many fields an item has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Fields {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mapping with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts a field, returning the value it replaced if the name was
    /// already present.
    pub fn insert(&mut self, name: String, value: Value) -> Option<Value> {
        if let Some(&pos) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        None
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// Iterates fields in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in arrival order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// Serializes as a map, preserving arrival order.
impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// HData
// ---------------------------------------------------------------------------

/// One object of an hdata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HDataObject {
    /// One `0x…` pointer per path segment, outermost first.
    pub pointers: Vec<String>,
    /// The declared keys, decoded in declared order.
    pub fields: Fields,
}

/// A bulk "hdata" value: a path through the relay's object graph, a
/// fixed schema of typed keys, and the objects found along that path.
///
/// ```text
/// path:    buffer/lines/line
/// keys:    date:tim, message:str
/// objects: [ { pointers: [0x1, 0x2, 0x3], fields: { date, message } }, ... ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HData {
    /// Path segments, e.g. `["buffer", "lines", "line"]`.
    pub path: Vec<String>,
    /// Declared `(name, type)` schema applied to every object.
    pub keys: Vec<(String, TypeTag)>,
    pub objects: Vec<HDataObject>,
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// One decoded value.
///
/// `str` and `buf` both decode to [`Value::Str`]; the [`TypeTag`] the
/// value arrived with (in [`Message::body`], or in the element types of
/// an array or hash table) keeps the distinction for callers that care.
///
/// A `None` string is an absent string (wire length `-1`) and is never
/// equal to the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    Char(u8),
    Int(i32),
    Long(i64),
    Str(Option<String>),
    /// Always `0x` followed by at least one hex digit.
    Pointer(String),
    /// Decimal-digit timestamp, kept as text.
    ///
    /// `None` only appears where the nullable decoding mode is enabled
    /// (infolist fields) and the relay signalled an absent value.
    Time(Option<String>),
    Array {
        element_type: TypeTag,
        items: Vec<Value>,
    },
    /// Entries in arrival order; duplicate keys are kept as they came.
    HashTable {
        key_type: TypeTag,
        value_type: TypeTag,
        entries: Vec<(Value, Value)>,
    },
    Info {
        key: String,
        value: Option<String>,
    },
    InfoList {
        name: String,
        items: Vec<Fields>,
    },
    HData(HData),
}

impl Value {
    /// A short name for the variant, for logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Char(_) => "char",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Str(_) => "str",
            Self::Pointer(_) => "pointer",
            Self::Time(_) => "time",
            Self::Array { .. } => "array",
            Self::HashTable { .. } => "hashtable",
            Self::Info { .. } => "info",
            Self::InfoList { .. } => "infolist",
            Self::HData(_) => "hdata",
        }
    }

    /// Returns the text of a present `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(Some(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the value of an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value of a `Long`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Returns the `0x…` text of a `Pointer`.
    pub fn as_pointer(&self) -> Option<&str> {
        match self {
            Self::Pointer(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the contents of an `HData`.
    pub fn as_hdata(&self) -> Option<&HData> {
        match self {
            Self::HData(h) => Some(h),
            _ => None,
        }
    }

    /// Returns `true` for an absent string or time.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Str(None) | Self::Time(None))
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One decoded relay message.
///
/// Owned outright by whoever decoded it; nothing in it points back into
/// the buffer it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Total frame length from the header, header included.
    pub length: u32,
    /// Whether the body was zlib-compressed on the wire.
    pub compressed: bool,
    /// The identifier the request was sent with. Empty for unsolicited
    /// messages; the relay's own events start with `_`.
    pub identifier: String,
    /// Items in arrival order.
    pub body: Vec<(TypeTag, Value)>,
}

impl Message {
    /// Returns `true` for messages the relay pushed on its own rather
    /// than in reply to an identified request.
    pub fn is_event(&self) -> bool {
        self.identifier.is_empty() || self.identifier.starts_with('_')
    }

    /// Returns the first item of the body, if any.
    pub fn first(&self) -> Option<&Value> {
        self.body.first().map(|(_, v)| v)
    }
}
