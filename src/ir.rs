// Resolved type descriptors and record schemas. No raw values in here.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Float,
    Boolean,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    SequenceOf(Box<TypeDescriptor>),
    MappingOf(PrimitiveKind, Box<TypeDescriptor>), // key kind is always Text
    RecordRef(String),                             // looked up lazily by name
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Ordered field list of one record, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub record: String,
    pub fields: Vec<FieldSchema>,
}

impl PrimitiveKind {
    /// Map a bare type name onto a primitive kind.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "int" | "Integer" | "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32"
            | "u64" | "usize" => PrimitiveKind::Integer,
            "float" | "Float" | "f32" | "f64" => PrimitiveKind::Float,
            "bool" | "Boolean" => PrimitiveKind::Boolean,
            "str" | "String" | "Text" => PrimitiveKind::Text,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Integer => "Integer",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Text => "Text",
        }
    }
}

impl TypeDescriptor {
    pub fn sequence_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::SequenceOf(Box::new(element))
    }

    pub fn mapping_of(value: TypeDescriptor) -> Self {
        TypeDescriptor::MappingOf(PrimitiveKind::Text, Box::new(value))
    }

    pub fn record(name: impl Into<String>) -> Self {
        TypeDescriptor::RecordRef(name.into())
    }
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical rendering; it resolves back to the same descriptor.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{kind}"),
            TypeDescriptor::SequenceOf(elem) => write!(f, "Sequence[{elem}]"),
            TypeDescriptor::MappingOf(key, val) => write!(f, "Mapping[{key}, {val}]"),
            TypeDescriptor::RecordRef(name) => f.write_str(name),
        }
    }
}
