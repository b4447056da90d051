//! Error taxonomy shared by discovery, resolution and decoding.

/// Everything that can go wrong while turning raw data into records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("schema discovery failed for record `{record}`: {cause}")]
    SchemaDiscovery {
        record: String,
        #[source]
        cause: DiscoveryError,
    },
    #[error("unresolved type `{name}`")]
    UnresolvedType { name: String },
    #[error("unsupported type expression `{expr}`: {reason}")]
    UnsupportedType { expr: String, reason: String },
    #[error("at {path}: record `{record}` requires field `{field}`")]
    MissingField {
        record: String,
        field: String,
        path: String,
    },
    #[error("at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },
    #[error("at {path}: nesting deeper than {limit} levels")]
    DepthLimit { path: String, limit: usize },
    #[error("cannot convert {found} into {target}")]
    Conversion {
        target: &'static str,
        found: String,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a record's schema could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("record is not declared in this namespace")]
    Undeclared,
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("another record with this name is already declared with different fields")]
    ConflictingDeclaration,
    #[error("`{0}` is not a valid field name")]
    InvalidFieldName(String),
    #[error("field `{field}` has an unusable type")]
    Field {
        field: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn discovery(record: &str, cause: DiscoveryError) -> Self {
        Error::SchemaDiscovery { record: record.to_string(), cause }
    }

    pub(crate) fn unsupported(expr: &str, reason: impl Into<String>) -> Self {
        Error::UnsupportedType { expr: expr.to_string(), reason: reason.into() }
    }
}
