use std::fmt;

use serde::de::DeserializeOwned;

/// Parse a declaration or config document; failures name the JSON path that broke.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    with_path(&mut serde_json::Deserializer::from_str(src))
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    with_path(&mut serde_json::Deserializer::from_slice(bytes))
}

fn with_path<'de, R, T>(de: &mut serde_json::Deserializer<R>) -> Result<T, String>
where
    R: serde_json::de::Read<'de>,
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path}: {}", err.into_inner())
    })
}

/// Where the engine currently is inside the raw value, for error messages.
/// Renders like `b.items[2].x`; the root renders as `.`.
#[derive(Debug, Clone, Default)]
pub struct DataPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push_key(&mut self, key: &str) {
        self.segments.push(Segment::Key(key.to_string()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
