//! Error types for the codec and the schema registry.
//!
//! Decode/encode failures carry a breadcrumb ([`ErrorPath`]) naming the type,
//! variant case, field and array index that led to the failing element, e.g.
//! `TagStream[3]/Tag::PlaceObject3.matrix/Matrix.scale`.

use std::fmt;

use thiserror::Error;

/// One step of an error breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named registry type entered through a reference (or the top-level type).
    Type(String),
    /// Variant case selected by its discriminant.
    Case(String),
    /// Record field (logical name).
    Field(String),
    /// Array item.
    Index(usize),
}

/// Breadcrumb from the outermost type to the failing element.
///
/// Segments are pushed while the error propagates outwards, so they are stored
/// innermost-first and reversed for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPath(Vec<PathSegment>);

impl ErrorPath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments ordered from the outermost type to the failing element.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter().rev()
    }

    fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().enumerate() {
            match segment {
                PathSegment::Type(name) if i == 0 => f.write_str(name)?,
                PathSegment::Type(name) => write!(f, "/{name}")?,
                PathSegment::Case(name) => write!(f, "::{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Numeric value outside the bounds of its declared codec.
    #[error("value {value} is out of range for {target}")]
    Range { value: String, target: String },

    /// Literal constant did not match.
    #[error("expected {expected}, found {found}")]
    ValueMismatch { expected: String, found: String },

    #[error("missing required field `{field}`")]
    MissingRequiredField { field: String },

    #[error("unknown field `{field}`")]
    UnknownField { field: String },

    /// Array length outside `[min, max]`.
    #[error("length {len} is outside the allowed bounds {}", display_bounds(.min, .max))]
    LengthExceeded {
        len: usize,
        min: usize,
        max: Option<usize>,
    },

    /// Discriminant (or enumeration code/label) not in the closed set.
    #[error("unknown variant {discriminant}")]
    UnknownVariant { discriminant: String },

    /// The value does not have the shape the codec expects.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unexpected end of input ({needed} more bits needed)")]
    UnexpectedEof { needed: usize },

    #[error("{remaining} trailing bytes after the value")]
    TrailingBytes { remaining: usize },

    /// Accepted by the lenient decoder only; re-encoding would not reproduce the input.
    #[error("non-canonical encoding: {reason}")]
    NonCanonical { reason: String },

    #[error("invalid encoding: {reason}")]
    InvalidEncoding { reason: String },

    #[error("nesting depth exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("unknown type `{name}`")]
    UnknownType { name: String },
}

fn display_bounds(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) => format!("[{min}, {max}]"),
        None => format!("[{min}, unbounded)"),
    }
}

impl ErrorKind {
    /// Coarse grouping used in logs and CLI exit reporting.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Range { .. } | Self::ValueMismatch { .. } | Self::TypeMismatch { .. } => {
                "validation"
            }
            Self::MissingRequiredField { .. } | Self::UnknownField { .. } => "structure",
            Self::LengthExceeded { .. } => "bounds",
            Self::UnknownVariant { .. } => "variant",
            Self::UnexpectedEof { .. }
            | Self::TrailingBytes { .. }
            | Self::NonCanonical { .. }
            | Self::InvalidEncoding { .. } => "wire",
            Self::DepthExceeded { .. } => "limits",
            Self::UnknownType { .. } => "registry",
        }
    }
}

/// A decode/encode failure annotated with the path to the failing element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", display_location(.path))]
pub struct CodecError {
    kind: ErrorKind,
    path: ErrorPath,
}

fn display_location(path: &ErrorPath) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at {path}")
    }
}

impl CodecError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: ErrorPath::default(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn path(&self) -> &ErrorPath {
        &self.path
    }

    pub fn at_type(mut self, name: &str) -> Self {
        self.path.push(PathSegment::Type(name.to_string()));
        self
    }

    pub fn at_case(mut self, label: &str) -> Self {
        self.path.push(PathSegment::Case(label.to_string()));
        self
    }

    pub fn at_field(mut self, name: &str) -> Self {
        self.path.push(PathSegment::Field(name.to_string()));
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.path.push(PathSegment::Index(index));
        self
    }

    pub(crate) fn range(value: impl fmt::Display, target: impl Into<String>) -> Self {
        ErrorKind::Range {
            value: value.to_string(),
            target: target.into(),
        }
        .into()
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
        .into()
    }

    pub(crate) fn missing(field: &str) -> Self {
        ErrorKind::MissingRequiredField {
            field: field.to_string(),
        }
        .into()
    }

    pub(crate) fn non_canonical(reason: impl Into<String>) -> Self {
        ErrorKind::NonCanonical {
            reason: reason.into(),
        }
        .into()
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ErrorKind::InvalidEncoding {
            reason: reason.into(),
        }
        .into()
    }
}

impl From<ErrorKind> for CodecError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Breadcrumb helpers for `CodecResult`.
pub(crate) trait ResultExt<T> {
    fn at_type(self, name: &str) -> CodecResult<T>;
    fn at_case(self, label: &str) -> CodecResult<T>;
    fn at_field(self, name: &str) -> CodecResult<T>;
    fn at_index(self, index: usize) -> CodecResult<T>;
}

impl<T> ResultExt<T> for CodecResult<T> {
    fn at_type(self, name: &str) -> CodecResult<T> {
        self.map_err(|e| e.at_type(name))
    }

    fn at_case(self, label: &str) -> CodecResult<T> {
        self.map_err(|e| e.at_case(label))
    }

    fn at_field(self, name: &str) -> CodecResult<T> {
        self.map_err(|e| e.at_field(name))
    }

    fn at_index(self, index: usize) -> CodecResult<T> {
        self.map_err(|e| e.at_index(index))
    }
}

/// Registry build failures. These are fatal: a registry that fails to build
/// is never handed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("type `{name}` is registered more than once")]
    DuplicateName { name: String },

    #[error("`{from}` references unknown type `{name}`")]
    UnresolvedReference { from: String, name: String },

    #[error("invalid variant `{name}`: {reason}")]
    InvalidVariant { name: String, reason: String },

    #[error("invalid layout in `{name}`: {reason}")]
    InvalidLayout { name: String, reason: String },

    #[error("type `{name}` can only describe infinite values (cycle: {cycle})")]
    InfiniteType { name: String, cycle: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_outermost_first() {
        let err = CodecError::missing("scale")
            .at_field("scale")
            .at_type("Matrix")
            .at_field("matrix")
            .at_case("PlaceObject3")
            .at_type("Tag")
            .at_index(3)
            .at_type("TagStream");
        assert_eq!(
            err.path().to_string(),
            "TagStream[3]/Tag::PlaceObject3.matrix/Matrix.scale"
        );
        assert_eq!(
            err.to_string(),
            "missing required field `scale` at TagStream[3]/Tag::PlaceObject3.matrix/Matrix.scale"
        );
    }

    #[test]
    fn length_bounds_display() {
        let err = ErrorKind::LengthExceeded {
            len: 4,
            min: 0,
            max: Some(3),
        };
        assert_eq!(err.to_string(), "length 4 is outside the allowed bounds [0, 3]");
        let err = ErrorKind::LengthExceeded {
            len: 0,
            min: 1,
            max: None,
        };
        assert_eq!(
            err.to_string(),
            "length 0 is outside the allowed bounds [1, unbounded)"
        );
    }

    #[test]
    fn categories() {
        assert_eq!(CodecError::missing("x").kind().category(), "structure");
        assert_eq!(CodecError::range(-1, "u8").kind().category(), "validation");
        assert_eq!(CodecError::non_canonical("pad").kind().category(), "wire");
    }
}
