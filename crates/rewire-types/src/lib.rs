//! Type metadata for both client API generations.
//!
//! The rewriting engine never inspects client libraries directly. Everything it
//! needs to know (does a type exist, which methods does it declare, what are a
//! method's parameters) goes through the narrow [`TypeIntrospector`] trait.
//! Two implementations are provided:
//! - [`SchemaIntrospector`]: backed by a JSON schema file describing types,
//!   their parents and their methods.
//! - [`StaticIntrospector`]: an in-memory builder, mostly used by tests.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

mod schema;
mod table;

pub use schema::SchemaIntrospector;
pub use table::StaticIntrospector;

/// One declared parameter of a method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    /// Declared type as written (`?Foo\Bar`, `array`, `int|string`), if any.
    pub declared_type: Option<String>,
    /// Whether the declared type is a builtin (scalar, `array`, `mixed`, ...)
    /// rather than a class. Untyped parameters count as builtin.
    pub is_builtin: bool,
}

impl ParameterInfo {
    /// Builds a parameter, deriving `is_builtin` from the declared type.
    pub fn new(name: impl Into<String>, declared_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            is_builtin: declared_type.map_or(true, is_builtin_type),
            declared_type: declared_type.map(str::to_owned),
        }
    }

    /// Declared class name without nullability marker or leading `\`.
    pub fn class_name(&self) -> Option<&str> {
        if self.is_builtin {
            return None;
        }
        self.declared_type
            .as_deref()
            .map(|ty| normalize_type_name(ty.trim_start_matches('?')))
    }
}

/// A resolved method: its owning type and ordered parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub type_name: String,
    pub name: String,
    pub parameters: Vec<ParameterInfo>,
}

impl MethodInfo {
    pub fn first_parameter(&self) -> Option<&ParameterInfo> {
        self.parameters.first()
    }
}

#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("failed to read type schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse type schema {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("type introspection unavailable: {0}")]
    Unavailable(String),
}

impl IntrospectionError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: Option<&PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<inline>".to_owned()),
            source,
        }
    }
}

/// Read-only queries against type metadata.
///
/// Type names are fully qualified; a leading `\` is accepted and ignored.
/// Lookups are case-insensitive, like PHP class and method names.
pub trait TypeIntrospector {
    fn type_exists(&self, name: &str) -> bool;

    fn method_exists(&self, type_name: &str, method: &str) -> bool;

    /// Ordered parameters of `type_name::method`, resolving inherited methods.
    ///
    /// Returns `None` when the type or the method is unknown.
    fn parameters(&self, type_name: &str, method: &str) -> Option<Vec<ParameterInfo>>;

    /// Direct parent class of `name`, if known.
    ///
    /// The default implementation reports no parent.
    fn parent_type(&self, _name: &str) -> Option<String> {
        None
    }

    /// Checks that the metadata source is usable before any file is processed.
    fn probe(&self) -> Result<(), IntrospectionError> {
        Ok(())
    }

    /// Resolves a method into a [`MethodInfo`].
    fn method(&self, type_name: &str, method: &str) -> Option<MethodInfo> {
        let parameters = self.parameters(type_name, method)?;
        Some(MethodInfo {
            type_name: normalize_type_name(type_name).to_owned(),
            name: method.to_owned(),
            parameters,
        })
    }
}

impl<T: TypeIntrospector + ?Sized> TypeIntrospector for &T {
    fn type_exists(&self, name: &str) -> bool {
        (**self).type_exists(name)
    }

    fn method_exists(&self, type_name: &str, method: &str) -> bool {
        (**self).method_exists(type_name, method)
    }

    fn parameters(&self, type_name: &str, method: &str) -> Option<Vec<ParameterInfo>> {
        (**self).parameters(type_name, method)
    }

    fn parent_type(&self, name: &str) -> Option<String> {
        (**self).parent_type(name)
    }

    fn probe(&self) -> Result<(), IntrospectionError> {
        (**self).probe()
    }
}

/// Strips a leading namespace separator.
pub fn normalize_type_name(name: &str) -> &str {
    name.trim_start_matches('\\')
}

const BUILTIN_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "never", "null",
    "object", "string", "true", "void",
];

/// Whether a declared type denotes a builtin rather than a class.
///
/// Nullable types follow their inner type. Unions and intersections never name
/// a single class and count as builtin.
pub fn is_builtin_type(declared: &str) -> bool {
    let declared = declared.trim().trim_start_matches('?');
    if declared.is_empty() || declared.contains(['|', '&']) {
        return true;
    }
    BUILTIN_TYPES
        .iter()
        .any(|builtin| builtin.eq_ignore_ascii_case(declared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_detection() {
        assert!(is_builtin_type("string"));
        assert!(is_builtin_type("?array"));
        assert!(is_builtin_type("Mixed"));
        assert!(is_builtin_type("int|Foo"));
        assert!(is_builtin_type(""));
        assert!(!is_builtin_type("Google\\Cloud\\Dlp\\V2\\CreateDlpJobRequest"));
        assert!(!is_builtin_type("?\\Foo\\Bar"));
    }

    #[test]
    fn parameter_class_name_strips_markers() {
        let param = ParameterInfo::new("request", Some("?\\Foo\\BarRequest"));
        assert!(!param.is_builtin);
        assert_eq!(param.class_name(), Some("Foo\\BarRequest"));

        let untyped = ParameterInfo::new("optionalArgs", None);
        assert!(untyped.is_builtin);
        assert_eq!(untyped.class_name(), None);
    }
}
