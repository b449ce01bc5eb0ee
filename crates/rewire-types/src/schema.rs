use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::table::TypeTable;
use crate::{IntrospectionError, ParameterInfo, TypeIntrospector};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    types: BTreeMap<String, TypeSchema>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSchema {
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    methods: BTreeMap<String, Vec<ParameterSchema>>,
}

/// A parameter is either a bare (untyped) name or a full record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParameterSchema {
    Name(String),
    Full {
        name: String,
        #[serde(default, rename = "type")]
        declared_type: Option<String>,
        #[serde(default)]
        is_builtin: Option<bool>,
    },
}

impl ParameterSchema {
    fn into_info(self) -> ParameterInfo {
        match self {
            ParameterSchema::Name(name) => ParameterInfo::new(name, None),
            ParameterSchema::Full {
                name,
                declared_type,
                is_builtin,
            } => {
                let mut info = ParameterInfo::new(name, declared_type.as_deref());
                if let Some(is_builtin) = is_builtin {
                    info.is_builtin = is_builtin;
                }
                info
            }
        }
    }
}

/// [`TypeIntrospector`] backed by a JSON schema file.
///
/// The schema lists every known type with its optional parent and its methods,
/// each with ordered parameters:
///
/// ```json
/// {
///   "types": {
///     "Google\\Cloud\\Dlp\\V2\\DlpServiceClient": {
///       "parent": "Google\\Cloud\\Dlp\\V2\\Gapic\\DlpServiceGapicClient"
///     },
///     "Google\\Cloud\\Dlp\\V2\\Gapic\\DlpServiceGapicClient": {
///       "methods": {
///         "createDlpJob": [
///           { "name": "parent", "type": "string" },
///           { "name": "optionalArgs", "type": "array" }
///         ]
///       }
///     }
///   }
/// }
/// ```
///
/// `is_builtin` may be given per parameter; otherwise it is derived from the
/// declared type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaIntrospector {
    path: Option<PathBuf>,
    table: TypeTable,
}

impl SchemaIntrospector {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IntrospectionError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| IntrospectionError::io(path, source))?;
        let path = path.to_path_buf();
        let mut introspector = Self::parse(&text, Some(&path))?;
        tracing::debug!(
            target: "rewire.types",
            path = %path.display(),
            types = introspector.table.len(),
            "loaded type schema"
        );
        introspector.path = Some(path);
        Ok(introspector)
    }

    pub fn from_json_str(text: &str) -> Result<Self, IntrospectionError> {
        Self::parse(text, None)
    }

    fn parse(text: &str, path: Option<&PathBuf>) -> Result<Self, IntrospectionError> {
        let file: SchemaFile =
            serde_json::from_str(text).map_err(|err| IntrospectionError::json(path, err))?;
        let mut table = TypeTable::default();
        for (name, schema) in file.types {
            let entry = table.entry_mut(&name);
            entry.parent = schema.parent;
            for (method, params) in schema.methods {
                entry.methods.insert(
                    method.to_ascii_lowercase(),
                    params.into_iter().map(ParameterSchema::into_info).collect(),
                );
            }
        }
        Ok(Self { path: None, table })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn type_count(&self) -> usize {
        self.table.len()
    }
}

impl TypeIntrospector for SchemaIntrospector {
    fn type_exists(&self, name: &str) -> bool {
        self.table.type_exists(name)
    }

    fn method_exists(&self, type_name: &str, method: &str) -> bool {
        self.table.method_exists(type_name, method)
    }

    fn parameters(&self, type_name: &str, method: &str) -> Option<Vec<ParameterInfo>> {
        self.table.parameters(type_name, method)
    }

    fn parent_type(&self, name: &str) -> Option<String> {
        self.table.parent_type(name)
    }

    fn probe(&self) -> Result<(), IntrospectionError> {
        if self.table.len() == 0 {
            let origin = self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<inline>".to_owned());
            return Err(IntrospectionError::Unavailable(format!(
                "type schema {origin} declares no types"
            )));
        }
        Ok(())
    }
}
