use std::collections::HashMap;

use rewire_types::{normalize_type_name, MethodInfo, TypeIntrospector};
use serde::Serialize;

/// Bounds parent-chain walks when checking for the generated-parent marker.
const MAX_ANCESTORS: usize = 32;

/// Naming conventions that identify legacy clients and shape the rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Legacy client FQNs must start with this prefix.
    pub namespace_prefix: String,
    /// Legacy client short names must end with this suffix.
    pub client_suffix: String,
    /// Namespace segment inserted before the short name of a next-gen client.
    pub next_gen_segment: String,
    /// When set, some ancestor of a legacy client must contain this string.
    pub generated_parent_marker: Option<String>,
    /// Name of the catch-all options parameter of legacy methods.
    pub options_parameter: String,
    /// Verb prefixed to setter names.
    pub setter_prefix: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            namespace_prefix: "Google\\".to_owned(),
            client_suffix: "Client".to_owned(),
            next_gen_segment: "Client".to_owned(),
            generated_parent_marker: Some("\\Gapic\\".to_owned()),
            options_parameter: "optionalArgs".to_owned(),
            setter_prefix: "set".to_owned(),
        }
    }
}

/// A legacy client type paired with its next-generation counterpart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ClientType {
    pub legacy: String,
    pub next_gen: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    Named,
    Options,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub role: ParameterRole,
}

/// The request type a next-gen method takes, with the legacy method's
/// parameters that feed its setters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestTypeDescriptor {
    pub fqn: String,
    pub short_name: String,
    pub parameters: Vec<ParameterDescriptor>,
}

/// Answers catalog questions through a [`TypeIntrospector`].
///
/// "Not found" is never an error here: it just means the type or call is not
/// something this engine migrates.
pub struct TypeCatalog<'a> {
    introspector: &'a dyn TypeIntrospector,
    options: &'a CatalogOptions,
    requests: HashMap<(String, String), Option<RequestTypeDescriptor>>,
}

impl<'a> TypeCatalog<'a> {
    pub fn new(introspector: &'a dyn TypeIntrospector, options: &'a CatalogOptions) -> Self {
        Self {
            introspector,
            options,
            requests: HashMap::new(),
        }
    }

    pub fn options(&self) -> &CatalogOptions {
        self.options
    }

    /// Maps a legacy client FQN to its next-generation counterpart, if it is a
    /// cataloged legacy client and the counterpart exists.
    pub fn resolve_next_gen_type(&self, legacy: &str) -> Option<String> {
        let legacy = normalize_type_name(legacy);
        let options = self.options;
        if !legacy.starts_with(&options.namespace_prefix) {
            return None;
        }
        let short = short_name(legacy);
        if !short.ends_with(&options.client_suffix) {
            return None;
        }
        let segment = format!("\\{}\\", options.next_gen_segment);
        if legacy.contains(&segment) {
            return None;
        }
        if !self.introspector.type_exists(legacy) {
            return None;
        }
        if let Some(marker) = options.generated_parent_marker.as_deref() {
            if !self.has_marked_ancestor(legacy, marker) {
                tracing::trace!(
                    target: "rewire.refactor",
                    client = legacy,
                    "client has no generated parent; not cataloged"
                );
                return None;
            }
        }

        let namespace = &legacy[..legacy.len() - short.len()];
        let candidate = format!("{namespace}{}\\{short}", options.next_gen_segment);
        self.introspector
            .type_exists(&candidate)
            .then_some(candidate)
    }

    fn has_marked_ancestor(&self, name: &str, marker: &str) -> bool {
        let mut current = name.to_owned();
        for _ in 0..MAX_ANCESTORS {
            let Some(parent) = self.introspector.parent_type(&current) else {
                return false;
            };
            // Parent names are compared with a leading separator so a marker
            // like `\Gapic\` also matches a parent at namespace root depth.
            if format!("\\{}", normalize_type_name(&parent)).contains(marker) {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Ordered parameters of `type_name::method`, including inherited methods.
    pub fn resolve_method(&self, type_name: &str, method: &str) -> Option<MethodInfo> {
        self.introspector.method(type_name, method)
    }

    /// Resolves the request object a migrated call to `client.method` needs.
    ///
    /// Results are memoized for the lifetime of the catalog.
    pub fn resolve_request(
        &mut self,
        client: &ClientType,
        method: &str,
    ) -> Option<RequestTypeDescriptor> {
        let key = (client.legacy.to_ascii_lowercase(), method.to_ascii_lowercase());
        if let Some(cached) = self.requests.get(&key) {
            return cached.clone();
        }
        let resolved = self.resolve_request_uncached(client, method);
        self.requests.insert(key, resolved.clone());
        resolved
    }

    fn resolve_request_uncached(
        &self,
        client: &ClientType,
        method: &str,
    ) -> Option<RequestTypeDescriptor> {
        let next_gen = self.resolve_method(&client.next_gen, method)?;
        let request = next_gen.first_parameter()?;
        let fqn = request.class_name()?.to_owned();
        if !self.introspector.type_exists(&fqn) {
            return None;
        }

        let legacy = self.resolve_method(&client.legacy, method)?;
        let parameters = legacy
            .parameters
            .into_iter()
            .map(|param| {
                let role = if param.name == self.options.options_parameter {
                    ParameterRole::Options
                } else {
                    ParameterRole::Named
                };
                ParameterDescriptor {
                    name: param.name,
                    role,
                }
            })
            .collect();

        Some(RequestTypeDescriptor {
            short_name: short_name(&fqn).to_owned(),
            fqn,
            parameters,
        })
    }
}

/// Last component of a namespaced name.
pub fn short_name(fqn: &str) -> &str {
    fqn.rsplit('\\').next().unwrap_or(fqn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rewire_types::StaticIntrospector;

    const LEGACY: &str = "Google\\Cloud\\Dlp\\V2\\DlpServiceClient";
    const GAPIC: &str = "Google\\Cloud\\Dlp\\V2\\Gapic\\DlpServiceGapicClient";
    const NEXT_GEN: &str = "Google\\Cloud\\Dlp\\V2\\Client\\DlpServiceClient";
    const REQUEST: &str = "Google\\Cloud\\Dlp\\V2\\CreateDlpJobRequest";

    fn types() -> StaticIntrospector {
        StaticIntrospector::new()
            .with_parent(LEGACY, GAPIC)
            .with_method(
                GAPIC,
                "createDlpJob",
                [("parent", Some("string")), ("optionalArgs", Some("array"))],
            )
            .with_parameters(GAPIC, "close", Vec::new())
            .with_method(
                NEXT_GEN,
                "createDlpJob",
                [("request", Some(REQUEST)), ("callOptions", Some("array"))],
            )
            .with_parameters(NEXT_GEN, "close", Vec::new())
            .with_type(REQUEST)
    }

    #[test]
    fn next_gen_type_inserts_segment() {
        let types = types();
        let options = CatalogOptions::default();
        let catalog = TypeCatalog::new(&types, &options);
        assert_eq!(
            catalog.resolve_next_gen_type(&format!("\\{LEGACY}")).as_deref(),
            Some(NEXT_GEN)
        );
        assert_eq!(catalog.resolve_next_gen_type(NEXT_GEN), None);
        assert_eq!(catalog.resolve_next_gen_type("Acme\\FooClient"), None);
        assert_eq!(
            catalog.resolve_next_gen_type("Google\\Cloud\\Dlp\\V2\\DlpServiceHelper"),
            None
        );
    }

    #[test]
    fn next_gen_type_requires_generated_parent() {
        let types = StaticIntrospector::new()
            .with_type("Google\\Cloud\\Foo\\FooClient")
            .with_type("Google\\Cloud\\Foo\\Client\\FooClient");
        let mut options = CatalogOptions::default();
        assert_eq!(
            TypeCatalog::new(&types, &options).resolve_next_gen_type("Google\\Cloud\\Foo\\FooClient"),
            None
        );
        options.generated_parent_marker = None;
        assert_eq!(
            TypeCatalog::new(&types, &options)
                .resolve_next_gen_type("Google\\Cloud\\Foo\\FooClient")
                .as_deref(),
            Some("Google\\Cloud\\Foo\\Client\\FooClient")
        );
    }

    #[test]
    fn request_descriptor_takes_legacy_parameters() {
        let types = types();
        let options = CatalogOptions::default();
        let mut catalog = TypeCatalog::new(&types, &options);
        let client = ClientType {
            legacy: LEGACY.to_owned(),
            next_gen: NEXT_GEN.to_owned(),
        };
        let request = catalog.resolve_request(&client, "createDlpJob").unwrap();
        assert_eq!(request.fqn, REQUEST);
        assert_eq!(request.short_name, "CreateDlpJobRequest");
        assert_eq!(
            request.parameters,
            vec![
                ParameterDescriptor {
                    name: "parent".to_owned(),
                    role: ParameterRole::Named,
                },
                ParameterDescriptor {
                    name: "optionalArgs".to_owned(),
                    role: ParameterRole::Options,
                },
            ]
        );
        // Methods without a request object are not RPCs.
        assert_eq!(catalog.resolve_request(&client, "close"), None);
        assert_eq!(catalog.resolve_request(&client, "missing"), None);
    }
}
