use std::collections::{BTreeMap, HashSet};

use crate::{normalize_type_name, ParameterInfo, TypeIntrospector};

/// Upper bound on parent-chain walks, guarding against cyclic metadata.
const MAX_ANCESTORS: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TypeEntry {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    /// Keyed by lowercased method name.
    pub(crate) methods: BTreeMap<String, Vec<ParameterInfo>>,
}

/// Case-insensitive type table shared by the introspector implementations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TypeTable {
    types: BTreeMap<String, TypeEntry>,
}

fn type_key(name: &str) -> String {
    normalize_type_name(name).to_ascii_lowercase()
}

impl TypeTable {
    pub(crate) fn len(&self) -> usize {
        self.types.len()
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> &mut TypeEntry {
        self.types
            .entry(type_key(name))
            .or_insert_with(|| TypeEntry {
                name: normalize_type_name(name).to_owned(),
                ..TypeEntry::default()
            })
    }

    fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(&type_key(name))
    }

    /// Finds `method` on `type_name` or the nearest ancestor declaring it.
    fn lookup_method(&self, type_name: &str, method: &str) -> Option<&[ParameterInfo]> {
        let method_key = method.to_ascii_lowercase();
        let mut seen = HashSet::new();
        let mut current = self.get(type_name)?;
        for _ in 0..MAX_ANCESTORS {
            if let Some(params) = current.methods.get(&method_key) {
                return Some(params);
            }
            if !seen.insert(type_key(&current.name)) {
                return None;
            }
            current = self.get(current.parent.as_deref()?)?;
        }
        None
    }
}

impl TypeIntrospector for TypeTable {
    fn type_exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn method_exists(&self, type_name: &str, method: &str) -> bool {
        self.lookup_method(type_name, method).is_some()
    }

    fn parameters(&self, type_name: &str, method: &str) -> Option<Vec<ParameterInfo>> {
        self.lookup_method(type_name, method).map(<[_]>::to_vec)
    }

    fn parent_type(&self, name: &str) -> Option<String> {
        self.get(name)?.parent.clone()
    }
}

/// In-memory [`TypeIntrospector`] assembled with builder calls.
///
/// ```
/// use rewire_types::{StaticIntrospector, TypeIntrospector};
///
/// let types = StaticIntrospector::new()
///     .with_parent("Acme\\FooClient", "Acme\\Gapic\\FooGapicClient")
///     .with_method("Acme\\Gapic\\FooGapicClient", "get", [("name", Some("string"))]);
/// assert!(types.method_exists("\\Acme\\FooClient", "get"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticIntrospector {
    table: TypeTable,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, name: &str) -> Self {
        self.table.entry_mut(name);
        self
    }

    /// Declares `name` with `parent` as its direct parent. The parent type is
    /// registered too.
    #[must_use]
    pub fn with_parent(mut self, name: &str, parent: &str) -> Self {
        self.table.entry_mut(parent);
        self.table.entry_mut(name).parent = Some(normalize_type_name(parent).to_owned());
        self
    }

    /// Declares a method from `(name, declared type)` pairs.
    #[must_use]
    pub fn with_method<'a>(
        self,
        type_name: &str,
        method: &str,
        params: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Self {
        let params = params
            .into_iter()
            .map(|(name, ty)| ParameterInfo::new(name, ty))
            .collect();
        self.with_parameters(type_name, method, params)
    }

    #[must_use]
    pub fn with_parameters(
        mut self,
        type_name: &str,
        method: &str,
        params: Vec<ParameterInfo>,
    ) -> Self {
        self.table
            .entry_mut(type_name)
            .methods
            .insert(method.to_ascii_lowercase(), params);
        self
    }
}

impl TypeIntrospector for StaticIntrospector {
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
}
