//! Native-to-portable column type mappings registered per connection.

use crate::models::PortableType;
use std::collections::BTreeMap;

/// Custom mappings from engine-native column types to portable types.
///
/// Native names are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMappings {
    mappings: BTreeMap<String, PortableType>,
}

impl TypeMappings {
    /// Registers (or overrides) the mapping for a native type.
    pub fn register(&mut self, native_type: &str, portable: PortableType) -> &mut Self {
        self.mappings.insert(native_type.to_lowercase(), portable);
        self
    }

    /// Looks up the portable type for a native type.
    pub fn get(&self, native_type: &str) -> Option<&PortableType> {
        self.mappings.get(&native_type.to_lowercase())
    }

    /// Number of registered mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterates `(native, portable)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PortableType)> {
        self.mappings
            .iter()
            .map(|(native, portable)| (native.as_str(), portable))
    }
}
