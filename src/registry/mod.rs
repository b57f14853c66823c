//! Content registries - stable per-session IDs keyed by `namespace:name` handles
//!
//! Registration is two-phase: definitions accumulate while the registry is open,
//! then [`Registry::complete_registration`] freezes them into a fixed lookup
//! table. IDs are assigned in registration order and are only valid for the
//! current process run; save files store handles, never raw IDs.

mod registries;

pub use registries::{Registries, VOID_TILE};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Namespace used by built-in content
pub const BASE_NAMESPACE: &str = "base";

/// Stable cross-save identifier for a piece of content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub namespace: String,
    pub name: String,
}

impl ResourceHandle {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Handle in the built-in `base` namespace
    pub fn base(name: impl Into<String>) -> Self {
        Self::new(BASE_NAMESPACE, name)
    }

    /// Parse the textual `namespace:name` form
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        match text.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains(':') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(RegistryError::InvalidHandle(text.to_string())),
        }
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Anything that can live in a [`Registry`]
pub trait Registrable {
    fn handle(&self) -> &ResourceHandle;
}

enum Entries<T> {
    Open(Vec<T>),
    Sealed(Box<[T]>),
}

/// Two-phase registry: open during startup, sealed before gameplay
pub struct Registry<T> {
    name: &'static str,
    entries: Entries<T>,
    ids: HashMap<ResourceHandle, usize>,
}

impl<T: Registrable> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Entries::Open(Vec::new()),
            ids: HashMap::new(),
        }
    }

    /// Registry name used in diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a definition, returning its session ID
    pub fn register(&mut self, def: T) -> Result<usize, RegistryError> {
        let handle = def.handle().clone();
        let buffer = match &mut self.entries {
            Entries::Open(buffer) => buffer,
            Entries::Sealed(_) => {
                return Err(RegistryError::Sealed {
                    registry: self.name,
                    handle: handle.to_string(),
                });
            }
        };

        if self.ids.contains_key(&handle) {
            return Err(RegistryError::Duplicate {
                registry: self.name,
                handle: handle.to_string(),
            });
        }

        let id = buffer.len();
        buffer.push(def);
        log::trace!("[REG] {} #{} = {}", self.name, id, handle);
        self.ids.insert(handle, id);
        Ok(id)
    }

    /// Freeze the accumulated definitions. Calling this twice is a no-op.
    pub fn complete_registration(&mut self) {
        if let Entries::Open(buffer) = &mut self.entries {
            let frozen = std::mem::take(buffer).into_boxed_slice();
            log::debug!("[REG] {} sealed with {} entries", self.name, frozen.len());
            self.entries = Entries::Sealed(frozen);
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.entries, Entries::Sealed(_))
    }

    fn sealed(&self) -> Result<&[T], RegistryError> {
        match &self.entries {
            Entries::Sealed(entries) => Ok(entries),
            Entries::Open(_) => Err(RegistryError::NotSealed(self.name)),
        }
    }

    /// Look up a definition by session ID
    pub fn get(&self, id: usize) -> Result<&T, RegistryError> {
        let entries = self.sealed()?;
        entries.get(id).ok_or(RegistryError::OutOfRange {
            registry: self.name,
            id,
            size: entries.len(),
        })
    }

    /// Resolve a handle to its session ID
    pub fn id_of(&self, handle: &ResourceHandle) -> Result<usize, RegistryError> {
        self.sealed()?;
        self.ids
            .get(handle)
            .copied()
            .ok_or_else(|| RegistryError::NotFound {
                registry: self.name,
                handle: handle.to_string(),
            })
    }

    /// Resolve a `namespace:name` string to its session ID
    pub fn id_of_str(&self, text: &str) -> Result<usize, RegistryError> {
        self.id_of(&ResourceHandle::parse(text)?)
    }

    /// Number of registered definitions (open or sealed)
    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Open(buffer) => buffer.len(),
            Entries::Sealed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sealed entries in ID order. Empty while the registry is still open.
    pub fn entries(&self) -> &[T] {
        self.sealed().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Thing(ResourceHandle);

    impl Registrable for Thing {
        fn handle(&self) -> &ResourceHandle {
            &self.0
        }
    }

    fn thing(name: &str) -> Thing {
        Thing(ResourceHandle::base(name))
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut registry = Registry::new("things");
        assert_eq!(registry.register(thing("a")).unwrap(), 0);
        assert_eq!(registry.register(thing("b")).unwrap(), 1);
        registry.complete_registration();

        assert_eq!(registry.id_of(&ResourceHandle::base("b")).unwrap(), 1);
        assert_eq!(registry.get(0).unwrap().0.name, "a");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_after_seal_fails() {
        let mut registry = Registry::new("things");
        registry.register(thing("a")).unwrap();
        registry.complete_registration();

        let err = registry.register(thing("b")).unwrap_err();
        assert!(matches!(err, RegistryError::Sealed { .. }));
    }

    #[test]
    fn test_seal_is_idempotent() {
        let mut registry = Registry::new("things");
        registry.register(thing("a")).unwrap();
        registry.complete_registration();
        registry.complete_registration();

        assert!(registry.is_sealed());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(0).is_ok());
    }

    #[test]
    fn test_get_out_of_range() {
        let mut registry = Registry::new("things");
        registry.register(thing("a")).unwrap();
        registry.complete_registration();

        assert_eq!(
            registry.get(1).unwrap_err(),
            RegistryError::OutOfRange {
                registry: "things",
                id: 1,
                size: 1
            }
        );
    }

    #[test]
    fn test_unknown_handle() {
        let mut registry: Registry<Thing> = Registry::new("things");
        registry.complete_registration();

        let err = registry.id_of(&ResourceHandle::new("mod", "x")).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn test_lookup_before_seal() {
        let mut registry = Registry::new("things");
        registry.register(thing("a")).unwrap();

        assert!(matches!(registry.get(0), Err(RegistryError::NotSealed(_))));
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn test_duplicate_handle() {
        let mut registry = Registry::new("things");
        registry.register(thing("a")).unwrap();
        assert!(matches!(
            registry.register(thing("a")),
            Err(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_handle_parse() {
        let handle = ResourceHandle::parse("mymod:copper_wall").unwrap();
        assert_eq!(handle, ResourceHandle::new("mymod", "copper_wall"));
        assert_eq!(handle.to_string(), "mymod:copper_wall");

        assert!(ResourceHandle::parse("nocolon").is_err());
        assert!(ResourceHandle::parse(":name").is_err());
        assert!(ResourceHandle::parse("a:b:c").is_err());
    }
}
