// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory tag registry.
//!
//! The registry is an insertion-ordered map from tag name to [`Tag`]. It is
//! created once at startup, mutated by the update loop on every tick and
//! discarded at process exit. Server transports reach it only through
//! [`TagAccessor`]s handed out at publish time.
//!
//! # Examples
//!
//! ```
//! use opcsim_core::registry::TagRegistry;
//!
//! let mut registry = TagRegistry::new();
//! registry.create("Temperature", 25.0, true).unwrap();
//!
//! registry.set("Temperature", 26.5).unwrap();
//! assert_eq!(registry.get("Temperature").unwrap(), 26.5);
//! assert!(registry.create("Temperature", 0.0, true).is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::TagSpec;
use crate::error::RegistryError;
use crate::types::{Tag, TagRange, TickReport};

/// A registry shared between the update loop and a server transport.
pub type SharedRegistry = Arc<RwLock<TagRegistry>>;

// =============================================================================
// TagRegistry
// =============================================================================

/// Insertion-ordered store of current tag values.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
    index: HashMap<String, usize>,
}

impl TagRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every tag of a configuration, in order.
    pub fn from_specs(specs: &[TagSpec]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.create(&spec.name, spec.initial_value, spec.writable)?;
            registry.bound(&spec.name, spec.range)?;
            registry.describe(&spec.name, spec.effective_display_name())?;
        }
        Ok(registry)
    }

    /// Wraps this registry for sharing with a server transport.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Registers a new tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTag`] if the name is taken; the
    /// existing tag is left untouched.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        initial_value: f64,
        writable: bool,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RegistryError::duplicate_tag(name));
        }
        self.index.insert(name.clone(), self.tags.len());
        self.tags.push(Tag::new(name, initial_value, writable));
        Ok(())
    }

    /// Returns the current value of a tag.
    pub fn get(&self, name: &str) -> Result<f64, RegistryError> {
        self.tag(name)
            .map(Tag::value)
            .ok_or_else(|| RegistryError::unknown_tag(name))
    }

    /// Overwrites the current value of a tag.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownTag`] if absent, [`RegistryError::NotWritable`]
    /// if the tag's writable flag is false.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), RegistryError> {
        let tag = self.tag_mut(name)?;
        if !tag.is_writable() {
            return Err(RegistryError::not_writable(name));
        }
        tag.set_value(value);
        Ok(())
    }

    /// Attaches the declared value range of a tag.
    pub fn bound(&mut self, name: &str, range: TagRange) -> Result<(), RegistryError> {
        self.tag_mut(name)?.set_range(range);
        Ok(())
    }

    /// Sets the display name of a tag.
    pub fn describe(&mut self, name: &str, display_name: &str) -> Result<(), RegistryError> {
        self.tag_mut(name)?.set_display_name(display_name);
        Ok(())
    }

    /// Returns a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.index.get(name).map(|&i| &self.tags[i])
    }

    fn tag_mut(&mut self, name: &str) -> Result<&mut Tag, RegistryError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.tags[i]),
            None => Err(RegistryError::unknown_tag(name)),
        }
    }

    /// Iterates over tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Returns tag names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name().to_string()).collect()
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tags are registered.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns the current values as a report, in insertion order.
    pub fn snapshot(&self) -> TickReport {
        let mut report = TickReport::new();
        for tag in &self.tags {
            report.push(tag.display_name(), tag.value());
        }
        report
    }
}

// =============================================================================
// TagAccessor
// =============================================================================

/// Read/write access to one tag of a shared registry.
///
/// Server transports hold one accessor per published tag and use it to
/// serve remote reads and writes.
#[derive(Debug, Clone)]
pub struct TagAccessor {
    registry: SharedRegistry,
    name: String,
}

impl TagAccessor {
    /// Creates an accessor for `name`, failing if the tag is not registered.
    pub fn new(registry: SharedRegistry, name: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into();
        if registry.read().tag(&name).is_none() {
            return Err(RegistryError::unknown_tag(name));
        }
        Ok(Self { registry, name })
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the current value.
    pub fn read(&self) -> Result<f64, RegistryError> {
        self.registry.read().get(&self.name)
    }

    /// Writes a new value, honoring the writable flag.
    pub fn write(&self, value: f64) -> Result<(), RegistryError> {
        self.registry.write().set(&self.name, value)
    }

    /// Returns `true` if the tag accepts writes.
    pub fn is_writable(&self) -> bool {
        self.registry
            .read()
            .tag(&self.name)
            .map(Tag::is_writable)
            .unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_tags;

    #[test]
    fn test_create_get_set() {
        let mut registry = TagRegistry::new();
        registry.create("Temperature", 25.0, true).unwrap();

        assert_eq!(registry.get("Temperature").unwrap(), 25.0);
        registry.set("Temperature", 21.75).unwrap();
        assert_eq!(registry.get("Temperature").unwrap(), 21.75);
        assert_eq!(registry.get("Temperature").unwrap(), 21.75);
    }

    #[test]
    fn test_duplicate_create_keeps_value() {
        let mut registry = TagRegistry::new();
        registry.create("Pressure", 1000.0, true).unwrap();
        registry.set("Pressure", 990.5).unwrap();

        let err = registry.create("Pressure", 0.0, false).unwrap_err();
        assert_eq!(err, RegistryError::duplicate_tag("Pressure"));
        assert_eq!(registry.get("Pressure").unwrap(), 990.5);
        assert!(registry.tag("Pressure").unwrap().is_writable());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_tag() {
        let mut registry = TagRegistry::new();
        assert_eq!(
            registry.get("Humidity").unwrap_err(),
            RegistryError::unknown_tag("Humidity")
        );
        assert_eq!(
            registry.set("Humidity", 1.0).unwrap_err(),
            RegistryError::unknown_tag("Humidity")
        );
    }

    #[test]
    fn test_not_writable() {
        let mut registry = TagRegistry::new();
        registry.create("Serial", 42.0, false).unwrap();

        assert_eq!(
            registry.set("Serial", 1.0).unwrap_err(),
            RegistryError::not_writable("Serial")
        );
        assert_eq!(registry.get("Serial").unwrap(), 42.0);
    }

    #[test]
    fn test_insertion_order() {
        let registry = TagRegistry::from_specs(&default_tags()).unwrap();
        assert_eq!(registry.names(), vec!["Temperature", "Pressure", "FlowRate"]);
        assert_eq!(
            registry.snapshot().to_string(),
            "Temperature: 25.00, Pressure: 1000.00, Flow Rate: 10.00"
        );
    }

    #[test]
    fn test_accessor() {
        let shared = TagRegistry::from_specs(&default_tags()).unwrap().into_shared();
        let accessor = TagAccessor::new(shared.clone(), "FlowRate").unwrap();

        assert_eq!(accessor.read().unwrap(), 10.0);
        accessor.write(12.5).unwrap();
        assert_eq!(shared.read().get("FlowRate").unwrap(), 12.5);
        assert!(accessor.is_writable());

        assert!(TagAccessor::new(shared, "Missing").is_err());
    }
}
