// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address space layout shared by the OPC UA server and client.
//!
//! Published tags get string node identifiers built from their browse
//! path, e.g. `ns=2;s=MockDevice.Temperature`. The server transport stages
//! namespaces and tags here before the OPC UA server exists, so the staging
//! rules (namespace numbering, duplicate detection) are testable without a
//! socket.

use std::collections::HashSet;
use std::fmt;

use opcsim_core::{QualifiedName, TagAccessor, TagPath, TransportError, TransportResult};

/// Index of the first namespace an application can register.
///
/// Index 0 is the OPC UA standard namespace and index 1 the server's own.
pub const FIRST_APPLICATION_NAMESPACE: u16 = 2;

/// Joins browse names into a string node identifier.
pub fn node_identifier(segments: &[QualifiedName]) -> String {
    segments
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// A string node id: the namespace of the node's own browse name plus the
/// joined browse names of its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// Namespace index of the node.
    pub namespace_index: u16,
    /// String identifier within that namespace.
    pub identifier: String,
}

impl NodeKey {
    /// Returns the key of the node at the end of `segments`.
    ///
    /// An empty path maps to namespace 0 and an empty identifier.
    pub fn of(segments: &[QualifiedName]) -> Self {
        Self {
            namespace_index: segments.last().map(|s| s.namespace_index).unwrap_or(0),
            identifier: node_identifier(segments),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};s={}", self.namespace_index, self.identifier)
    }
}

/// Finds `uri` in a server namespace array.
pub fn find_namespace<S: AsRef<str>>(namespaces: &[S], uri: &str) -> Option<u16> {
    namespaces
        .iter()
        .position(|ns| ns.as_ref() == uri)
        .and_then(|i| u16::try_from(i).ok())
}

// =============================================================================
// NamespaceTable
// =============================================================================

/// Namespaces registered before the server is built.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `uri` and returns the index the server will assign to it.
    ///
    /// # Errors
    ///
    /// [`TransportError::Publish`] once the `u16` index space is exhausted.
    pub fn register(&mut self, uri: &str) -> TransportResult<u16> {
        if let Some(existing) = self.index_of(uri) {
            return Ok(existing);
        }
        let index = predicted_index(self.uris.len())
            .ok_or_else(|| TransportError::publish(uri, "Namespace table full"))?;
        self.uris.push(uri.to_string());
        Ok(index)
    }

    /// Returns the predicted index of `uri`.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|ns| ns == uri)
            .and_then(predicted_index)
    }

    /// Returns `true` if `index` denotes a known namespace.
    pub fn contains_index(&self, index: u16) -> bool {
        index < FIRST_APPLICATION_NAMESPACE
            || usize::from(index - FIRST_APPLICATION_NAMESPACE) < self.uris.len()
    }

    /// Returns the registered URIs with their predicted indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        (FIRST_APPLICATION_NAMESPACE..=u16::MAX).zip(self.uris.iter().map(String::as_str))
    }

    /// Returns the number of registered namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

fn predicted_index(position: usize) -> Option<u16> {
    u16::try_from(position)
        .ok()
        .and_then(|i| i.checked_add(FIRST_APPLICATION_NAMESPACE))
}

// =============================================================================
// StagedTags
// =============================================================================

/// An object node a staged tag hangs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNode {
    /// Node id of the object.
    pub key: NodeKey,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Node id of the parent object, `None` for the Objects folder.
    pub parent: Option<NodeKey>,
}

/// Tags published before the server is built, in publication order.
#[derive(Debug, Clone, Default)]
pub struct StagedTags {
    entries: Vec<(TagPath, TagAccessor)>,
    keys: HashSet<NodeKey>,
}

impl StagedTags {
    /// Creates an empty staging area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a tag.
    ///
    /// # Errors
    ///
    /// [`TransportError::Publish`] if a segment uses an unregistered
    /// namespace or the path is already staged.
    pub fn stage(
        &mut self,
        namespaces: &NamespaceTable,
        path: &TagPath,
        accessor: TagAccessor,
    ) -> TransportResult<()> {
        if let Some(segment) = path
            .segments()
            .iter()
            .find(|s| !namespaces.contains_index(s.namespace_index))
        {
            return Err(TransportError::publish(
                path.to_string(),
                format!("Namespace index {} is not registered", segment.namespace_index),
            ));
        }

        if !self.keys.insert(NodeKey::of(path.segments())) {
            return Err(TransportError::publish(path.to_string(), "Already published"));
        }
        self.entries.push((path.clone(), accessor));
        Ok(())
    }

    /// Returns the staged tags in order.
    pub fn entries(&self) -> &[(TagPath, TagAccessor)] {
        &self.entries
    }

    /// Returns every object node needed by the staged tags, parents first
    /// and without duplicates.
    pub fn objects(&self) -> Vec<ObjectNode> {
        let mut seen = HashSet::new();
        let mut objects = Vec::new();
        for (path, _) in &self.entries {
            let parents = path.parents();
            for depth in 1..=parents.len() {
                let key = NodeKey::of(&parents[..depth]);
                if !seen.insert(key.clone()) {
                    continue;
                }
                objects.push(ObjectNode {
                    key,
                    browse_name: parents[depth - 1].clone(),
                    parent: (depth > 1).then(|| NodeKey::of(&parents[..depth - 1])),
                });
            }
        }
        objects
    }

    /// Returns the number of staged tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
