// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversions between opcsim types and `opcua` types.

use opcua::types::{
    BrowsePath, NodeId, ObjectId, QualifiedName as UaQualifiedName, ReferenceTypeId,
    RelativePath, RelativePathElement, UAString, Variant,
};

use opcsim_core::{QualifiedName, TagPath};

use crate::nodes::NodeKey;

/// Converts a browse name.
pub fn to_ua_qualified_name(name: &QualifiedName) -> UaQualifiedName {
    UaQualifiedName::new(name.namespace_index, name.name.as_str())
}

/// Converts a staged node key.
pub fn to_node_id(key: &NodeKey) -> NodeId {
    NodeId::new(key.namespace_index, UAString::from(key.identifier.as_str()))
}

/// Returns the string node id of the object or variable at `segments`.
pub fn node_id_for(segments: &[QualifiedName]) -> NodeId {
    to_node_id(&NodeKey::of(segments))
}

/// Builds a browse path from the Objects folder along hierarchical
/// references.
pub fn to_browse_path(path: &TagPath) -> BrowsePath {
    let elements = path
        .segments()
        .iter()
        .map(|segment| RelativePathElement {
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            is_inverse: false,
            include_subtypes: true,
            target_name: to_ua_qualified_name(segment),
        })
        .collect();

    BrowsePath {
        starting_node: ObjectId::ObjectsFolder.into(),
        relative_path: RelativePath {
            elements: Some(elements),
        },
    }
}

/// Extracts a numeric value as `f64`.
pub fn variant_to_f64(variant: &Variant) -> Option<f64> {
    match variant {
        Variant::Double(v) => Some(*v),
        Variant::Float(v) => Some(f64::from(*v)),
        Variant::SByte(v) => Some(f64::from(*v)),
        Variant::Byte(v) => Some(f64::from(*v)),
        Variant::Int16(v) => Some(f64::from(*v)),
        Variant::UInt16(v) => Some(f64::from(*v)),
        Variant::Int32(v) => Some(f64::from(*v)),
        Variant::UInt32(v) => Some(f64::from(*v)),
        Variant::Int64(v) => Some(*v as f64),
        Variant::UInt64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Extracts the URIs of a `Server_NamespaceArray` value.
pub fn namespace_array(variant: &Variant) -> Option<Vec<String>> {
    match variant {
        Variant::Array(array) => Some(
            array
                .values
                .iter()
                .map(|v| match v {
                    Variant::String(s) => s.as_ref().to_string(),
                    _ => String::new(),
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcua::types::{Array, VariantTypeId};

    #[test]
    fn test_browse_path_elements() {
        let path: TagPath = "Objects/2:MockDevice/2:Temperature".parse().unwrap();
        let browse = to_browse_path(&path);
        let elements = browse.relative_path.elements.unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].target_name, UaQualifiedName::new(2, "Temperature"));
        assert_eq!(browse.starting_node, NodeId::from(&ObjectId::ObjectsFolder));
    }

    #[test]
    fn test_node_id_for_tag() {
        let path: TagPath = "Objects/2:MockDevice/2:Pressure".parse().unwrap();
        let node_id = node_id_for(path.segments());
        assert_eq!(node_id, NodeId::new(2, "MockDevice.Pressure"));
        assert_eq!(node_id.to_string(), "ns=2;s=MockDevice.Pressure");
    }

    #[test]
    fn test_variant_to_f64() {
        assert_eq!(variant_to_f64(&Variant::Double(25.5)), Some(25.5));
        assert_eq!(variant_to_f64(&Variant::Int32(7)), Some(7.0));
        assert_eq!(variant_to_f64(&Variant::Boolean(true)), None);
    }

    #[test]
    fn test_namespace_array() {
        let array = Array::new(
            VariantTypeId::String,
            vec![
                Variant::from("http://opcfoundation.org/UA/"),
                Variant::from("http://example.com/mockopcua"),
            ],
        )
        .unwrap();
        let uris = namespace_array(&Variant::Array(Box::new(array))).unwrap();
        assert_eq!(uris[1], "http://example.com/mockopcua");
        assert!(namespace_array(&Variant::Double(1.0)).is_none());
    }
}
