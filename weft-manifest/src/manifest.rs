//! Manifest and schema node types.
//!
//! A manifest declares a plugin's identity, the plugins it imports, a table
//! of named types, and the shape of its store. Schema structs serialize to
//! the upstream camelCase wire format.

use crate::{ManifestError, ManifestResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Built-in scalar type names a schema node may declare.
pub const PRIMITIVE_TYPES: [&str; 5] = ["boolean", "string", "int", "float", "file"];

/// Sentinel key type carried by a cross-plugin ref until it is resolved.
pub const UNRESOLVED_KEY_TYPE: &str = "<?>";

/// Returns true if `name` is one of the built-in scalar types.
#[must_use]
pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// An ordered mapping of field names to schema nodes.
///
/// Ordered so every schema walk visits keys lexically, which downstream
/// consumers rely on for stable, deep-equal output across rebuilds.
pub type TypeStruct = BTreeMap<String, SchemaNode>;

/// Resolved manifests keyed by plugin name — the unit schema resolution
/// operates on.
pub type SchemaMap = BTreeMap<String, Manifest>;

/// One entry in a [`TypeStruct`]: a concrete node or a nested struct.
///
/// Discrimination follows the wire format: an object with a string-valued
/// `type` attribute is a node, any other object is a nested struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Node(ManifestNode),
    Struct(TypeStruct),
}

impl SchemaNode {
    /// The concrete node, if this entry is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&ManifestNode> {
        match self {
            SchemaNode::Node(node) => Some(node),
            SchemaNode::Struct(_) => None,
        }
    }

    /// The nested struct, if this entry is one.
    #[must_use]
    pub fn as_struct(&self) -> Option<&TypeStruct> {
        match self {
            SchemaNode::Node(_) => None,
            SchemaNode::Struct(nested) => Some(nested),
        }
    }
}

/// Element type of a collection: a (possibly namespaced) type name, or a
/// struct declared inline on the collection itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionValues {
    TypeName(String),
    Inline(TypeStruct),
}

/// Referential action applied to a referrer when its target is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    #[default]
    Delete,
    Nullify,
}

/// A concrete schema node: scalar, collection, or reference declaration.
///
/// Optional attributes are omitted from JSON when unset so serialized
/// schemas stay minimal and stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestNode {
    /// Type name: a primitive, `set`, `array`, `ref<...>`, a concretized
    /// `ref`, or a named type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Marks the identity field of a keyed collection element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_key: Option<bool>,
    /// Element type of a `set`/`array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<CollectionValues>,
    /// Target of a concretized `ref` node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    /// Declared type of the referenced element's key; [`UNRESOLVED_KEY_TYPE`]
    /// while deferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emptyable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_ordering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<OnDelete>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ManifestNode {
    /// True when the declared type is a built-in scalar.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        is_primitive_type(&self.ty)
    }

    /// True for `set` and `array` nodes.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.ty == "set" || self.ty == "array"
    }

    /// Inner target of a `ref<...>` type string, if this node declares one.
    #[must_use]
    pub fn ref_target(&self) -> Option<&str> {
        self.ty
            .strip_prefix("ref<")
            .and_then(|rest| rest.strip_suffix('>'))
    }
}

/// A plugin manifest: identity, imports, named types, and the store shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    /// Imported plugins, name to version.
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
    /// Named types, usable from `store` and from other named types.
    #[serde(default)]
    pub types: TypeStruct,
    /// The store shape this plugin persists.
    #[serde(default)]
    pub store: TypeStruct,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Value>,
}

impl Manifest {
    /// Cache identity for this manifest, `"<name>-<version>"`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Validates manifest structure before resolution.
    ///
    /// Checks identity fields, collection key rules (sets declare exactly one
    /// key, arrays none — their element ids are assigned later), keyable key
    /// types, and that local named types contain no reference cycles. Cycle
    /// freedom is a precondition of type expansion.
    pub fn validate(&self) -> ManifestResult<()> {
        if self.name.is_empty() {
            return Err(ManifestError::EmptyField("name"));
        }
        if self.version.is_empty() {
            return Err(ManifestError::EmptyField("version"));
        }
        self.check_type_cycles()?;
        for (type_name, node) in &self.types {
            if let SchemaNode::Struct(body) = node {
                self.validate_struct(body, type_name)?;
            }
        }
        self.validate_struct(&self.store, "store")
    }

    /// Looks up a named type declared by this manifest, accepting both the
    /// declared key and a self-namespaced spelling of it.
    fn local_type(&self, name: &str) -> Option<&SchemaNode> {
        self.local_type_key(name).and_then(|key| self.types.get(key))
    }

    /// Canonical `types` key for `name`, if it names a local type.
    fn local_type_key(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.types.get_key_value(name) {
            return Some(key.as_str());
        }
        name.strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|local| self.types.get_key_value(local))
            .map(|(key, _)| key.as_str())
    }

    fn validate_struct(&self, strct: &TypeStruct, path: &str) -> ManifestResult<()> {
        for (field, node) in strct {
            let field_path = join_path(path, field);
            match node {
                SchemaNode::Struct(nested) => self.validate_struct(nested, &field_path)?,
                SchemaNode::Node(n) if n.is_collection() => match &n.values {
                    Some(CollectionValues::Inline(element)) => {
                        self.validate_element_keys(element, &field_path, &n.ty)?;
                        self.validate_struct(element, &field_path)?;
                    }
                    Some(CollectionValues::TypeName(name)) if !is_primitive_type(name) => {
                        // Element types declared elsewhere are opaque to a
                        // single manifest; key rules only run for local ones.
                        if let Some(SchemaNode::Struct(element)) = self.local_type(name) {
                            self.validate_element_keys(element, &field_path, &n.ty)?;
                        }
                    }
                    _ => {}
                },
                SchemaNode::Node(_) => {}
            }
        }
        Ok(())
    }

    fn validate_element_keys(
        &self,
        element: &TypeStruct,
        path: &str,
        collection_ty: &str,
    ) -> ManifestResult<()> {
        let mut key_count = 0usize;
        for (field, node) in element {
            let SchemaNode::Node(n) = node else { continue };
            if n.is_key != Some(true) {
                continue;
            }
            key_count += 1;
            let keyable = matches!(n.ty.as_str(), "string" | "int" | "float")
                || n.ref_target().is_some();
            if !keyable {
                return Err(ManifestError::UnkeyableType {
                    path: path.to_string(),
                    field: field.clone(),
                    ty: n.ty.clone(),
                });
            }
        }
        match (collection_ty, key_count) {
            ("set", 0) => Err(ManifestError::MissingKey(path.to_string())),
            ("set", 1) => Ok(()),
            ("set", _) => Err(ManifestError::TooManyKeys(path.to_string())),
            (_, 0) => Ok(()),
            (_, _) => Err(ManifestError::KeyedArray(path.to_string())),
        }
    }

    fn check_type_cycles(&self) -> ManifestResult<()> {
        let mut done: BTreeSet<&str> = BTreeSet::new();
        for type_name in self.types.keys() {
            let mut stack: Vec<&str> = Vec::new();
            self.visit_type(type_name, &mut stack, &mut done)?;
        }
        Ok(())
    }

    fn visit_type<'a>(
        &'a self,
        type_name: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> ManifestResult<()> {
        if done.contains(type_name) {
            return Ok(());
        }
        if stack.contains(&type_name) {
            return Err(ManifestError::CyclicType(type_name.to_string()));
        }
        stack.push(type_name);
        if let Some(node) = self.types.get(type_name) {
            let mut referenced = Vec::new();
            self.collect_type_refs(node, &mut referenced);
            for target in referenced {
                self.visit_type(target, stack, done)?;
            }
        }
        stack.pop();
        done.insert(type_name);
        Ok(())
    }

    /// Collects local named types referenced by `node`, directly or through
    /// collection values. Ref targets are lazy and do not count as edges.
    fn collect_type_refs<'a>(&'a self, node: &'a SchemaNode, out: &mut Vec<&'a str>) {
        match node {
            SchemaNode::Struct(nested) => {
                for child in nested.values() {
                    self.collect_type_refs(child, out);
                }
            }
            SchemaNode::Node(n) => {
                match &n.values {
                    Some(CollectionValues::TypeName(name)) => {
                        if let Some(key) = self.local_type_key(name) {
                            out.push(key);
                        }
                    }
                    Some(CollectionValues::Inline(element)) => {
                        for child in element.values() {
                            self.collect_type_refs(child, out);
                        }
                    }
                    None => {}
                }
                if let Some(key) = self.local_type_key(&n.ty) {
                    out.push(key);
                }
            }
        }
    }
}

fn join_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}
