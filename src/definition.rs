//! Service definition model
//! - serde data model for AWS-style service definition documents
//! - `ServiceDefinition` is the read-only query interface the generators consume
//! - `JsonDefinition` backs that interface with a parsed definition document

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    JsonValue,
};

/// One node in the shape graph.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShapeDef {
    #[serde(rename = "type")]
    pub shape_type: String,

    /// structure members, in definition order
    #[serde(default)]
    pub members: IndexMap<String, MemberRef>,

    /// names of required structure members
    #[serde(default)]
    pub required: Vec<String>,

    /// distinguished payload member of a structure
    #[serde(default)]
    pub payload: Option<String>,

    /// element of a list shape
    #[serde(default)]
    pub member: Option<MemberRef>,

    /// key of a map shape
    #[serde(default)]
    pub key: Option<MemberRef>,

    /// value of a map shape
    #[serde(default)]
    pub value: Option<MemberRef>,

    #[serde(default)]
    pub documentation: Option<String>,
}

impl ShapeDef {
    pub fn is_structure(&self) -> bool {
        self.shape_type == "structure"
    }

    pub fn is_list(&self) -> bool {
        self.shape_type == "list"
    }

    pub fn is_map(&self) -> bool {
        self.shape_type == "map"
    }

    pub fn is_required(&self, member: &str) -> bool {
        self.required.iter().any(|r| r == member)
    }
}

/// Reference from a member (or list element, or map key/value) to a named shape,
/// plus the member's http binding.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub shape: String,

    /// where the member travels in the http request: payload (default),
    /// header, headers, uri or querystring
    #[serde(default)]
    pub location: Option<String>,

    /// wire name; the member name is used when absent
    #[serde(default)]
    pub location_name: Option<String>,

    #[serde(default)]
    pub streaming: bool,

    #[serde(default)]
    pub xml_attribute: bool,

    #[serde(default)]
    pub xml_namespace: Option<XmlNamespace>,

    #[serde(default)]
    pub documentation: Option<String>,
}

impl MemberRef {
    /// wire name of this member
    pub fn wire_name<'a>(&'a self, member_name: &'a str) -> &'a str {
        self.location_name.as_deref().unwrap_or(member_name)
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("payload")
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct XmlNamespace {
    #[serde(default)]
    pub uri: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpDef {
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default = "default_request_uri")]
    pub request_uri: String,
}

impl Default for HttpDef {
    fn default() -> Self {
        HttpDef {
            method: default_http_method(),
            request_uri: default_request_uri(),
        }
    }
}

fn default_http_method() -> String {
    "POST".to_string()
}

fn default_request_uri() -> String {
    "/".to_string()
}

/// `input: {shape}` / `output: {shape, resultWrapper}` of an operation
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRef {
    pub shape: String,
    #[serde(default)]
    pub result_wrapper: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDef {
    pub name: String,
    #[serde(default)]
    pub http: HttpDef,
    #[serde(default)]
    pub input: Option<ShapeRef>,
    #[serde(default)]
    pub output: Option<ShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination descriptor. Only `result_key` drives generation; the other
/// fields are recognized so definitions deserialize cleanly.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub result_key: Option<OneOrMany>,
    #[serde(default)]
    pub input_token: Option<OneOrMany>,
    #[serde(default)]
    pub output_token: Option<OneOrMany>,
    #[serde(default)]
    pub limit_key: Option<String>,
    #[serde(default)]
    pub more_results: Option<String>,
}

impl Pagination {
    /// result keys, flattened; empty when absent
    pub fn result_keys(&self) -> &[String] {
        match &self.result_key {
            Some(keys) => keys.as_slice(),
            None => &[],
        }
    }
}

/// `result_key` may be a single string or a list of strings
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn as_slice(&self) -> &[String] {
        match self {
            OneOrMany::One(s) => std::slice::from_ref(s),
            OneOrMany::Many(v) => v.as_slice(),
        }
    }
}

/// Read-only query interface over one service definition.
///
/// Absence of documentation is benign everywhere; absence of a referenced
/// shape is fatal, which `resolve_shape` encodes.
pub trait ServiceDefinition {
    fn get_operation(&self, name: &str) -> Option<&OperationDef>;
    fn get_shape(&self, name: &str) -> Option<&ShapeDef>;
    fn get_shapes(&self) -> Vec<&str>;
    fn operation_names(&self) -> Vec<&str>;
    fn get_api_version(&self) -> &str;
    fn get_endpoint_prefix(&self) -> Option<&str>;
    fn get_signature_version(&self) -> Option<&str>;
    fn get_operation_documentation(&self, name: &str) -> Option<&str>;
    fn get_operation_pagination(&self, name: &str) -> Option<&Pagination>;
    fn get_parameter_documentation(
        &self,
        shape_name: &str,
        member_name: &str,
        member: &MemberRef,
    ) -> Option<String>;
    fn get_shapes_documentation(&self) -> BTreeMap<String, String>;

    /// Resolve a shape reference, failing when the target is missing.
    fn resolve_shape(&self, name: &str) -> Result<&ShapeDef> {
        self.get_shape(name)
            .ok_or_else(|| Error::MissingShape(name.to_string()))
    }

    /// Resolve an operation, failing when it is not defined.
    fn resolve_operation(&self, name: &str) -> Result<&OperationDef> {
        self.get_operation(name)
            .ok_or_else(|| Error::OperationNotFound(name.to_string()))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub endpoint_prefix: Option<String>,
    #[serde(default)]
    pub signature_version: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
}

/// A service definition backed by a parsed definition document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JsonDefinition {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub operations: IndexMap<String, OperationDef>,
    #[serde(default)]
    pub shapes: IndexMap<String, ShapeDef>,
}

impl JsonDefinition {
    /// Build a definition from a deserialized json document.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let def: JsonDefinition = serde_json::from_value(value)?;
        Ok(def)
    }

    /// Parse a definition from json text.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Operations are addressed in PascalCase in definitions, but callers
    /// may hold the camelCase method name; match either.
    fn lookup_operation(&self, name: &str) -> Option<&OperationDef> {
        if let Some(op) = self.operations.get(name) {
            return Some(op);
        }
        self.operations
            .iter()
            .find(|(key, _)| crate::strings::to_camel_case(key) == name)
            .map(|(_, op)| op)
    }
}

impl ServiceDefinition for JsonDefinition {
    fn get_operation(&self, name: &str) -> Option<&OperationDef> {
        self.lookup_operation(name)
    }

    fn get_shape(&self, name: &str) -> Option<&ShapeDef> {
        self.shapes.get(name)
    }

    fn get_shapes(&self) -> Vec<&str> {
        self.shapes.keys().map(|k| k.as_str()).collect()
    }

    /// Operation names in definition order.
    fn operation_names(&self) -> Vec<&str> {
        self.operations.keys().map(|k| k.as_str()).collect()
    }

    fn get_api_version(&self) -> &str {
        &self.metadata.api_version
    }

    fn get_endpoint_prefix(&self) -> Option<&str> {
        self.metadata.endpoint_prefix.as_deref()
    }

    fn get_signature_version(&self) -> Option<&str> {
        self.metadata.signature_version.as_deref()
    }

    fn get_operation_documentation(&self, name: &str) -> Option<&str> {
        self.lookup_operation(name)
            .and_then(|op| op.documentation.as_deref())
    }

    fn get_operation_pagination(&self, name: &str) -> Option<&Pagination> {
        self.lookup_operation(name)
            .and_then(|op| op.pagination.as_ref())
    }

    fn get_parameter_documentation(
        &self,
        _shape_name: &str,
        _member_name: &str,
        member: &MemberRef,
    ) -> Option<String> {
        if let Some(doc) = &member.documentation {
            return Some(doc.clone());
        }
        // fall back to the documentation of the member's target shape
        self.shapes
            .get(&member.shape)
            .and_then(|s| s.documentation.clone())
    }

    fn get_shapes_documentation(&self) -> BTreeMap<String, String> {
        self.shapes
            .iter()
            .filter_map(|(name, shape)| {
                shape.documentation.as_ref().map(|d| (name.clone(), d.clone()))
            })
            .collect()
    }
}
