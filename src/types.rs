//! Mapping from wire primitive names to the types the emitted code uses,
//! and reserved-word avoidance for emitted class names.

use lazy_static::lazy_static;
use std::collections::BTreeSet;

use crate::{
    definition::{MemberRef, ServiceDefinition, ShapeDef},
    error::Result,
};

/// Streaming members bypass the scalar mapping: a string, an open stream
/// resource, or a zero-argument producer returning the contents lazily.
pub const STREAMING_DOC_TYPE: &str = "string|resource|callable";

lazy_static! {
    /// php reserved words that cannot name a class, plus `Object`, `Class`
    /// and `Trait` which are kept reserved for call-site compatibility.
    static ref RESERVED: BTreeSet<&'static str> = [
        "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class",
        "clone", "const", "continue", "declare", "default", "do", "echo", "else", "elseif",
        "empty", "enddeclare", "endfor", "endforeach", "endif", "endswitch", "endwhile",
        "enum", "extends", "final", "finally", "fn", "for", "foreach", "function", "global",
        "goto", "if", "implements", "include", "instanceof", "insteadof", "interface",
        "isset", "list", "match", "namespace", "new", "object", "or", "parent", "print",
        "private", "protected", "public", "readonly", "require", "return", "self", "static",
        "switch", "throw", "trait", "try", "unset", "use", "var", "while", "xor", "yield",
    ]
    .iter()
    .copied()
    .collect();
}

/// Rename a shape name that collides with a reserved word by prefixing
/// `Aws`. Total and idempotent: non-colliding names pass through.
pub fn safe_class_name(name: &str) -> String {
    if RESERVED.contains(name.to_ascii_lowercase().as_str()) {
        format!("Aws{}", name)
    } else {
        name.to_string()
    }
}

/// php type used in signatures for a scalar wire type
pub fn php_scalar_type(wire: &str) -> &'static str {
    match wire {
        "boolean" => "bool",
        "integer" => "int",
        // long is carried as a string so wide values keep their precision
        "long" => "string",
        "blob" => "string",
        "timestamp" => "\\DateTimeImmutable",
        _ => "string",
    }
}

/// Type name the `xmlValueOrNull` runtime helper coerces to
pub fn xml_target_type(wire: &str) -> &'static str {
    php_scalar_type(wire)
}

/// The php type of one member, as used for parameter/return hints.
/// Lists and maps collapse to `array`; structures use the emitted class.
pub fn member_php_type(def: &dyn ServiceDefinition, member: &MemberRef) -> Result<String> {
    if member.streaming {
        // unions are not expressible in hints; the doc comment carries it
        return Ok(String::new());
    }
    let shape = def.resolve_shape(&member.shape)?;
    Ok(match shape.shape_type.as_str() {
        "structure" => safe_class_name(&member.shape),
        "list" | "map" => "array".to_string(),
        other => php_scalar_type(other).to_string(),
    })
}

/// The `@var`/`@param` documentation type of one member, with element
/// types resolved through the shape graph.
pub fn member_doc_type(def: &dyn ServiceDefinition, member: &MemberRef) -> Result<String> {
    if member.streaming {
        return Ok(STREAMING_DOC_TYPE.to_string());
    }
    let shape = def.resolve_shape(&member.shape)?;
    Ok(match shape.shape_type.as_str() {
        "structure" => safe_class_name(&member.shape),
        "list" => {
            let element = element_doc_type(def, shape, &member.shape)?;
            format!("{}[]", element)
        }
        "map" => {
            let value = shape.value.as_ref().map(|v| v.shape.as_str()).unwrap_or("string");
            let value_shape = def.resolve_shape(value)?;
            let value_type = if value_shape.is_structure() {
                safe_class_name(value)
            } else {
                php_scalar_type(&value_shape.shape_type).to_string()
            };
            format!("array<string, {}>", value_type)
        }
        other => php_scalar_type(other).to_string(),
    })
}

/// Doc type of a list shape's element.
pub fn element_doc_type(
    def: &dyn ServiceDefinition,
    list_shape: &ShapeDef,
    _list_name: &str,
) -> Result<String> {
    let element = list_shape.member.as_ref().map(|m| m.shape.as_str()).unwrap_or("string");
    let element_shape = def.resolve_shape(element)?;
    Ok(if element_shape.is_structure() {
        safe_class_name(element)
    } else {
        php_scalar_type(&element_shape.shape_type).to_string()
    })
}

/// True for members whose absent value is an empty container rather
/// than null.
pub fn defaults_to_container(def: &dyn ServiceDefinition, member: &MemberRef) -> Result<bool> {
    let shape = def.resolve_shape(&member.shape)?;
    Ok(shape.is_list() || shape.is_map())
}
