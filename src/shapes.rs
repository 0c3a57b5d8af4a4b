//! Recursive descent over the shape graph, producing per-member php
//! fragments for construction, validation and xml deserialization.
//!
//! Cyclic graphs terminate because structure recursion inside one
//! `parse_xml` call short-circuits on re-entry to a shape already on
//! the descent path.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::{
    definition::{MemberRef, ServiceDefinition},
    error::{Error, Result},
    types,
};

pub(crate) struct ShapeWalker<'a> {
    def: &'a dyn ServiceDefinition,
    parsing: RefCell<HashSet<String>>,
}

impl<'a> ShapeWalker<'a> {
    pub fn new(def: &'a dyn ServiceDefinition) -> Self {
        ShapeWalker { def, parsing: RefCell::new(HashSet::new()) }
    }

    /// Assignment from one raw constructor-input entry to its property.
    pub fn constructor_init(&self, member_name: &str, member: &MemberRef) -> Result<String> {
        if member.streaming {
            return Ok(format!(
                "$this->{name} = $input['{name}'] ?? '';",
                name = member_name
            ));
        }
        let shape = self.def.resolve_shape(&member.shape)?;
        let stmt = match shape.shape_type.as_str() {
            "structure" => {
                let class = types::safe_class_name(&member.shape);
                format!(
                    "$this->{name} = isset($input['{name}']) ? {class}::create($input['{name}']) : null;",
                    name = member_name,
                    class = class
                )
            }
            "list" | "map" => {
                let element = match shape.shape_type.as_str() {
                    "list" => shape.member.as_ref(),
                    _ => shape.value.as_ref(),
                };
                let element_is_structure = match element {
                    Some(e) => self.def.resolve_shape(&e.shape)?.is_structure(),
                    None => false,
                };
                if element_is_structure {
                    let class = types::safe_class_name(&element.unwrap().shape);
                    format!(
                        "$this->{name} = array_map([{class}::class, 'create'], $input['{name}'] ?? []);",
                        name = member_name,
                        class = class
                    )
                } else {
                    format!(
                        "$this->{name} = $input['{name}'] ?? [];",
                        name = member_name
                    )
                }
            }
            "timestamp" => format!(
                "$this->{name} = !isset($input['{name}']) ? null : ($input['{name}'] instanceof \\DateTimeImmutable ? $input['{name}'] : new \\DateTimeImmutable($input['{name}']));",
                name = member_name
            ),
            _ => format!(
                "$this->{name} = $input['{name}'] ?? null;",
                name = member_name
            ),
        };
        Ok(stmt)
    }

    /// Recursive validation statement for one member; only structures and
    /// lists of structures descend.
    pub fn validate_stmt(&self, member_name: &str, member: &MemberRef) -> Result<Option<String>> {
        if member.streaming {
            return Ok(None);
        }
        let shape = self.def.resolve_shape(&member.shape)?;
        let stmt = match shape.shape_type.as_str() {
            "structure" => Some(format!(
                "if (null !== $this->{name}) {{\n    $this->{name}->validate();\n}}",
                name = member_name
            )),
            "list" => {
                let element_is_structure = match shape.member.as_ref() {
                    Some(e) => self.def.resolve_shape(&e.shape)?.is_structure(),
                    None => false,
                };
                if element_is_structure {
                    Some(format!(
                        "foreach ($this->{name} as $item) {{\n    $item->validate();\n}}",
                        name = member_name
                    ))
                } else {
                    None
                }
            }
            _ => None,
        };
        Ok(stmt)
    }

    /// Expression deserializing one member from the xml element
    /// `current_expr`. `member_name` is the structure member being read,
    /// absent when recursing on list elements and map values.
    pub fn parse_xml(
        &self,
        current_expr: &str,
        member_name: Option<&str>,
        member: &MemberRef,
    ) -> Result<String> {
        let access = xml_access(current_expr, member_name, member);
        let shape = self.def.resolve_shape(&member.shape)?;
        match shape.shape_type.as_str() {
            "list" => {
                let element = shape
                    .member
                    .clone()
                    .ok_or_else(|| Error::InvalidDefinition(format!(
                        "list shape '{}' has no member",
                        member.shape
                    )))?;
                let item = self.parse_xml("$item", None, &element)?;
                Ok(format!(
                    "(function (\\SimpleXMLElement $xml): array {{\n    $items = [];\n    foreach ($xml as $item) {{\n        $items[] = {item};\n    }}\n\n    return $items;\n}})({access})",
                    item = indent_tail(&item, "        "),
                    access = access
                ))
            }
            "map" => {
                let key = shape
                    .key
                    .clone()
                    .ok_or_else(|| Error::MapKeyLocationName(member.shape.clone()))?;
                let key_name = key
                    .location_name
                    .clone()
                    .ok_or_else(|| Error::MapKeyLocationName(member.shape.clone()))?;
                if self.def.resolve_shape(&key.shape)?.is_structure() {
                    return Err(Error::ComplexMapKey(member.shape.clone()));
                }
                let value = shape
                    .value
                    .clone()
                    .ok_or_else(|| Error::InvalidDefinition(format!(
                        "map shape '{}' has no value",
                        member.shape
                    )))?;
                let item = self.parse_xml("$item", None, &value)?;
                Ok(format!(
                    "(function (\\SimpleXMLElement $xml): array {{\n    $items = [];\n    foreach ($xml as $item) {{\n        $items[(string) $item->{key}] = {item};\n    }}\n\n    return $items;\n}})({access})",
                    key = key_name,
                    item = indent_tail(&item, "        "),
                    access = access
                ))
            }
            "structure" => {
                if self.parsing.borrow().contains(&member.shape) {
                    // re-entry into a shape on the descent path
                    return Ok("null".to_string());
                }
                self.parsing.borrow_mut().insert(member.shape.clone());
                let result = self.parse_structure(&access, &member.shape);
                self.parsing.borrow_mut().remove(&member.shape);
                result
            }
            wire => Ok(format!(
                "$this->xmlValueOrNull({access}, '{target}')",
                access = access,
                target = types::xml_target_type(wire)
            )),
        }
    }

    fn parse_structure(&self, access: &str, shape_name: &str) -> Result<String> {
        let shape = self.def.resolve_shape(shape_name)?;
        let class = types::safe_class_name(shape_name);
        let mut entries = String::new();
        for (name, nested) in &shape.members {
            let expr = self.parse_xml(access, Some(name), nested)?;
            entries.push_str(&format!(
                "    '{name}' => {expr},\n",
                name = name,
                expr = indent_tail(&expr, "    ")
            ));
        }
        Ok(format!("new {}([\n{}])", class, entries))
    }

    /// Statements populating every top-level member that does not travel
    /// in a response header.
    pub fn parse_xml_root(&self, shape_name: &str) -> Result<String> {
        let shape = self.def.resolve_shape(shape_name)?;
        let mut out = String::new();
        for (name, member) in &shape.members {
            if matches!(member.location(), "header" | "headers") {
                continue;
            }
            let expr = self.parse_xml("$data", Some(name), member)?;
            out.push_str(&format!("$this->{} = {};\n", name, expr));
        }
        Ok(out)
    }
}

/// Compute the xml access expression for a member: attribute indexing for
/// `xmlAttribute` members, child access by wire name otherwise, and the
/// element itself when there is no member context.
fn xml_access(current_expr: &str, member_name: Option<&str>, member: &MemberRef) -> String {
    if member.xml_attribute {
        let name = member
            .location_name
            .as_deref()
            .or(member_name)
            .unwrap_or_default();
        return format!("{}['{}']", current_expr, name);
    }
    if let Some(location_name) = &member.location_name {
        return format!("{}->{}", current_expr, location_name);
    }
    match member_name {
        Some(name) => format!("{}->{}", current_expr, name),
        None => current_expr.to_string(),
    }
}

/// Indent every line of a rendered fragment except the first.
pub(crate) fn indent_tail(text: &str, indent: &str) -> String {
    let mut lines = text.lines();
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::JsonDefinition;
    use serde_json::json;

    fn def() -> JsonDefinition {
        JsonDefinition::from_value(json!({
            "shapes": {
                "Node": {
                    "type": "structure",
                    "members": {
                        "Child": {"shape": "Node"},
                        "Name": {"shape": "String"}
                    }
                },
                "NodeList": {
                    "type": "list",
                    "member": {"shape": "Node"}
                },
                "StringList": {
                    "type": "list",
                    "member": {"shape": "String"}
                },
                "Tags": {
                    "type": "map",
                    "key": {"shape": "String", "locationName": "Key"},
                    "value": {"shape": "String", "locationName": "Value"}
                },
                "BadMap": {
                    "type": "map",
                    "key": {"shape": "String"},
                    "value": {"shape": "String"}
                },
                "String": {"type": "string"},
                "Time": {"type": "timestamp"}
            }
        }))
        .unwrap()
    }

    fn member(shape: &str) -> MemberRef {
        MemberRef { shape: shape.to_string(), ..Default::default() }
    }

    #[test]
    fn constructor_init_per_shape_kind() {
        let def = def();
        let walker = ShapeWalker::new(&def);

        assert_eq!(
            walker.constructor_init("Name", &member("String")).unwrap(),
            "$this->Name = $input['Name'] ?? null;"
        );
        assert_eq!(
            walker.constructor_init("Child", &member("Node")).unwrap(),
            "$this->Child = isset($input['Child']) ? Node::create($input['Child']) : null;"
        );
        assert_eq!(
            walker.constructor_init("Nodes", &member("NodeList")).unwrap(),
            "$this->Nodes = array_map([Node::class, 'create'], $input['Nodes'] ?? []);"
        );
        assert_eq!(
            walker.constructor_init("Names", &member("StringList")).unwrap(),
            "$this->Names = $input['Names'] ?? [];"
        );
        assert_eq!(
            walker.constructor_init("Tags", &member("Tags")).unwrap(),
            "$this->Tags = $input['Tags'] ?? [];"
        );
        let streaming = MemberRef { streaming: true, ..member("String") };
        assert_eq!(
            walker.constructor_init("Body", &streaming).unwrap(),
            "$this->Body = $input['Body'] ?? '';"
        );
        let ts = walker.constructor_init("When", &member("Time")).unwrap();
        assert!(ts.contains("instanceof \\DateTimeImmutable"));
        assert!(ts.contains("new \\DateTimeImmutable($input['When'])"));
    }

    #[test]
    fn validate_recurses_into_structures_only() {
        let def = def();
        let walker = ShapeWalker::new(&def);

        let nested = walker.validate_stmt("Child", &member("Node")).unwrap().unwrap();
        assert!(nested.contains("$this->Child->validate();"));

        let list = walker.validate_stmt("Nodes", &member("NodeList")).unwrap().unwrap();
        assert!(list.contains("foreach ($this->Nodes as $item)"));

        assert!(walker.validate_stmt("Name", &member("String")).unwrap().is_none());
        assert!(walker.validate_stmt("Tags", &member("Tags")).unwrap().is_none());
    }

    #[test]
    fn parse_xml_scalar_uses_helper() {
        let def = def();
        let walker = ShapeWalker::new(&def);
        assert_eq!(
            walker.parse_xml("$data", Some("Name"), &member("String")).unwrap(),
            "$this->xmlValueOrNull($data->Name, 'string')"
        );

        let renamed = MemberRef {
            location_name: Some("name".to_string()),
            ..member("String")
        };
        assert_eq!(
            walker.parse_xml("$data", Some("Name"), &renamed).unwrap(),
            "$this->xmlValueOrNull($data->name, 'string')"
        );

        let attr = MemberRef { xml_attribute: true, ..member("String") };
        assert_eq!(
            walker.parse_xml("$data", Some("Name"), &attr).unwrap(),
            "$this->xmlValueOrNull($data['Name'], 'string')"
        );
    }

    #[test]
    fn parse_xml_cyclic_structure_terminates() {
        let def = def();
        let walker = ShapeWalker::new(&def);
        let expr = walker.parse_xml("$data", Some("Root"), &member("Node")).unwrap();
        assert!(expr.starts_with("new Node(["));
        // the recursive member collapsed instead of looping forever
        assert!(expr.contains("'Child' => null"));
        assert!(expr.contains("xmlValueOrNull"));
    }

    #[test]
    fn parse_xml_map_requires_key_location_name() {
        let def = def();
        let walker = ShapeWalker::new(&def);
        let ok = walker.parse_xml("$data", Some("Tags"), &member("Tags")).unwrap();
        assert!(ok.contains("$items[(string) $item->Key]"));

        let err = walker.parse_xml("$data", Some("Bad"), &member("BadMap")).unwrap_err();
        assert!(matches!(err, Error::MapKeyLocationName(_)));
    }

    #[test]
    fn parse_xml_root_skips_header_members() {
        let def = JsonDefinition::from_value(json!({
            "shapes": {
                "Out": {
                    "type": "structure",
                    "members": {
                        "RequestId": {"shape": "String", "location": "header", "locationName": "x-amz-request-id"},
                        "Name": {"shape": "String"}
                    }
                },
                "String": {"type": "string"}
            }
        }))
        .unwrap();
        let walker = ShapeWalker::new(&def);
        let block = walker.parse_xml_root("Out").unwrap();
        assert!(block.contains("$this->Name = $this->xmlValueOrNull($data->Name, 'string');"));
        assert!(!block.contains("RequestId"));
    }
}
