//! Emits the result class tree for one operation: the root class
//! extending the runtime result base with its populate-from-response
//! logic, nested value classes, and lazy pagination when the operation
//! declares a result key.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    config::ServiceNaming,
    definition::{MemberRef, OperationDef, Pagination, ServiceDefinition, ShapeDef},
    docs,
    error::{Error, Result},
    php::{PhpClass, PhpMethod, PhpParam, PhpProperty, Visibility},
    shapes::ShapeWalker,
    types,
};

const RESULT_BASE: &str = "Aws\\Core\\Result";
const STREAMABLE_BODY: &str = "Aws\\Core\\StreamableBody";

const PAGE_FETCH_STUB: &str = "// TODO load the next page and continue iterating\nbreak;";

pub struct ResultGenerator<'a> {
    def: &'a dyn ServiceDefinition,
    namespace: String,
    generated: HashSet<String>,
}

impl<'a> ResultGenerator<'a> {
    pub fn new(def: &'a dyn ServiceDefinition, naming: &ServiceNaming) -> Self {
        ResultGenerator {
            def,
            namespace: naming.result_namespace(),
            generated: HashSet::new(),
        }
    }

    /// True when the operation's output carries a streaming payload, in
    /// which case the client hands its http client to the result.
    pub fn has_streaming_payload(&self, operation: &OperationDef) -> Result<bool> {
        let output = match &operation.output {
            Some(output) => output,
            None => return Ok(false),
        };
        let shape = self.def.resolve_shape(&output.shape)?;
        if let Some(payload) = &shape.payload {
            if let Some(member) = shape.members.get(payload) {
                return Ok(member.streaming);
            }
        }
        Ok(false)
    }

    /// Generate the root result class and every nested structure class
    /// reachable from it.
    pub fn generate(&mut self, operation: &OperationDef) -> Result<Vec<PhpClass>> {
        let output = match &operation.output {
            Some(output) => output.clone(),
            None => return Ok(Vec::new()),
        };
        debug!(operation = %operation.name, shape = %output.shape, "generating result classes");

        let pagination = self.def.get_operation_pagination(&operation.name).cloned();
        let mut classes = Vec::new();
        self.generate_root(&operation, &output.shape, pagination.as_ref(), &mut classes)?;
        Ok(classes)
    }

    fn generate_root(
        &mut self,
        operation: &OperationDef,
        shape_name: &str,
        pagination: Option<&Pagination>,
        out: &mut Vec<PhpClass>,
    ) -> Result<()> {
        self.generated.insert(shape_name.to_string());
        let shape = self.def.resolve_shape(shape_name)?.clone();
        if !shape.is_structure() {
            return Err(Error::UnsupportedShapeType(
                shape_name.to_string(),
                shape.shape_type.clone(),
            ));
        }

        let paged_keys = self.paged_keys(operation, &shape, pagination)?;

        let mut class = PhpClass::new(&self.namespace, &types::safe_class_name(shape_name));
        class.extends = Some("Result".to_string());
        class.add_import(RESULT_BASE);

        for (name, member) in &shape.members {
            class.add_property(self.build_property(shape_name, name, member)?);
        }

        let populate = self.populate_result(operation, &shape, &mut class)?;
        class.add_method(populate);

        for (name, member) in &shape.members {
            if paged_keys.iter().any(|k| k == name) {
                class.add_method(self.paged_getter(name)?);
            } else {
                class.add_method(self.getter(name, member)?);
            }
        }

        if !paged_keys.is_empty() {
            class.add_implements("\\IteratorAggregate");
            class.add_method(self.iterator_method(&shape, &paged_keys)?);
        }

        out.push(class);
        self.descend(&shape, out)?;
        Ok(())
    }

    /// Pagination result keys, validated against the output shape.
    /// Declared pagination without keys is a hard error; every key must
    /// resolve to a list member.
    fn paged_keys(
        &self,
        operation: &OperationDef,
        shape: &ShapeDef,
        pagination: Option<&Pagination>,
    ) -> Result<Vec<String>> {
        let pagination = match pagination {
            Some(p) => p,
            None => return Ok(Vec::new()),
        };
        let keys = pagination.result_keys();
        if keys.is_empty() {
            return Err(Error::PaginationMissingResultKey(operation.name.clone()));
        }
        for key in keys {
            let member = shape
                .members
                .get(key)
                .ok_or_else(|| Error::PaginationNotIterable(key.clone()))?;
            if !self.def.resolve_shape(&member.shape)?.is_list() {
                return Err(Error::PaginationNotIterable(key.clone()));
            }
        }
        Ok(keys.to_vec())
    }

    fn generate_nested(&mut self, shape_name: &str, out: &mut Vec<PhpClass>) -> Result<()> {
        if !self.generated.insert(shape_name.to_string()) {
            return Ok(());
        }
        let shape = self.def.resolve_shape(shape_name)?.clone();
        let walker = ShapeWalker::new(self.def);

        let mut class = PhpClass::new(&self.namespace, &types::safe_class_name(shape_name));
        if let Some(doc) = &shape.documentation {
            class.doc = docs::parse(doc)?.lines();
        }
        for (name, member) in &shape.members {
            class.add_property(self.build_property(shape_name, name, member)?);
        }

        let mut create = PhpMethod::new("create");
        create.is_static = true;
        create.params = vec![PhpParam::new("input")];
        create.return_type = Some("self".to_string());
        create.doc = vec!["@param self|array $input".to_string()];
        create.body = "return $input instanceof self ? $input : new self($input);".to_string();
        class.add_method(create);

        let mut ctor = PhpMethod::new("__construct");
        ctor.params = vec![PhpParam::typed("input", "array").with_default("[]")];
        let mut body = String::new();
        for (name, member) in &shape.members {
            body.push_str(&walker.constructor_init(name, member)?);
            body.push('\n');
        }
        ctor.body = body.trim_end().to_string();
        class.add_method(ctor);

        for (name, member) in &shape.members {
            class.add_method(self.getter(name, member)?);
        }

        out.push(class);
        self.descend(&shape, out)?;
        Ok(())
    }

    fn descend(&mut self, shape: &ShapeDef, out: &mut Vec<PhpClass>) -> Result<()> {
        for member in shape.members.values().cloned().collect::<Vec<_>>() {
            if member.streaming {
                continue;
            }
            let target = self.def.resolve_shape(&member.shape)?.clone();
            let nested = match target.shape_type.as_str() {
                "structure" => Some(member.shape.clone()),
                "list" => target.member.as_ref().map(|e| e.shape.clone()),
                "map" => target.value.as_ref().map(|v| v.shape.clone()),
                _ => None,
            };
            if let Some(name) = nested {
                if self.def.resolve_shape(&name)?.is_structure() {
                    self.generate_nested(&name, out)?;
                }
            }
        }
        Ok(())
    }

    fn build_property(
        &self,
        shape_name: &str,
        name: &str,
        member: &MemberRef,
    ) -> Result<PhpProperty> {
        let mut doc = Vec::new();
        if let Some(text) = self.def.get_parameter_documentation(shape_name, name, member) {
            if let Some(line) = docs::parse(&text)?.first_line() {
                doc.push(line);
                doc.push(String::new());
            }
        }
        let doc_type = types::member_doc_type(self.def, member)?;
        if member.streaming || !types::defaults_to_container(self.def, member)? {
            doc.push(format!("@var {}|null", doc_type));
        } else {
            doc.push(format!("@var {}", doc_type));
        }
        Ok(PhpProperty {
            visibility: Visibility::Private,
            name: name.to_string(),
            doc,
            default: None,
        })
    }

    fn getter(&self, name: &str, member: &MemberRef) -> Result<PhpMethod> {
        let mut method = PhpMethod::new(&format!("get{}", name));
        if member.streaming {
            method.doc = vec!["@return StreamableBody|string|null".to_string()];
        } else {
            let base = types::member_php_type(self.def, member)?;
            method.return_type = Some(if types::defaults_to_container(self.def, member)? {
                base
            } else {
                format!("?{}", base)
            });
        }
        method.body = format!("return $this->{};", name);
        Ok(method)
    }

    fn populate_result(
        &self,
        operation: &OperationDef,
        shape: &ShapeDef,
        class: &mut PhpClass,
    ) -> Result<PhpMethod> {
        let walker = ShapeWalker::new(self.def);
        let mut body = String::from("// TODO Verify correctness\n");

        let header_stmts = self.header_phase(shape)?;
        let needs_headers = !header_stmts.is_empty();
        if needs_headers {
            body.push_str("$headers = $response->headers;\n");
            body.push_str(&header_stmts);
        }

        body.push_str(&self.body_phase(operation, shape, &walker, class)?);
        let mut method = PhpMethod::new("populateResult");
        method.visibility = Visibility::Protected;
        method.params = vec![
            PhpParam::new("response"),
            PhpParam::new("httpClient").with_default("null"),
        ];
        method.return_type = Some("void".to_string());
        method.body = body.trim_end().to_string();
        Ok(method)
    }

    fn header_phase(&self, shape: &ShapeDef) -> Result<String> {
        let mut out = String::new();
        for (name, member) in &shape.members {
            match member.location() {
                "header" => {
                    let wire = member.wire_name(name).to_ascii_lowercase();
                    let target = self.def.resolve_shape(&member.shape)?;
                    let stmt = match target.shape_type.as_str() {
                        "integer" => format!(
                            "$this->{name} = isset($headers['{wire}'][0]) ? filter_var($headers['{wire}'][0], \\FILTER_VALIDATE_INT) : null;",
                            name = name, wire = wire
                        ),
                        "boolean" => format!(
                            "$this->{name} = isset($headers['{wire}'][0]) ? filter_var($headers['{wire}'][0], \\FILTER_VALIDATE_BOOLEAN) : null;",
                            name = name, wire = wire
                        ),
                        "timestamp" => format!(
                            "$this->{name} = isset($headers['{wire}'][0]) ? new \\DateTimeImmutable($headers['{wire}'][0]) : null;",
                            name = name, wire = wire
                        ),
                        _ => format!(
                            "$this->{name} = $headers['{wire}'][0] ?? null;",
                            name = name, wire = wire
                        ),
                    };
                    out.push_str(&stmt);
                    out.push('\n');
                }
                "headers" => {
                    let prefix = member.wire_name(name).to_ascii_lowercase();
                    out.push_str(&format!(
                        "$this->{name} = [];\nforeach ($headers as $header => $values) {{\n    if (0 === strpos($header, '{prefix}')) {{\n        $this->{name}[$header] = $values[0];\n    }}\n}}\n",
                        name = name,
                        prefix = prefix
                    ));
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn body_phase(
        &self,
        operation: &OperationDef,
        shape: &ShapeDef,
        walker: &ShapeWalker<'_>,
        class: &mut PhpClass,
    ) -> Result<String> {
        if let Some(payload_name) = &shape.payload {
            let member = shape.members.get(payload_name).ok_or_else(|| {
                Error::InvalidDefinition(format!("payload member '{}' is not defined", payload_name))
            })?;
            if member.streaming {
                class.add_import(STREAMABLE_BODY);
                return Ok(format!(
                    "if (null !== $httpClient) {{\n    $this->{name} = new StreamableBody($httpClient->stream($response));\n}} else {{\n    $this->{name} = $response->body;\n}}\n",
                    name = payload_name
                ));
            }
            // xml response rooted at the payload's shape
            let mut at_root = member.clone();
            at_root.location_name = None;
            let expr = walker.parse_xml("$data", None, &at_root)?;
            return Ok(format!(
                "$data = new \\SimpleXMLElement($response->body);\n$this->{name} = {expr};\n",
                name = payload_name,
                expr = expr
            ));
        }

        let has_body_members = shape
            .members
            .iter()
            .any(|(_, m)| !matches!(m.location(), "header" | "headers"));
        if !has_body_members {
            return Ok(String::new());
        }

        let mut out = String::from("$data = new \\SimpleXMLElement($response->body);\n");
        if let Some(wrapper) = operation.output.as_ref().and_then(|o| o.result_wrapper.as_ref()) {
            out.push_str(&format!("$data = $data->{};\n", wrapper));
        }
        out.push_str(&walker.parse_xml_root(&self.root_shape_name(operation))?);
        Ok(out)
    }

    fn root_shape_name(&self, operation: &OperationDef) -> String {
        operation
            .output
            .as_ref()
            .map(|o| o.shape.clone())
            .unwrap_or_default()
    }

    fn paged_getter(&self, name: &str) -> Result<PhpMethod> {
        let mut method = PhpMethod::new(&format!("get{}", name));
        method.params = vec![PhpParam::typed("currentPageOnly", "bool").with_default("false")];
        method.return_type = Some("iterable".to_string());
        method.doc = vec![
            "@param bool $currentPageOnly When true, iterates over items of the current page only.".to_string(),
        ];
        method.body = format!(
            "if ($currentPageOnly) {{\n    yield from $this->{name};\n\n    return;\n}}\nwhile (true) {{\n    yield from $this->{name};\n\n    {stub}\n}}",
            name = name,
            stub = crate::shapes::indent_tail(PAGE_FETCH_STUB, "    ")
        );
        Ok(method)
    }

    fn iterator_method(&self, shape: &ShapeDef, keys: &[String]) -> Result<PhpMethod> {
        let mut element_types = Vec::new();
        for key in keys {
            let member = &shape.members[key.as_str()];
            let list_shape = self.def.resolve_shape(&member.shape)?;
            let element = types::element_doc_type(self.def, list_shape, &member.shape)?;
            if !element_types.contains(&element) {
                element_types.push(element);
            }
        }

        let mut method = PhpMethod::new("getIterator");
        method.return_type = Some("\\Traversable".to_string());
        method.doc = vec![format!("@return \\Traversable<{}>", element_types.join("|"))];
        let yields = keys
            .iter()
            .map(|key| format!("    yield from $this->{};", key))
            .collect::<Vec<_>>()
            .join("\n");
        method.body = format!(
            "while (true) {{\n{yields}\n\n    {stub}\n}}",
            yields = yields,
            stub = crate::shapes::indent_tail(PAGE_FETCH_STUB, "    ")
        );
        Ok(method)
    }
}
