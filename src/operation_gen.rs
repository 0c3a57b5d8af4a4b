//! Per-operation orchestration: emit the input and result class trees,
//! then merge the operation method (and the service hooks) into the
//! client class and persist everything.

use tracing::{debug, info};

use crate::{
    config::ServiceNaming,
    definition::{MemberRef, OperationDef, ServiceDefinition, ShapeDef},
    docs,
    error::{Error, Result},
    input_gen::InputGenerator,
    merge,
    php::{PhpClass, PhpMethod, PhpParam, Visibility},
    result_gen::ResultGenerator,
    types,
    writer::FileWriter,
    JsonMap, JsonValue,
};

const ABSTRACT_API: &str = "Aws\\Core\\AbstractApi";
const RESULT_BASE: &str = "Aws\\Core\\Result";
const XML_BUILDER: &str = "Aws\\Core\\XmlBuilder";

pub struct OperationGenerator<'a> {
    def: &'a dyn ServiceDefinition,
    naming: ServiceNaming,
}

impl<'a> OperationGenerator<'a> {
    pub fn new(def: &'a dyn ServiceDefinition, naming: ServiceNaming) -> Self {
        OperationGenerator { def, naming }
    }

    /// Generate every operation the definition declares.
    pub fn generate_service(&self, writer: &mut dyn FileWriter) -> Result<()> {
        let names = self.def.operation_names();
        self.generate_operations(&names, writer)
    }

    /// Generate every named operation into the same client class.
    pub fn generate_operations(&self, names: &[&str], writer: &mut dyn FileWriter) -> Result<()> {
        for name in names {
            self.generate_operation(name, writer)?;
        }
        Ok(())
    }

    /// Generate one operation: its input tree, its result tree, and the
    /// client method. Nothing is written until every class has been
    /// built, so a schema error leaves no partial files behind.
    pub fn generate_operation(&self, name: &str, writer: &mut dyn FileWriter) -> Result<()> {
        let operation = self.def.resolve_operation(name)?.clone();
        info!(operation = %operation.name, service = %self.naming.service(), "generating operation");

        let mut input_gen = InputGenerator::new(self.def, &self.naming);
        let input_classes = input_gen.generate(&operation)?;

        let mut result_gen = ResultGenerator::new(self.def, &self.naming);
        let result_classes = result_gen.generate(&operation)?;
        let streaming_output = result_gen.has_streaming_payload(&operation)?;

        let client = self.build_client(&operation, streaming_output, writer)?;

        for class in input_classes.iter().chain(result_classes.iter()) {
            writer.write(class)?;
        }
        writer.write(&client)?;
        Ok(())
    }

    fn build_client(
        &self,
        operation: &OperationDef,
        streaming_output: bool,
        writer: &mut dyn FileWriter,
    ) -> Result<PhpClass> {
        let fqcn = self.naming.client_fqcn();
        let existing = writer.read(&fqcn)?;
        let mut class = merge::load_or_create(
            existing.as_deref(),
            &self.naming.client_namespace(),
            &self.naming.client_class(),
        )?;
        if class.extends.is_none() {
            class.extends = Some("AbstractApi".to_string());
            class.doc = vec![format!("API client for the {} service.", self.naming.service())];
        }
        class.add_import(ABSTRACT_API);

        if let Some(prefix) = self.def.get_endpoint_prefix() {
            self.set_hook(&mut class, "getServiceCode", prefix);
        }
        if let Some(version) = self.def.get_signature_version() {
            self.set_hook(&mut class, "getSignatureVersion", version);
        }

        let method_name = lcfirst(&operation.name);
        debug!(method = %method_name, "injecting operation method");
        class.remove_method(&method_name);
        let method = self.operation_method(operation, &method_name, streaming_output)?;
        class.add_method(method);

        self.add_method_imports(&mut class, operation)?;
        Ok(class)
    }

    /// Service hooks always carry the current definition value: the
    /// method is re-created on every run but only ever added once.
    fn set_hook(&self, class: &mut PhpClass, name: &str, value: &str) {
        if class.has_method(name) {
            class.remove_method(name);
        }
        let mut method = PhpMethod::new(name);
        method.visibility = Visibility::Protected;
        method.return_type = Some("string".to_string());
        method.body = format!("return '{}';", value);
        class.add_method(method);
    }

    fn add_method_imports(&self, class: &mut PhpClass, operation: &OperationDef) -> Result<()> {
        if let Some(input) = &operation.input {
            class.add_import(&format!(
                "{}\\{}",
                self.naming.input_namespace(),
                types::safe_class_name(&input.shape)
            ));
            let shape = self.def.resolve_shape(&input.shape)?;
            if let Some((_, member)) = self.payload_member(shape)? {
                if !member.streaming && self.def.resolve_shape(&member.shape)?.is_structure() {
                    class.add_import(XML_BUILDER);
                }
            }
        }
        match &operation.output {
            Some(output) => class.add_import(&format!(
                "{}\\{}",
                self.naming.result_namespace(),
                types::safe_class_name(&output.shape)
            )),
            None => class.add_import(RESULT_BASE),
        }
        Ok(())
    }

    fn payload_member<'s>(
        &self,
        shape: &'s ShapeDef,
    ) -> Result<Option<(&'s String, &'s MemberRef)>> {
        match &shape.payload {
            Some(name) => shape
                .members
                .get_key_value(name)
                .map(Some)
                .ok_or_else(|| {
                    Error::InvalidDefinition(format!("payload member '{}' is not defined", name))
                }),
            None => Ok(None),
        }
    }

    fn operation_method(
        &self,
        operation: &OperationDef,
        method_name: &str,
        streaming_output: bool,
    ) -> Result<PhpMethod> {
        let input_shape = match &operation.input {
            Some(input) => Some((input.shape.clone(), self.def.resolve_shape(&input.shape)?.clone())),
            None => None,
        };
        let result_class = match &operation.output {
            Some(output) => types::safe_class_name(&output.shape),
            None => "Result".to_string(),
        };

        let mut method = PhpMethod::new(method_name);
        method.doc = self.method_doc(operation, input_shape.as_ref(), &result_class)?;
        method.return_type = Some(result_class.clone());

        let param = match &input_shape {
            Some((_, shape)) if !shape.required.is_empty() => PhpParam::new("input"),
            _ => PhpParam::new("input").with_default("[]"),
        };
        method.params = vec![param];
        method.body = self.method_body(operation, input_shape.as_ref(), &result_class, streaming_output)?;
        Ok(method)
    }

    fn method_doc(
        &self,
        operation: &OperationDef,
        input_shape: Option<&(String, ShapeDef)>,
        result_class: &str,
    ) -> Result<Vec<String>> {
        let mut doc = Vec::new();
        let mut see = Vec::new();
        if let Some(html) = self.def.get_operation_documentation(&operation.name) {
            let parsed = docs::parse(html)?;
            if let Some(line) = parsed.first_line() {
                doc.push(line);
            }
            see.extend(parsed.links().iter().map(|link| format!("@see {}", link.url)));
        }
        if let Some(url) = &operation.documentation_url {
            see.insert(0, format!("@see {}", url));
        }
        if !see.is_empty() {
            if !doc.is_empty() {
                doc.push(String::new());
            }
            doc.append(&mut see);
        }
        if !doc.is_empty() {
            doc.push(String::new());
        }
        match input_shape {
            Some((name, _)) => doc.push(format!(
                "@param {}|array $input",
                types::safe_class_name(name)
            )),
            None => doc.push("@param array $input".to_string()),
        }
        doc.push(format!("@return {}", result_class));
        Ok(doc)
    }

    fn method_body(
        &self,
        operation: &OperationDef,
        input_shape: Option<&(String, ShapeDef)>,
        result_class: &str,
        streaming_output: bool,
    ) -> Result<String> {
        let (input_class, shape) = match input_shape {
            Some((name, shape)) => (types::safe_class_name(name), shape),
            None => {
                // operations without declared input still validate an empty mapping
                return Ok(format!(
                    "$response = $this->getResponse('{method}', ['Action' => '{action}', 'Version' => '{version}'], [], $this->getEndpoint('{uri}', []));\n\nreturn new {result}($response);",
                    method = operation.http.method,
                    action = operation.name,
                    version = self.def.get_api_version(),
                    uri = operation.http.request_uri,
                    result = result_class
                ));
            }
        };

        let mut body = format!(
            "$input = {class}::create($input);\n$input->validate();\n\n",
            class = input_class
        );

        match self.payload_member(shape)? {
            Some((name, member)) if member.streaming => {
                body.push_str(&format!("$payload = $input->get{}() ?? '';\n", name));
            }
            Some((_, member)) if self.def.resolve_shape(&member.shape)?.is_structure() => {
                let config = self.xml_config(member)?;
                body.push_str(&format!(
                    "$xmlConfig = {};\n$payload = (new XmlBuilder($input->requestBody(), $xmlConfig))->getXml();\n",
                    php_array(&JsonValue::Object(config), 0)
                ));
            }
            _ => {
                body.push_str("$payload = $input->requestBody();\n");
            }
        }

        body.push_str(&format!(
            "$response = $this->getResponse('{method}', $payload, $input->requestHeaders(), $this->getEndpoint($input->requestUri(), $input->requestQuery()));\n\n",
            method = operation.http.method
        ));

        if streaming_output {
            body.push_str(&format!(
                "return new {}($response, $this->httpClient);",
                result_class
            ));
        } else {
            body.push_str(&format!("return new {}($response);", result_class));
        }
        Ok(body)
    }

    /// Pruned shape map handed to the XmlBuilder runtime helper: every
    /// shape reachable from the payload member through structure members
    /// and list elements, plus a synthetic `_root` entry.
    fn xml_config(&self, payload: &MemberRef) -> Result<JsonMap> {
        let mut map = JsonMap::new();
        self.collect_xml_shape(&payload.shape, &mut map)?;

        let mut root = JsonMap::new();
        root.insert("type".to_string(), JsonValue::from(payload.shape.clone()));
        root.insert(
            "xmlName".to_string(),
            JsonValue::from(payload.location_name.clone().unwrap_or_default()),
        );
        root.insert(
            "uri".to_string(),
            JsonValue::from(
                payload
                    .xml_namespace
                    .as_ref()
                    .map(|ns| ns.uri.clone())
                    .unwrap_or_default(),
            ),
        );
        map.insert("_root".to_string(), JsonValue::Object(root));
        Ok(map)
    }

    fn collect_xml_shape(&self, shape_name: &str, out: &mut JsonMap) -> Result<()> {
        if out.contains_key(shape_name) {
            return Ok(());
        }
        let shape = self.def.resolve_shape(shape_name)?;
        let mut entry = JsonMap::new();
        entry.insert(
            "type".to_string(),
            JsonValue::from(shape.shape_type.clone()),
        );
        // reserve the slot before descending so cycles terminate
        out.insert(shape_name.to_string(), JsonValue::Null);

        match shape.shape_type.as_str() {
            "structure" => {
                let mut members = JsonMap::new();
                for (name, member) in &shape.members {
                    members.insert(name.clone(), member_ref_json(member));
                    self.collect_xml_shape(&member.shape, out)?;
                }
                entry.insert("members".to_string(), JsonValue::Object(members));
            }
            "list" => {
                if let Some(element) = &shape.member {
                    entry.insert("member".to_string(), member_ref_json(element));
                    self.collect_xml_shape(&element.shape, out)?;
                }
            }
            _ => {}
        }
        out.insert(shape_name.to_string(), JsonValue::Object(entry));
        Ok(())
    }
}

fn member_ref_json(member: &MemberRef) -> JsonValue {
    let mut entry = JsonMap::new();
    entry.insert("shape".to_string(), JsonValue::from(member.shape.clone()));
    if let Some(location_name) = &member.location_name {
        entry.insert(
            "locationName".to_string(),
            JsonValue::from(location_name.clone()),
        );
    }
    if member.xml_attribute {
        entry.insert("xmlAttribute".to_string(), JsonValue::from(true));
    }
    if let Some(ns) = &member.xml_namespace {
        let mut ns_entry = JsonMap::new();
        ns_entry.insert("uri".to_string(), JsonValue::from(ns.uri.clone()));
        entry.insert("xmlNamespace".to_string(), JsonValue::Object(ns_entry));
    }
    JsonValue::Object(entry)
}

/// Render a json value as a php array literal. The top level spreads one
/// entry per line; nested values render inline.
fn php_array(value: &JsonValue, depth: usize) -> String {
    match value {
        JsonValue::Object(map) if depth == 0 => {
            let mut out = String::from("[\n");
            for (key, entry) in map {
                out.push_str(&format!(
                    "    '{}' => {},\n",
                    php_escape(key),
                    php_array(entry, depth + 1)
                ));
            }
            out.push(']');
            out
        }
        JsonValue::Object(map) => {
            let entries = map
                .iter()
                .map(|(key, entry)| {
                    format!("'{}' => {}", php_escape(key), php_array(entry, depth + 1))
                })
                .collect::<Vec<_>>();
            format!("[{}]", entries.join(", "))
        }
        JsonValue::String(s) => format!("'{}'", php_escape(s)),
        JsonValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn php_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// operation name with its first letter lowercased
fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
