//! Emits the input class tree for one operation: the root class with
//! its request-part accessors, plus one value class per reachable
//! nested structure.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    config::ServiceNaming,
    definition::{MemberRef, OperationDef, ServiceDefinition, ShapeDef},
    docs,
    error::{Error, Result},
    php::{PhpClass, PhpMethod, PhpParam, PhpProperty, Visibility},
    shapes::ShapeWalker,
    types,
};

const MISSING_PARAMETER: &str = "Aws\\Core\\Exception\\MissingParameter";

pub struct InputGenerator<'a> {
    def: &'a dyn ServiceDefinition,
    namespace: String,
    api_version: String,
    generated: HashSet<String>,
}

impl<'a> InputGenerator<'a> {
    pub fn new(def: &'a dyn ServiceDefinition, naming: &ServiceNaming) -> Self {
        InputGenerator {
            def,
            namespace: naming.input_namespace(),
            api_version: def.get_api_version().to_string(),
            generated: HashSet::new(),
        }
    }

    /// Generate the root input class and every nested structure class
    /// reachable from it. Shapes already emitted by this generator are
    /// skipped, which also bounds recursion over cyclic graphs.
    pub fn generate(&mut self, operation: &OperationDef) -> Result<Vec<PhpClass>> {
        let root_shape = match &operation.input {
            Some(input) => input.shape.clone(),
            None => return Ok(Vec::new()),
        };
        debug!(operation = %operation.name, shape = %root_shape, "generating input classes");

        let mut classes = Vec::new();
        self.generate_shape(&root_shape, Some(operation), &mut classes)?;
        Ok(classes)
    }

    fn generate_shape(
        &mut self,
        shape_name: &str,
        root_of: Option<&OperationDef>,
        out: &mut Vec<PhpClass>,
    ) -> Result<()> {
        if !self.generated.insert(shape_name.to_string()) {
            return Ok(());
        }
        let shape = self.def.resolve_shape(shape_name)?.clone();
        if !shape.is_structure() {
            return Err(Error::UnsupportedShapeType(
                shape_name.to_string(),
                shape.shape_type.clone(),
            ));
        }

        let class = self.build_class(shape_name, &shape, root_of)?;
        out.push(class);

        // descend into nested structures
        for member in shape.members.values() {
            if member.streaming {
                continue;
            }
            for nested in self.nested_structures(member)? {
                self.generate_shape(&nested, None, out)?;
            }
        }
        Ok(())
    }

    /// Structure shapes referenced by one member, through lists and maps.
    fn nested_structures(&self, member: &MemberRef) -> Result<Vec<String>> {
        let shape = self.def.resolve_shape(&member.shape)?;
        let mut nested = Vec::new();
        match shape.shape_type.as_str() {
            "structure" => nested.push(member.shape.clone()),
            "list" => {
                if let Some(element) = &shape.member {
                    if self.def.resolve_shape(&element.shape)?.is_structure() {
                        nested.push(element.shape.clone());
                    }
                }
            }
            "map" => {
                if let Some(value) = &shape.value {
                    if self.def.resolve_shape(&value.shape)?.is_structure() {
                        nested.push(value.shape.clone());
                    }
                }
            }
            _ => {}
        }
        Ok(nested)
    }

    fn build_class(
        &self,
        shape_name: &str,
        shape: &ShapeDef,
        root_of: Option<&OperationDef>,
    ) -> Result<PhpClass> {
        let walker = ShapeWalker::new(self.def);
        let mut class = PhpClass::new(&self.namespace, &types::safe_class_name(shape_name));
        if let Some(doc) = &shape.documentation {
            class.doc = docs::parse(doc)?.lines();
        }

        for (name, member) in &shape.members {
            class.add_property(self.build_property(shape_name, name, member, shape)?);
        }

        class.add_method(create_method());
        class.add_method(self.constructor(shape, &walker)?);

        for (name, member) in &shape.members {
            class.add_method(self.getter(name, member)?);
            class.add_method(self.setter(name, member)?);
        }

        if let Some(operation) = root_of {
            class.add_method(self.request_headers(shape));
            class.add_method(self.request_query(shape));
            class.add_method(self.request_body(shape, operation)?);
            class.add_method(self.request_uri(shape, operation));
        }

        class.add_method(self.validate(shape, &walker)?);
        if !shape.required.is_empty() {
            class.add_import(MISSING_PARAMETER);
        }
        Ok(class)
    }

    fn build_property(
        &self,
        shape_name: &str,
        name: &str,
        member: &MemberRef,
        shape: &ShapeDef,
    ) -> Result<PhpProperty> {
        let mut doc = Vec::new();
        if let Some(text) = self.def.get_parameter_documentation(shape_name, name, member) {
            if let Some(line) = docs::parse(&text)?.first_line() {
                doc.push(line);
                doc.push(String::new());
            }
        }
        if shape.is_required(name) {
            doc.push("@required".to_string());
            doc.push(String::new());
        }
        doc.push(format!("@var {}", self.var_doc_type(member)?));
        Ok(PhpProperty {
            visibility: Visibility::Private,
            name: name.to_string(),
            doc,
            default: None,
        })
    }

    fn var_doc_type(&self, member: &MemberRef) -> Result<String> {
        let doc_type = types::member_doc_type(self.def, member)?;
        if member.streaming || !types::defaults_to_container(self.def, member)? {
            Ok(format!("{}|null", doc_type))
        } else {
            Ok(doc_type)
        }
    }

    fn constructor(&self, shape: &ShapeDef, walker: &ShapeWalker<'_>) -> Result<PhpMethod> {
        let mut method = PhpMethod::new("__construct");
        let param = if shape.required.is_empty() {
            PhpParam::typed("input", "array").with_default("[]")
        } else {
            PhpParam::typed("input", "array")
        };
        method.params = vec![param];
        let mut body = String::new();
        for (name, member) in &shape.members {
            body.push_str(&walker.constructor_init(name, member)?);
            body.push('\n');
        }
        method.body = body.trim_end().to_string();
        Ok(method)
    }

    fn getter(&self, name: &str, member: &MemberRef) -> Result<PhpMethod> {
        let mut method = PhpMethod::new(&format!("get{}", name));
        if member.streaming {
            method.doc = vec![format!("@return {}|null", types::STREAMING_DOC_TYPE)];
        } else {
            method.return_type = Some(self.hint(member)?);
        }
        method.body = format!("return $this->{};", name);
        Ok(method)
    }

    fn setter(&self, name: &str, member: &MemberRef) -> Result<PhpMethod> {
        let mut method = PhpMethod::new(&format!("set{}", name));
        let param = if member.streaming {
            method.doc = vec![format!("@param {}|null $value", types::STREAMING_DOC_TYPE)];
            PhpParam::new("value")
        } else {
            PhpParam::typed("value", &self.hint(member)?)
        };
        method.params = vec![param];
        method.return_type = Some("self".to_string());
        method.body = format!("$this->{} = $value;\n\nreturn $this;", name);
        Ok(method)
    }

    /// php type hint for one member; nullable except for containers
    fn hint(&self, member: &MemberRef) -> Result<String> {
        let base = types::member_php_type(self.def, member)?;
        if types::defaults_to_container(self.def, member)? {
            Ok(base)
        } else {
            Ok(format!("?{}", base))
        }
    }

    fn request_headers(&self, shape: &ShapeDef) -> PhpMethod {
        self.request_map(shape, "requestHeaders", "headers", "header")
    }

    fn request_query(&self, shape: &ShapeDef) -> PhpMethod {
        self.request_map(shape, "requestQuery", "query", "querystring")
    }

    fn request_map(&self, shape: &ShapeDef, method: &str, var: &str, location: &str) -> PhpMethod {
        let mut body = format!("${} = [];\n", var);
        for (name, member) in &shape.members {
            if member.location() != location {
                continue;
            }
            body.push_str(&format!(
                "if (null !== $this->{name}) {{\n    ${var}['{wire}'] = $this->{name};\n}}\n",
                name = name,
                var = var,
                wire = member.wire_name(name)
            ));
        }
        body.push_str(&format!("\nreturn ${};", var));
        let mut m = PhpMethod::new(method);
        m.return_type = Some("array".to_string());
        m.body = body;
        m
    }

    fn request_body(&self, shape: &ShapeDef, operation: &OperationDef) -> Result<PhpMethod> {
        let mut body = format!(
            "$payload = ['Action' => '{}', 'Version' => '{}'];\n",
            operation.name, self.api_version
        );
        for (name, member) in &shape.members {
            if member.location() != "payload" || member.streaming {
                continue;
            }
            let guard = if types::defaults_to_container(self.def, member)? {
                format!("[] !== $this->{}", name)
            } else {
                format!("null !== $this->{}", name)
            };
            body.push_str(&format!(
                "if ({guard}) {{\n    $payload['{wire}'] = $this->{name};\n}}\n",
                guard = guard,
                wire = member.wire_name(name),
                name = name
            ));
        }
        body.push_str("\nreturn $payload;");
        let mut m = PhpMethod::new("requestBody");
        m.return_type = Some("array".to_string());
        m.body = body;
        Ok(m)
    }

    fn request_uri(&self, shape: &ShapeDef, operation: &OperationDef) -> PhpMethod {
        let template = &operation.http.request_uri;
        let mut m = PhpMethod::new("requestUri");
        m.return_type = Some("string".to_string());

        let uri_members: Vec<(&String, &MemberRef)> = shape
            .members
            .iter()
            .filter(|(_, member)| member.location() == "uri")
            .collect();
        if uri_members.is_empty() {
            m.body = format!("return '{}';", template);
            return m;
        }

        let mut body = String::from("$uri = [];\n");
        let mut search = Vec::new();
        let mut replace = Vec::new();
        for (name, member) in uri_members {
            let key = member.wire_name(name);
            body.push_str(&format!(
                "$uri['{key}'] = $this->{name} ?? '';\n",
                key = key,
                name = name
            ));
            search.push(format!("'{{{}}}'", key));
            search.push(format!("'{{{}+}}'", key));
            replace.push(format!("$uri['{}']", key));
            replace.push(format!("$uri['{}']", key));
        }
        body.push_str(&format!(
            "\nreturn str_replace([{}], [{}], '{}');",
            search.join(", "),
            replace.join(", "),
            template
        ));
        m.body = body;
        m
    }

    fn validate(&self, shape: &ShapeDef, walker: &ShapeWalker<'_>) -> Result<PhpMethod> {
        let mut statements = Vec::new();
        for name in &shape.required {
            statements.push(format!(
                "if (null === $this->{name}) {{\n    throw new MissingParameter('{name}', __CLASS__);\n}}",
                name = name
            ));
        }
        for (name, member) in &shape.members {
            if let Some(stmt) = walker.validate_stmt(name, member)? {
                statements.push(stmt);
            }
        }
        let mut m = PhpMethod::new("validate");
        m.return_type = Some("void".to_string());
        m.body = if statements.is_empty() {
            "// There is nothing to validate.".to_string()
        } else {
            statements.join("\n")
        };
        Ok(m)
    }
}

fn create_method() -> PhpMethod {
    let mut method = PhpMethod::new("create");
    method.is_static = true;
    method.params = vec![PhpParam::new("input")];
    method.return_type = Some("self".to_string());
    method.doc = vec!["@param self|array $input".to_string()];
    method.body = "return $input instanceof self ? $input : new self($input);".to_string();
    method
}
