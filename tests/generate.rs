//! End-to-end generation tests driving the operation generator over
//! in-memory service definitions.

use sdk_codegen::{
    config::ServiceNaming,
    definition::JsonDefinition,
    writer::{DirWriter, MemWriter},
    Error, OperationGenerator,
};
use serde_json::json;

fn definition() -> JsonDefinition {
    JsonDefinition::from_value(json!({
        "metadata": {
            "apiVersion": "2020-06-15",
            "endpointPrefix": "demo",
            "signatureVersion": "v4"
        },
        "operations": {
            "Ping": {
                "name": "Ping",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "PingRequest"}
            },
            "EchoText": {
                "name": "EchoText",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "EchoTextRequest"},
                "output": {"shape": "EchoTextResult"},
                "documentation": "<p>Echoes <code>Message</code> back, as described in <a href=\"https://docs.example/guide\">the guide</a>.</p> <p>Messages longer than the service limit are rejected.</p>",
                "documentationUrl": "https://docs.example/echo"
            },
            "GetTree": {
                "name": "GetTree",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "GetTreeRequest"},
                "output": {"shape": "Node"}
            },
            "ListItems": {
                "name": "ListItems",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "ListItemsRequest"},
                "output": {"shape": "ListItemsResult", "resultWrapper": "ListItemsResult"},
                "pagination": {"result_key": "Items"}
            },
            "HeadInfo": {
                "name": "HeadInfo",
                "http": {"method": "HEAD", "requestUri": "/"},
                "input": {"shape": "HeadInfoRequest"},
                "output": {"shape": "HeadInfoResult"}
            },
            "UploadObject": {
                "name": "UploadObject",
                "http": {"method": "PUT", "requestUri": "/{Key}"},
                "input": {"shape": "UploadObjectRequest"}
            },
            "PutTree": {
                "name": "PutTree",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "PutTreeRequest"}
            }
        },
        "shapes": {
            "PingRequest": {"type": "structure", "members": {}},
            "EchoTextRequest": {
                "type": "structure",
                "members": {"Message": {"shape": "String"}},
                "required": ["Message"]
            },
            "EchoTextResult": {
                "type": "structure",
                "members": {"Message": {"shape": "String"}}
            },
            "GetTreeRequest": {"type": "structure", "members": {}},
            "Node": {
                "type": "structure",
                "members": {
                    "Child": {"shape": "Node"},
                    "Name": {"shape": "String"}
                }
            },
            "ListItemsRequest": {"type": "structure", "members": {}},
            "ListItemsResult": {
                "type": "structure",
                "members": {"Items": {"shape": "ItemList"}}
            },
            "ItemList": {"type": "list", "member": {"shape": "Item"}},
            "Item": {
                "type": "structure",
                "members": {"Name": {"shape": "String"}}
            },
            "HeadInfoRequest": {"type": "structure", "members": {}},
            "HeadInfoResult": {
                "type": "structure",
                "members": {
                    "RequestId": {
                        "shape": "String",
                        "location": "header",
                        "locationName": "x-amz-request-id"
                    },
                    "Size": {
                        "shape": "Integer",
                        "location": "header",
                        "locationName": "content-length"
                    }
                }
            },
            "UploadObjectRequest": {
                "type": "structure",
                "members": {
                    "Key": {"shape": "String", "location": "uri", "locationName": "Key"},
                    "Body": {"shape": "Blob", "streaming": true}
                },
                "payload": "Body"
            },
            "PutTreeRequest": {
                "type": "structure",
                "members": {
                    "Tree": {"shape": "Node", "locationName": "Tree"}
                },
                "payload": "Tree"
            },
            "String": {"type": "string"},
            "Integer": {"type": "integer"},
            "Blob": {"type": "blob"}
        }
    }))
    .unwrap()
}

fn generator(def: &JsonDefinition) -> OperationGenerator<'_> {
    OperationGenerator::new(def, ServiceNaming::new("Aws", "Demo"))
}

#[test]
fn no_input_operation() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("Ping", &mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("public function ping($input = []): Result"));
    assert!(client.contains("use Aws\\Core\\Result;"));

    let input = writer.get("Aws\\Demo\\Input\\PingRequest").unwrap();
    // empty constructor body, no-op validation
    assert!(input.contains("public function __construct(array $input = [])\n    {\n    }\n"));
    assert!(input.contains("// There is nothing to validate."));
    // the default protocol seeds the form payload
    assert!(input.contains("$payload = ['Action' => 'Ping', 'Version' => '2020-06-15'];"));
}

#[test]
fn required_scalar_input_and_xml_result() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("EchoText", &mut writer).unwrap();

    let input = writer.get("Aws\\Demo\\Input\\EchoTextRequest").unwrap();
    assert!(input.contains("public function __construct(array $input)"));
    assert!(input.contains("if (null === $this->Message) {"));
    assert!(input.contains("throw new MissingParameter('Message', __CLASS__);"));

    let result = writer.get("Aws\\Demo\\Result\\EchoTextResult").unwrap();
    assert!(result.contains("// TODO Verify correctness"));
    assert!(result.contains("$data = new \\SimpleXMLElement($response->body);"));
    assert!(result.contains("$this->Message = $this->xmlValueOrNull($data->Message, 'string');"));

    // the method doc carries the first-line summary with its links
    // appended, not the full documentation body
    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("Echoes `Message` back, as described in the guide."));
    assert!(!client.contains("Messages longer than the service limit are rejected."));
    assert!(client.contains("@see https://docs.example/echo"));
    assert!(client.contains("@see https://docs.example/guide"));
    assert!(client.contains("@param EchoTextRequest|array $input"));
    assert!(client.contains("@return EchoTextResult"));
    // required input: no default value for the parameter
    assert!(client.contains("public function echoText($input): EchoTextResult"));
}

#[test]
fn cyclic_output_shape_terminates_and_emits_once() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("GetTree", &mut writer).unwrap();

    let names = writer.class_names();
    assert_eq!(
        names.iter().filter(|n| n.ends_with("\\Node")).count(),
        1,
        "cyclic shape must be emitted exactly once: {:?}",
        names
    );
    let node = writer.get("Aws\\Demo\\Result\\Node").unwrap();
    assert!(node.contains(
        "$this->Child = isset($input['Child']) ? Node::create($input['Child']) : null;"
    ));
}

#[test]
fn paginated_result_is_iterable() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("ListItems", &mut writer).unwrap();

    let result = writer.get("Aws\\Demo\\Result\\ListItemsResult").unwrap();
    assert!(result.contains("implements \\IteratorAggregate"));
    assert!(result.contains("public function getItems(bool $currentPageOnly = false): iterable"));
    assert!(result.contains("public function getIterator(): \\Traversable"));
    assert!(result.contains("@return \\Traversable<Item>"));
    assert!(result.contains("// TODO load the next page and continue iterating"));
    assert!(result.contains("$data = $data->ListItemsResult;"));
}

#[test]
fn header_mapped_output() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("HeadInfo", &mut writer).unwrap();

    let result = writer.get("Aws\\Demo\\Result\\HeadInfoResult").unwrap();
    assert!(result.contains("$this->RequestId = $headers['x-amz-request-id'][0] ?? null;"));
    assert!(result.contains(
        "$this->Size = isset($headers['content-length'][0]) ? filter_var($headers['content-length'][0], \\FILTER_VALIDATE_INT) : null;"
    ));
}

#[test]
fn streaming_input_payload_skips_xml_builder() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("UploadObject", &mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("$payload = $input->getBody() ?? '';"));
    assert!(!client.contains("XmlBuilder"));

    let input = writer.get("Aws\\Demo\\Input\\UploadObjectRequest").unwrap();
    assert!(input.contains("@var string|resource|callable|null"));
    assert!(input.contains("$this->Body = $input['Body'] ?? '';"));
    assert!(input.contains("$uri['Key'] = $this->Key ?? '';"));
}

#[test]
fn structure_payload_uses_xml_builder_with_pruned_config() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("PutTree", &mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("use Aws\\Core\\XmlBuilder;"));
    assert!(client.contains("$payload = (new XmlBuilder($input->requestBody(), $xmlConfig))->getXml();"));
    // pruned config covers the payload subtree plus the synthetic root
    assert!(client.contains("'Node' => ['type' => 'structure', 'members' =>"));
    assert!(client.contains("'String' => ['type' => 'string'],"));
    assert!(client.contains("'_root' => ['type' => 'Node', 'xmlName' => 'Tree', 'uri' => ''],"));
}

#[test]
fn client_hooks_from_metadata() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_operation("Ping", &mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("protected function getServiceCode(): string"));
    assert!(client.contains("return 'demo';"));
    assert!(client.contains("protected function getSignatureVersion(): string"));
    assert!(client.contains("return 'v4';"));
}

#[test]
fn regeneration_is_idempotent_and_preserves_user_methods() {
    let def = definition();
    let mut writer = MemWriter::default();
    let gen = generator(&def);

    gen.generate_operation("EchoText", &mut writer).unwrap();
    let first: Vec<(String, String)> = writer
        .class_names()
        .iter()
        .map(|name| (name.to_string(), writer.get(name).unwrap().clone()))
        .collect();

    // second run over the same tree produces byte-identical output
    gen.generate_operation("EchoText", &mut writer).unwrap();
    for (name, source) in &first {
        assert_eq!(writer.get(name).unwrap(), source, "{} changed on rerun", name);
    }

    // a hand-written helper on the client survives regeneration
    let client_fqcn = "Aws\\Demo\\DemoClient";
    let mut edited = writer.get(client_fqcn).unwrap().trim_end_matches("}\n").to_string();
    edited.push_str("\n    public function helper(): string\n    {\n        return 'kept';\n    }\n}\n");
    writer.insert(client_fqcn, edited);

    gen.generate_operation("EchoText", &mut writer).unwrap();
    let client = writer.get(client_fqcn).unwrap();
    assert!(client.contains("public function helper(): string"));
    assert!(client.contains("return 'kept';"));
    assert!(client.contains("public function echoText($input): EchoTextResult"));
    // the operation method is present exactly once
    assert_eq!(client.matches("function echoText(").count(), 1);
}

#[test]
fn two_operations_share_one_client() {
    let def = definition();
    let mut writer = MemWriter::default();
    let gen = generator(&def);
    gen.generate_operations(&["Ping", "EchoText"], &mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    assert!(client.contains("public function ping($input = []): Result"));
    assert!(client.contains("public function echoText($input): EchoTextResult"));
    assert_eq!(client.matches("function getServiceCode(").count(), 1);
}

#[test]
fn generate_service_covers_every_operation() {
    let def = definition();
    let mut writer = MemWriter::default();
    generator(&def).generate_service(&mut writer).unwrap();

    let client = writer.get("Aws\\Demo\\DemoClient").unwrap();
    for method in [
        "function ping(",
        "function echoText(",
        "function getTree(",
        "function listItems(",
        "function headInfo(",
        "function uploadObject(",
        "function putTree(",
    ] {
        assert_eq!(client.matches(method).count(), 1, "missing {}", method);
    }
    assert_eq!(client.matches("function getServiceCode(").count(), 1);
    assert!(writer.get("Aws\\Demo\\Input\\PingRequest").is_some());
    assert!(writer.get("Aws\\Demo\\Result\\ListItemsResult").is_some());
}

#[test]
fn missing_shape_is_fatal_and_writes_nothing() {
    let def = JsonDefinition::from_value(json!({
        "metadata": {"apiVersion": "1"},
        "operations": {
            "Broken": {
                "name": "Broken",
                "http": {"method": "POST", "requestUri": "/"},
                "input": {"shape": "NoSuchShape"}
            }
        },
        "shapes": {}
    }))
    .unwrap();
    let mut writer = MemWriter::default();
    let err = generator(&def).generate_operation("Broken", &mut writer).unwrap_err();
    assert!(matches!(err, Error::MissingShape(name) if name == "NoSuchShape"));
    assert!(writer.is_empty(), "no partial files for a failed operation");
}

#[test]
fn unknown_operation_is_an_error() {
    let def = definition();
    let mut writer = MemWriter::default();
    let err = generator(&def).generate_operation("Nope", &mut writer).unwrap_err();
    assert!(matches!(err, Error::OperationNotFound(_)));
}

#[test]
fn dir_writer_lays_out_one_file_per_class() {
    let def = definition();
    let dir = tempfile::tempdir().unwrap();
    let mut writer = DirWriter::new(dir.path());
    generator(&def).generate_operation("EchoText", &mut writer).unwrap();

    let client = dir.path().join("Aws/Demo/DemoClient.php");
    let input = dir.path().join("Aws/Demo/Input/EchoTextRequest.php");
    let result = dir.path().join("Aws/Demo/Result/EchoTextResult.php");
    assert!(client.is_file());
    assert!(input.is_file());
    assert!(result.is_file());
    let text = std::fs::read_to_string(&client).unwrap();
    assert!(text.contains("namespace Aws\\Demo;"));
}

#[test]
fn every_member_reaches_exactly_one_request_part() {
    // round-trip law: each non-null member appears in exactly one of
    // body, headers, query or uri under its wire name
    let def = JsonDefinition::from_value(json!({
        "metadata": {"apiVersion": "1"},
        "operations": {
            "Mixed": {
                "name": "Mixed",
                "http": {"method": "POST", "requestUri": "/{Path}"},
                "input": {"shape": "MixedRequest"}
            }
        },
        "shapes": {
            "MixedRequest": {
                "type": "structure",
                "members": {
                    "Path": {"shape": "String", "location": "uri", "locationName": "Path"},
                    "Header": {"shape": "String", "location": "header", "locationName": "x-header"},
                    "Query": {"shape": "String", "location": "querystring", "locationName": "q"},
                    "BodyA": {"shape": "String"},
                    "BodyB": {"shape": "String", "location": "payload", "locationName": "body-b"}
                }
            },
            "String": {"type": "string"}
        }
    }))
    .unwrap();

    let mut writer = MemWriter::default();
    OperationGenerator::new(&def, ServiceNaming::new("Aws", "Demo"))
        .generate_operation("Mixed", &mut writer)
        .unwrap();
    let input = writer.get("Aws\\Demo\\Input\\MixedRequest").unwrap();

    assert!(input.contains("$uri['Path'] = $this->Path ?? '';"));
    assert!(input.contains("$headers['x-header'] = $this->Header;"));
    assert!(input.contains("$query['q'] = $this->Query;"));
    assert!(input.contains("$payload['BodyA'] = $this->BodyA;"));
    assert!(input.contains("$payload['body-b'] = $this->BodyB;"));
    // uri/header/query members never leak into the payload
    assert!(!input.contains("$payload['Path']"));
    assert!(!input.contains("$payload['x-header']"));
    assert!(!input.contains("$payload['q']"));
}
