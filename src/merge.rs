//! Load-or-create for emitted classes. An existing file is parsed into
//! the mutable class model so a regeneration run can replace the members
//! it owns while leaving everything else byte-for-byte intact.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::{Error, Result},
    php::{ClassItem, PhpClass, PhpMethod},
};

lazy_static! {
    static ref NAMESPACE: Regex = Regex::new(r"(?m)^namespace\s+([^;]+);").unwrap();
    static ref IMPORT: Regex = Regex::new(r"(?m)^use\s+([^;]+);").unwrap();
    static ref CLASS: Regex = Regex::new(
        r"(?m)^(?:final\s+|abstract\s+)?class\s+(\w+)(?:\s+extends\s+([\w\\]+))?(?:\s+implements\s+([^\n{]+))?"
    )
    .unwrap();
    static ref METHOD_NAME: Regex = Regex::new(r"function\s+(\w+)\s*\(").unwrap();
}

/// Parse `source` when present, otherwise start a fresh class with the
/// given namespace and name.
pub fn load_or_create(source: Option<&str>, namespace: &str, name: &str) -> Result<PhpClass> {
    match source {
        Some(text) => parse(text),
        None => Ok(PhpClass::new(namespace, name)),
    }
}

/// Parse one php class file into the class model. Methods are recognized
/// by name so they can be replaced; any other member is preserved as a
/// verbatim block.
pub fn parse(source: &str) -> Result<PhpClass> {
    let namespace = NAMESPACE
        .captures(source)
        .map(|c| c[1].trim().to_string())
        .ok_or_else(|| Error::InvalidDefinition("class file has no namespace".to_string()))?;

    let class_caps = CLASS
        .captures(source)
        .ok_or_else(|| Error::InvalidDefinition("class file has no class declaration".to_string()))?;
    let class_start = class_caps.get(0).unwrap().start();

    let mut class = PhpClass::new(&namespace, class_caps[1].trim());
    class.extends = class_caps.get(2).map(|m| m.as_str().trim().to_string());
    if let Some(implements) = class_caps.get(3) {
        for interface in implements.as_str().split(',') {
            class.add_implements(interface.trim());
        }
    }

    for caps in IMPORT.captures_iter(&source[..class_start]) {
        class.imports.insert(caps[1].trim().to_string());
    }
    class.doc = parse_class_doc(&source[..class_start]);

    let body_open = source[class_start..]
        .find('{')
        .map(|i| class_start + i)
        .ok_or_else(|| Error::InvalidDefinition("class body not found".to_string()))?;
    for segment in split_members(&source[body_open + 1..])? {
        let item = match METHOD_NAME.captures(&segment) {
            Some(caps) => {
                let mut method = PhpMethod::new(&caps[1]);
                method.raw = Some(segment);
                ClassItem::Method(method)
            }
            None => ClassItem::Verbatim(segment),
        };
        class.items.push(item);
    }
    Ok(class)
}

/// Doc block immediately preceding the class declaration, if any.
fn parse_class_doc(head: &str) -> Vec<String> {
    let trimmed = head.trim_end();
    if !trimmed.ends_with("*/") {
        return Vec::new();
    }
    let open = match trimmed.rfind("/**") {
        Some(i) => i,
        None => return Vec::new(),
    };
    trimmed[open..]
        .lines()
        .filter(|line| !line.trim().starts_with("/**") && !line.trim().starts_with("*/"))
        .map(|line| {
            line.trim_start()
                .trim_start_matches('*')
                .strip_prefix(' ')
                .unwrap_or_else(|| line.trim_start().trim_start_matches('*'))
                .to_string()
        })
        .collect()
}

/// Split the class body into top-level member blocks, honoring strings
/// and comments so braces inside literals do not confuse the scan.
fn split_members(body: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 1usize;
    let mut chars = body.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        let mut boundary = false;
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
        } else if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                current.push(c);
                current.push(chars.next().unwrap());
                in_block_comment = false;
                continue;
            }
        } else if in_single {
            if c == '\\' {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            if c == '\'' {
                in_single = false;
            }
        } else if in_double {
            if c == '\\' {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            if c == '"' {
                in_double = false;
            }
        } else {
            match c {
                '\'' => in_single = true,
                '"' => in_double = true,
                '/' if chars.peek() == Some(&'/') => in_line_comment = true,
                '/' if chars.peek() == Some(&'*') => in_block_comment = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        // end of the class body
                        push_segment(&mut segments, &mut current);
                        return Ok(segments);
                    }
                    if depth == 1 {
                        boundary = true;
                    }
                }
                ';' if depth == 1 => boundary = true,
                _ => {}
            }
        }
        current.push(c);
        if boundary {
            push_segment(&mut segments, &mut current);
        }
    }
    Err(Error::InvalidDefinition(
        "unbalanced braces in class body".to_string(),
    ))
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let segment = current.trim_matches('\n').trim_end().to_string();
    current.clear();
    if !segment.trim().is_empty() {
        segments.push(segment);
    }
}
