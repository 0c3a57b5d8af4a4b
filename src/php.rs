//! Abstract representation of an emitted php class and its rendering
//! to source text. Generators build classes through this model; the
//! merger parses existing files back into it.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::writer::Writer;

/// banner written at the top of every generated file
pub const GENERATED_BANNER: &str =
    "// This file is generated from a service definition. Generated members will be overwritten.";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PhpProperty {
    pub visibility: Visibility,
    pub name: String,
    pub doc: Vec<String>,
    pub default: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PhpParam {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<String>,
}

impl PhpParam {
    pub fn new(name: &str) -> Self {
        PhpParam { name: name.to_string(), ..Default::default() }
    }

    pub fn typed(name: &str, hint: &str) -> Self {
        PhpParam {
            name: name.to_string(),
            type_hint: Some(hint.to_string()),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct PhpMethod {
    pub visibility: Visibility,
    pub is_static: bool,
    pub name: String,
    pub params: Vec<PhpParam>,
    pub return_type: Option<String>,
    pub doc: Vec<String>,
    /// body statements, one line per `\n`, indented relative to the
    /// method braces
    pub body: String,
    /// verbatim source captured by the merger; rendered unchanged
    pub raw: Option<String>,
}

impl PhpMethod {
    pub fn new(name: &str) -> Self {
        PhpMethod { name: name.to_string(), ..Default::default() }
    }
}

#[derive(Clone, Debug)]
pub enum ClassItem {
    /// a member block preserved verbatim from a merged file
    Verbatim(String),
    Property(PhpProperty),
    Method(PhpMethod),
}

/// One emitted class: namespace, inheritance, imports and ordered members.
#[derive(Clone, Debug, Default)]
pub struct PhpClass {
    pub namespace: String,
    pub name: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub imports: BTreeSet<String>,
    pub doc: Vec<String>,
    pub items: Vec<ClassItem>,
}

impl PhpClass {
    pub fn new(namespace: &str, name: &str) -> Self {
        PhpClass {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn fqcn(&self) -> String {
        format!("{}\\{}", self.namespace, self.name)
    }

    pub fn add_import(&mut self, import: &str) {
        // never import from the class's own namespace
        if import.rsplit_once('\\').map(|(ns, _)| ns) != Some(self.namespace.as_str()) {
            self.imports.insert(import.to_string());
        }
    }

    pub fn add_implements(&mut self, interface: &str) {
        if !self.implements.iter().any(|i| i == interface) {
            self.implements.push(interface.to_string());
        }
    }

    pub fn add_property(&mut self, property: PhpProperty) {
        self.items.push(ClassItem::Property(property));
    }

    pub fn add_method(&mut self, method: PhpMethod) {
        self.items.push(ClassItem::Method(method));
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, ClassItem::Method(m) if m.name == name))
    }

    pub fn remove_method(&mut self, name: &str) {
        self.items
            .retain(|item| !matches!(item, ClassItem::Method(m) if m.name == name));
    }

    /// Render the class to php source.
    pub fn render(&self) -> String {
        let mut w = Writer::default();
        let _ = write!(w, "<?php\n\n{}\n\n", GENERATED_BANNER);
        let _ = write!(w, "namespace {};\n", self.namespace);

        if !self.imports.is_empty() {
            let _ = w.write_str("\n");
            for import in &self.imports {
                let _ = write!(w, "use {};\n", import);
            }
        }

        let _ = w.write_str("\n");
        render_doc(&mut w, &self.doc, "");
        let _ = write!(w, "class {}", self.name);
        if let Some(base) = &self.extends {
            let _ = write!(w, " extends {}", base);
        }
        if !self.implements.is_empty() {
            let _ = write!(w, " implements {}", self.implements.join(", "));
        }
        let _ = w.write_str("\n{\n");

        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                let _ = w.write_str("\n");
            }
            match item {
                ClassItem::Verbatim(block) => {
                    let _ = write!(w, "{}\n", block);
                }
                ClassItem::Property(p) => render_property(&mut w, p),
                ClassItem::Method(m) => render_method(&mut w, m),
            }
        }

        let _ = w.write_str("}\n");
        String::from_utf8_lossy(&w.take()).into_owned()
    }
}

fn render_doc(w: &mut Writer, doc: &[String], indent: &str) {
    if doc.is_empty() {
        return;
    }
    let _ = write!(w, "{}/**\n", indent);
    for line in doc {
        if line.is_empty() {
            let _ = write!(w, "{} *\n", indent);
        } else {
            let _ = write!(w, "{} * {}\n", indent, line);
        }
    }
    let _ = write!(w, "{} */\n", indent);
}

fn render_property(w: &mut Writer, p: &PhpProperty) {
    render_doc(w, &p.doc, "    ");
    let _ = write!(w, "    {} ${}", p.visibility.as_str(), p.name);
    if let Some(default) = &p.default {
        let _ = write!(w, " = {}", default);
    }
    let _ = w.write_str(";\n");
}

fn render_method(w: &mut Writer, m: &PhpMethod) {
    if let Some(raw) = &m.raw {
        let _ = write!(w, "{}\n", raw);
        return;
    }
    render_doc(w, &m.doc, "    ");
    let _ = write!(w, "    {} ", m.visibility.as_str());
    if m.is_static {
        let _ = w.write_str("static ");
    }
    let _ = write!(w, "function {}(", m.name);
    for (i, param) in m.params.iter().enumerate() {
        if i > 0 {
            let _ = w.write_str(", ");
        }
        if let Some(hint) = &param.type_hint {
            let _ = write!(w, "{} ", hint);
        }
        let _ = write!(w, "${}", param.name);
        if let Some(default) = &param.default {
            let _ = write!(w, " = {}", default);
        }
    }
    let _ = w.write_str(")");
    if let Some(ret) = &m.return_type {
        let _ = write!(w, ": {}", ret);
    }
    let _ = w.write_str("\n    {\n");
    for line in m.body.lines() {
        if line.is_empty() {
            let _ = w.write_str("\n");
        } else {
            let _ = write!(w, "        {}\n", line);
        }
    }
    let _ = w.write_str("    }\n");
}
