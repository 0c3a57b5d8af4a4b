//! Documentation formatter: converts the html fragments carried by
//! service definitions into plain doc-comment text plus the list of
//! urls extracted from anchor tags.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

/// hard-wrap column for multi-line doc comments
const WRAP_WIDTH: usize = 117;

lazy_static! {
    static ref ANCHOR: Regex =
        Regex::new(r#"<a\s+href="(?P<url>[^"]*)"[^>]*>(?P<label>.*?)</a>"#).unwrap();
}

/// A link extracted from documentation html.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub label: String,
}

/// Documentation reduced to plain text plus its extracted links.
#[derive(Clone, Debug, Default)]
pub struct ParsedDoc {
    text: String,
    links: Vec<Link>,
}

/// Strip html from a documentation string.
///
/// Fails with [`Error::UnsupportedDocumentation`] when markup other than
/// the supported tags survives stripping.
pub fn parse(html: &str) -> Result<ParsedDoc> {
    let mut text = html.replace("> <", "><");

    let mut links = Vec::new();
    text = ANCHOR
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let label = caps["label"].to_string();
            links.push(Link {
                url: caps["url"].to_string(),
                label: label.clone(),
            });
            label
        })
        .into_owned();

    for (tag, replacement) in [
        ("<p>", ""),
        ("</p>", "\n"),
        ("<code>", "`"),
        ("</code>", "`"),
        ("<i>", "*"),
        ("</i>", "*"),
        ("<b>", "**"),
        ("</b>", "**"),
        ("<a>", ""),
        ("</a>", ""),
    ] {
        text = text.replace(tag, replacement);
    }

    if text.contains('<') {
        return Err(Error::UnsupportedDocumentation(html.to_string()));
    }

    Ok(ParsedDoc { text, links })
}

impl ParsedDoc {
    /// The primary description: the first non-empty line.
    pub fn first_line(&self) -> Option<String> {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.to_string())
    }

    /// All extracted links, in order of appearance.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Full text, hard-wrapped, followed by one `@see` line per link.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for line in self.text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                if !out.last().map(|l| l.is_empty()).unwrap_or(true) {
                    out.push(String::new());
                }
                continue;
            }
            wrap_into(line, &mut out);
        }
        while out.last().map(|l| l.is_empty()).unwrap_or(false) {
            out.pop();
        }
        if !self.links.is_empty() {
            if !out.is_empty() {
                out.push(String::new());
            }
            for link in &self.links {
                out.push(format!("@see {}", link.url));
            }
        }
        out
    }
}

fn wrap_into(line: &str, out: &mut Vec<String>) {
    let mut current = String::new();
    for word in line.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= WRAP_WIDTH {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}
