//! Byte buffer behind source rendering, and the file writer interface
//! generated classes are persisted through.

use std::{collections::BTreeMap, path::PathBuf};

use tracing::debug;

use crate::{error::Result, php::PhpClass, BytesMut};

#[derive(Default)]
pub struct Writer {
    writer: BytesMut,
}

impl Writer {
    #[inline]
    pub fn write<B: ToBytes>(&mut self, bytes: B) {
        self.writer.extend_from_slice(bytes.to_bytes());
    }

    /// Returns the current buffer, zeroing out self
    pub fn take(&mut self) -> BytesMut {
        self.writer.split_to(self.writer.len())
    }
}

pub trait ToBytes {
    fn to_bytes(&self) -> &[u8];
}
impl ToBytes for &str {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl ToBytes for &String {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl ToBytes for &[u8] {
    fn to_bytes(&self) -> &[u8] {
        self
    }
}

impl std::fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }

    fn write_char(&mut self, c: char) -> std::fmt::Result {
        let mut chars = [0u8; 4];
        let s = c.encode_utf8(&mut chars);
        self.write(s.as_bytes());
        Ok(())
    }
}

/// Persistence boundary for emitted classes. Path layout is the
/// writer's concern; generators commit only to well-named classes in
/// the correct namespace.
pub trait FileWriter {
    /// persist one class, overwriting any previous version
    fn write(&mut self, class: &PhpClass) -> Result<()>;

    /// remove the file backing a fully qualified class name
    fn delete(&mut self, fqcn: &str) -> Result<()>;

    /// source of a previously written class, if present
    fn read(&self, fqcn: &str) -> Result<Option<String>>;
}

/// Writes classes under a root directory, one file per class, with the
/// namespace mapped to a directory path (`Aws\Sqs\SqsClient` becomes
/// `<root>/Aws/Sqs/SqsClient.php`).
pub struct DirWriter {
    root: PathBuf,
}

impl DirWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DirWriter { root: root.into() }
    }

    fn path_for(&self, fqcn: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in fqcn.split('\\') {
            path.push(part);
        }
        path.set_extension("php");
        path
    }
}

impl FileWriter for DirWriter {
    fn write(&mut self, class: &PhpClass) -> Result<()> {
        let path = self.path_for(&class.fqcn());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(class = %class.fqcn(), path = %path.display(), "writing class");
        std::fs::write(&path, class.render())?;
        Ok(())
    }

    fn delete(&mut self, fqcn: &str) -> Result<()> {
        let path = self.path_for(fqcn);
        if path.is_file() {
            debug!(class = fqcn, "deleting class file");
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn read(&self, fqcn: &str) -> Result<Option<String>> {
        let path = self.path_for(fqcn);
        if path.is_file() {
            Ok(Some(std::fs::read_to_string(&path)?))
        } else {
            Ok(None)
        }
    }
}

/// In-memory writer used by the test-suite.
#[derive(Debug, Default)]
pub struct MemWriter {
    files: BTreeMap<String, String>,
}

impl MemWriter {
    pub fn get(&self, fqcn: &str) -> Option<&String> {
        self.files.get(fqcn)
    }

    /// replace a stored file, simulating a hand-edited class on disk
    pub fn insert(&mut self, fqcn: &str, source: String) {
        self.files.insert(fqcn.to_string(), source);
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.files.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileWriter for MemWriter {
    fn write(&mut self, class: &PhpClass) -> Result<()> {
        self.files.insert(class.fqcn(), class.render());
        Ok(())
    }

    fn delete(&mut self, fqcn: &str) -> Result<()> {
        self.files.remove(fqcn);
        Ok(())
    }

    fn read(&self, fqcn: &str) -> Result<Option<String>> {
        Ok(self.files.get(fqcn).cloned())
    }
}
