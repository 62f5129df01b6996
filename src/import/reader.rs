//! Streaming XML node reader
//!
//! Pulls elements with a given tag name out of an export file one at a time.
//! Only the matched element's subtree is ever held in memory, so exports with
//! tens of thousands of items stream in constant space.

use super::source::ImportError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// An element captured from the stream, with its full subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Qualified tag name as written in the document (e.g. `wp:author`)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content directly inside this element
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()));

        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| e.to_string())?
                .into_owned();
            node.attributes.push((key, value));
        }

        Ok(node)
    }
}

/// Forward-only reader yielding every element named `element`, at any depth
pub struct XmlNodeReader<R: BufRead> {
    /// Source path (for diagnostics)
    path: PathBuf,
    /// Tag name to capture
    element: String,
    /// Underlying pull parser
    reader: Reader<R>,
    /// Event buffer, reused between reads
    buf: Vec<u8>,
    /// Current element nesting depth in the document
    depth: usize,
    /// Set once the stream ended or failed
    finished: bool,
}

impl XmlNodeReader<BufReader<File>> {
    /// Open an export file for streaming
    pub fn open(path: impl AsRef<Path>, element: impl Into<String>) -> Result<Self, ImportError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let buf_reader = BufReader::with_capacity(1024 * 1024, file); // 1MB buffer

        let mut reader = Self::new(buf_reader, element);
        reader.path = path;
        Ok(reader)
    }
}

impl<R: BufRead> XmlNodeReader<R> {
    /// Stream from any buffered reader
    pub fn new(source: R, element: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            element: element.into(),
            reader: Reader::from_reader(source),
            buf: Vec::with_capacity(8192),
            depth: 0,
            finished: false,
        }
    }

    /// Element name this reader captures
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Path of the file being read (empty for in-memory sources)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed from the underlying stream so far
    pub fn byte_position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Read until the next complete matching element or the end of the stream
    fn next_node(&mut self) -> Result<Option<XmlNode>, ImportError> {
        let mut stack: Vec<XmlNode> = Vec::new();

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    return Err(malformed(self.reader.buffer_position() as u64, e.to_string()))
                }
            };

            match event {
                Event::Start(ref e) => {
                    self.depth += 1;
                    let capturing =
                        !stack.is_empty() || e.name().as_ref() == self.element.as_bytes();
                    if capturing {
                        let node = XmlNode::from_start(e)
                            .map_err(|m| malformed(self.reader.buffer_position() as u64, m))?;
                        stack.push(node);
                    }
                }
                Event::Empty(ref e) => {
                    let matches = e.name().as_ref() == self.element.as_bytes();
                    if !stack.is_empty() || matches {
                        let node = XmlNode::from_start(e)
                            .map_err(|m| malformed(self.reader.buffer_position() as u64, m))?;
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => return Ok(Some(node)),
                        }
                    }
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    if let Some(node) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => return Ok(Some(node)),
                        }
                    }
                }
                Event::Text(ref e) => {
                    if let Some(node) = stack.last_mut() {
                        match e.unescape() {
                            Ok(text) => node.text.push_str(&text),
                            // Unknown entities are kept verbatim
                            Err(_) => node.text.push_str(&String::from_utf8_lossy(e)),
                        }
                    }
                }
                Event::CData(e) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => {
                    if self.depth > 0 || !stack.is_empty() {
                        return Err(malformed(
                            self.reader.buffer_position() as u64,
                            "unexpected end of document",
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

fn malformed(position: u64, message: impl Into<String>) -> ImportError {
    ImportError::MalformedInput {
        position,
        message: message.into(),
    }
}

impl<R: BufRead> Iterator for XmlNodeReader<R> {
    type Item = Result<XmlNode, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_node() {
            Ok(Some(node)) => Some(Ok(node)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                // A broken stream cannot be resynchronized; report once and stop
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
