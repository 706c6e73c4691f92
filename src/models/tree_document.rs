//! XML tree document: a `<Tree>` container holding nested `<Node Text Path>`
//! elements in display order.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DOCUMENT_EXTENSION: &str = "treexml";

const CONTAINER_ELEMENT: &str = "Tree";
const NODE_ELEMENT: &str = "Node";
const TEXT_ATTR: &[u8] = b"Text";
const PATH_ATTR: &[u8] = b"Path";

/// One persisted node. Placeholders never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub text: String,
    pub path: Option<PathBuf>,
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("node element at byte {position} has no Text attribute")]
    MissingText { position: u64 },
    #[error("document has no tree container")]
    MissingContainer,
    #[error("unexpected content at byte {position}")]
    UnexpectedContent { position: u64 },
    #[error("document ends inside an open element")]
    Truncated,
    #[error("failed to encode document: {0}")]
    Encode(#[from] io::Error),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("document is not valid utf-8")]
    InvalidUtf8,
    #[error("path is not valid utf-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

enum Step<'a> {
    Open(&'a OutlineNode),
    Close,
}

pub fn encode(outline: &[OutlineNode]) -> Result<String, DocumentError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    if outline.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(CONTAINER_ELEMENT)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(CONTAINER_ELEMENT)))?;

        let mut stack: Vec<Step<'_>> = outline.iter().rev().map(Step::Open).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Close => {
                    writer.write_event(Event::End(BytesEnd::new(NODE_ELEMENT)))?;
                }
                Step::Open(node) => {
                    let mut element = BytesStart::new(NODE_ELEMENT);
                    element.push_attribute(("Text", node.text.as_str()));
                    if let Some(path) = &node.path {
                        let text = path
                            .to_str()
                            .ok_or_else(|| DocumentError::NonUtf8Path(path.clone()))?;
                        element.push_attribute(("Path", text));
                    }

                    if node.children.is_empty() {
                        writer.write_event(Event::Empty(element))?;
                    } else {
                        writer.write_event(Event::Start(element))?;
                        stack.push(Step::Close);
                        stack.extend(node.children.iter().rev().map(Step::Open));
                    }
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new(CONTAINER_ELEMENT)))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|_| DocumentError::InvalidUtf8)
}

/// Parses a tree document. Element names are not checked; the first
/// top-level element is the container and everything inside it is a node.
pub fn decode(input: &str) -> Result<Vec<OutlineNode>, DocumentError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut roots = Vec::new();
    let mut open: Vec<OutlineNode> = Vec::new();
    let mut container_seen = false;
    let mut container_open = false;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event()? {
            Event::Start(element) => {
                if !container_open {
                    if container_seen {
                        return Err(DocumentError::UnexpectedContent { position });
                    }
                    container_seen = true;
                    container_open = true;
                } else {
                    open.push(read_node(&element, position)?);
                }
            }
            Event::Empty(element) => {
                if !container_open {
                    if container_seen {
                        return Err(DocumentError::UnexpectedContent { position });
                    }
                    container_seen = true;
                } else {
                    let node = read_node(&element, position)?;
                    attach(&mut open, &mut roots, node);
                }
            }
            Event::End(_) => match open.pop() {
                Some(node) => attach(&mut open, &mut roots, node),
                None => container_open = false,
            },
            Event::Text(text) => {
                if !text.unescape()?.trim().is_empty() {
                    return Err(DocumentError::UnexpectedContent { position });
                }
            }
            Event::CData(_) => return Err(DocumentError::UnexpectedContent { position }),
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if container_open || !open.is_empty() {
        return Err(DocumentError::Truncated);
    }
    if !container_seen {
        return Err(DocumentError::MissingContainer);
    }
    Ok(roots)
}

fn read_node(element: &BytesStart<'_>, position: u64) -> Result<OutlineNode, DocumentError> {
    let mut text = None;
    let mut path = None;
    for attr in element.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            TEXT_ATTR => text = Some(attr.unescape_value()?.into_owned()),
            PATH_ATTR => path = Some(PathBuf::from(attr.unescape_value()?.as_ref())),
            _ => {}
        }
    }

    let text = text.ok_or(DocumentError::MissingText { position })?;
    Ok(OutlineNode {
        text,
        path,
        children: Vec::new(),
    })
}

fn attach(open: &mut [OutlineNode], roots: &mut Vec<OutlineNode>, node: OutlineNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

pub fn save_to_file(path: &Path, outline: &[OutlineNode]) -> Result<(), DocumentError> {
    let content = encode(outline)?;
    std::fs::write(path, content).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_from_file(path: &Path) -> Result<Vec<OutlineNode>, DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|_| DocumentError::InvalidUtf8)?;
    decode(&content)
}

#[cfg(test)]
#[path = "../../tests/unit/models/tree_document.rs"]
mod tests;
