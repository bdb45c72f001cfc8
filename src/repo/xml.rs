//! System-view / document-view codec
//!
//! Reads and writes the two serialization encodings of a repository subtree.
//! The system view (`sv:node`/`sv:property`/`sv:value`) preserves property
//! types and multi-value ordering; the document view maps node names to
//! element names and properties to string attributes, multi-values joined
//! with a space. Reading auto-detects the encoding from the root element.

use crate::error::{JackError, Result};
use crate::repo::node::{Node, Property, PropertyType};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::{BufRead, Write};

const SV_NAMESPACE: &str = "http://www.jcp.org/jcr/sv/1.0";
const JCR_NAMESPACE: &str = "http://www.jcp.org/jcr/1.0";
const NT_NAMESPACE: &str = "http://www.jcp.org/jcr/nt/1.0";

const SV_NODE: &[u8] = b"sv:node";
const SV_PROPERTY: &[u8] = b"sv:property";
const SV_VALUE: &[u8] = b"sv:value";

/// Serialize a subtree in the system view encoding
pub fn write_system_view(root: &Node, sink: &mut dyn Write) -> Result<()> {
    emit_system_view(root, sink)
        .map_err(|e| JackError::serialization_with("failed to write system view", e))
}

/// Serialize a subtree in the document view encoding
pub fn write_document_view(root: &Node, sink: &mut dyn Write) -> Result<()> {
    emit_document_view(root, sink)
        .map_err(|e| JackError::serialization_with("failed to write document view", e))
}

/// Deserialize a subtree, auto-detecting the encoding from the root element
pub fn read_tree<R: BufRead>(source: R) -> Result<Node> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                let start = e.to_owned();
                return if start.name().as_ref() == SV_NODE {
                    parse_system_view(&mut reader, &start)
                } else {
                    parse_document_view(&mut reader, &start)
                };
            }
            Event::Empty(e) => {
                // a childless root, complete in itself
                return if e.name().as_ref() == SV_NODE {
                    system_view_node(&e)
                } else {
                    document_view_node(&e)
                };
            }
            Event::Eof => {
                return Err(JackError::serialization(
                    "document contains no root element",
                ));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn xml_error(e: quick_xml::Error) -> JackError {
    JackError::serialization_with("malformed XML", e)
}

/// Look up an attribute by qualified name
fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| JackError::serialization_with("malformed attribute", e))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn element_name(e: &BytesStart) -> Result<String> {
    std::str::from_utf8(e.name().as_ref())
        .map(ToString::to_string)
        .map_err(|e| JackError::serialization_with("element name is not valid UTF-8", e))
}

// --- system view ---

fn system_view_node(e: &BytesStart) -> Result<Node> {
    let name = attribute(e, "sv:name")?
        .ok_or_else(|| JackError::serialization("sv:node element without sv:name"))?;
    Ok(Node::new(name))
}

fn system_view_property(e: &BytesStart) -> Result<(String, Property)> {
    let name = attribute(e, "sv:name")?
        .ok_or_else(|| JackError::serialization("sv:property element without sv:name"))?;
    let ptype = match attribute(e, "sv:type")? {
        Some(t) => PropertyType::from_str(&t)
            .ok_or_else(|| JackError::serialization(format!("unknown sv:type {t}")))?,
        None => PropertyType::String,
    };
    Ok((name, Property::multi(ptype, Vec::new())))
}

fn parse_system_view<R: BufRead>(reader: &mut Reader<R>, root: &BytesStart) -> Result<Node> {
    let mut stack = vec![system_view_node(root)?];
    let mut property: Option<(String, Property)> = None;
    let mut value: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                SV_NODE => stack.push(system_view_node(&e)?),
                SV_PROPERTY => property = Some(system_view_property(&e)?),
                SV_VALUE => value = Some(String::new()),
                other => {
                    return Err(JackError::serialization(format!(
                        "unexpected element {} in system view",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Empty(e) => match e.name().as_ref() {
                SV_NODE => {
                    let node = system_view_node(&e)?;
                    attach_child(&mut stack, node)?;
                }
                SV_PROPERTY => {
                    let (name, prop) = system_view_property(&e)?;
                    attach_property(&mut stack, name, prop)?;
                }
                SV_VALUE => {
                    let (_, prop) = property
                        .as_mut()
                        .ok_or_else(|| JackError::serialization("sv:value outside property"))?;
                    prop.values.push(String::new());
                }
                other => {
                    return Err(JackError::serialization(format!(
                        "unexpected element {} in system view",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Text(e) => {
                if let Some(text) = value.as_mut() {
                    text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(text) = value.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                SV_VALUE => {
                    let text = value
                        .take()
                        .ok_or_else(|| JackError::serialization("stray sv:value end tag"))?;
                    let (_, prop) = property
                        .as_mut()
                        .ok_or_else(|| JackError::serialization("sv:value outside property"))?;
                    prop.values.push(text);
                }
                SV_PROPERTY => {
                    let (name, prop) = property
                        .take()
                        .ok_or_else(|| JackError::serialization("stray sv:property end tag"))?;
                    attach_property(&mut stack, name, prop)?;
                }
                SV_NODE => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| JackError::serialization("stray sv:node end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                _ => {}
            },
            Event::Eof => {
                return Err(JackError::serialization(
                    "unexpected end of system view document",
                ));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn attach_child(stack: &mut [Node], node: Node) -> Result<()> {
    stack
        .last_mut()
        .ok_or_else(|| JackError::serialization("node outside document root"))?
        .children
        .push(node);
    Ok(())
}

fn attach_property(stack: &mut [Node], name: String, prop: Property) -> Result<()> {
    stack
        .last_mut()
        .ok_or_else(|| JackError::serialization("property outside node"))?
        .properties
        .insert(name, prop);
    Ok(())
}

// --- document view ---

fn document_view_node(e: &BytesStart) -> Result<Node> {
    let mut node = Node::new(element_name(e)?);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| JackError::serialization_with("malformed attribute", e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| JackError::serialization_with("attribute name is not valid UTF-8", e))?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value().map_err(xml_error)?;
        node.properties
            .insert(key.to_string(), Property::string(value.into_owned()));
    }
    Ok(node)
}

fn parse_document_view<R: BufRead>(reader: &mut Reader<R>, root: &BytesStart) -> Result<Node> {
    let mut stack = vec![document_view_node(root)?];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => stack.push(document_view_node(&e)?),
            Event::Empty(e) => {
                let node = document_view_node(&e)?;
                attach_child(&mut stack, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| JackError::serialization("stray end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            // document view text content has no counterpart in the tree model
            Event::Text(_) | Event::CData(_) => {}
            Event::Eof => {
                return Err(JackError::serialization(
                    "unexpected end of document view document",
                ));
            }
            _ => {}
        }
        buf.clear();
    }
}

// --- emission ---

fn emit_system_view(root: &Node, sink: &mut dyn Write) -> std::io::Result<()> {
    writeln!(sink, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    emit_system_view_node(root, sink, 0, true)
}

fn emit_system_view_node(
    node: &Node,
    sink: &mut dyn Write,
    depth: usize,
    is_root: bool,
) -> std::io::Result<()> {
    let pad = "  ".repeat(depth);
    write!(sink, "{pad}<sv:node")?;
    if is_root {
        write!(sink, " xmlns:sv=\"{SV_NAMESPACE}\"")?;
    }
    writeln!(sink, " sv:name=\"{}\">", escape(&node.name))?;

    for (name, prop) in &node.properties {
        writeln!(
            sink,
            "{pad}  <sv:property sv:name=\"{}\" sv:type=\"{}\">",
            escape(name),
            prop.ptype.as_str()
        )?;
        for value in &prop.values {
            writeln!(sink, "{pad}    <sv:value>{}</sv:value>", escape(value))?;
        }
        writeln!(sink, "{pad}  </sv:property>")?;
    }
    for child in &node.children {
        emit_system_view_node(child, sink, depth + 1, false)?;
    }
    writeln!(sink, "{pad}</sv:node>")
}

fn emit_document_view(root: &Node, sink: &mut dyn Write) -> std::io::Result<()> {
    writeln!(sink, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    emit_document_view_node(root, sink, 0, true)
}

fn emit_document_view_node(
    node: &Node,
    sink: &mut dyn Write,
    depth: usize,
    is_root: bool,
) -> std::io::Result<()> {
    let pad = "  ".repeat(depth);
    write!(sink, "{pad}<{}", node.name)?;
    if is_root {
        write!(
            sink,
            " xmlns:jcr=\"{JCR_NAMESPACE}\" xmlns:nt=\"{NT_NAMESPACE}\""
        )?;
    }
    for (name, prop) in &node.properties {
        write!(sink, " {}=\"{}\"", name, escape(&prop.values.join(" ")))?;
    }
    if node.children.is_empty() {
        writeln!(sink, "/>")
    } else {
        writeln!(sink, ">")?;
        for child in &node.children {
            emit_document_view_node(child, sink, depth + 1, false)?;
        }
        writeln!(sink, "{pad}</{}>", node.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::node::UUID_PROPERTY;

    fn sample_tree() -> Node {
        let mut root = Node::new_workspace_root();
        let mut content = Node::new("content");
        content
            .properties
            .insert("title".to_string(), Property::string("Hello & <world>"));
        content.properties.insert(
            "tags".to_string(),
            Property::multi(
                PropertyType::String,
                vec!["a".to_string(), "b".to_string()],
            ),
        );
        content.properties.insert(
            "count".to_string(),
            Property::new(PropertyType::Long, "42"),
        );
        let mut attachment = Node::new("attachment");
        attachment
            .properties
            .insert("data".to_string(), Property::binary(b"\xDE\xAD\xBE\xEF"));
        attachment.properties.insert(
            UUID_PROPERTY.to_string(),
            Property::string("8f6e2a54-6a63-4b5c-b407-6efaaa73a6ee"),
        );
        content.children.push(attachment);
        root.children.push(content);
        root
    }

    #[test]
    fn test_system_view_round_trip() {
        let tree = sample_tree();
        let mut bytes = Vec::new();
        write_system_view(&tree, &mut bytes).unwrap();
        let back = read_tree(bytes.as_slice()).unwrap();
        assert_eq!(tree, back);
    }

    #[test]
    fn test_system_view_preserves_types_and_ordering() {
        let tree = sample_tree();
        let mut bytes = Vec::new();
        write_system_view(&tree, &mut bytes).unwrap();
        let back = read_tree(bytes.as_slice()).unwrap();

        let content = back.node_at_path("/content").unwrap();
        assert_eq!(
            content.properties["count"].ptype,
            PropertyType::Long
        );
        assert_eq!(content.properties["tags"].values, vec!["a", "b"]);
        let attachment = content.child("attachment").unwrap();
        assert_eq!(attachment.properties["data"].ptype, PropertyType::Binary);
    }

    #[test]
    fn test_document_view_round_trips_structure() {
        let tree = sample_tree();
        let mut bytes = Vec::new();
        write_document_view(&tree, &mut bytes).unwrap();
        let back = read_tree(bytes.as_slice()).unwrap();

        // same names and structure; types flattened to String
        assert_eq!(back.name, tree.name);
        let content = back.node_at_path("/content").unwrap();
        assert_eq!(
            content.properties["title"].first(),
            Some("Hello & <world>")
        );
        assert_eq!(content.properties["count"].ptype, PropertyType::String);
        // multi-values are space-joined in the document view
        assert_eq!(content.properties["tags"].first(), Some("a b"));
        assert!(content.child("attachment").is_some());
    }

    #[test]
    fn test_auto_detect_system_view() {
        let xml = r#"<?xml version="1.0"?>
            <sv:node xmlns:sv="http://www.jcp.org/jcr/sv/1.0" sv:name="jcr:root">
              <sv:property sv:name="flag" sv:type="Boolean"><sv:value>true</sv:value></sv:property>
            </sv:node>"#;
        let tree = read_tree(xml.as_bytes()).unwrap();
        assert_eq!(tree.name, "jcr:root");
        assert_eq!(tree.properties["flag"].ptype, PropertyType::Boolean);
    }

    #[test]
    fn test_auto_detect_document_view() {
        let xml = r#"<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0">
              <content title="hi"/>
            </jcr:root>"#;
        let tree = read_tree(xml.as_bytes()).unwrap();
        assert_eq!(tree.name, "jcr:root");
        assert_eq!(
            tree.child("content").unwrap().properties["title"].first(),
            Some("hi")
        );
    }

    #[test]
    fn test_childless_root_elements() {
        let tree = read_tree(r#"<sv:node sv:name="only"/>"#.as_bytes()).unwrap();
        assert_eq!(tree.name, "only");
        assert!(tree.children.is_empty());

        let tree = read_tree(r#"<content title="hi"/>"#.as_bytes()).unwrap();
        assert_eq!(tree.name, "content");
        assert_eq!(tree.properties["title"].first(), Some("hi"));
    }

    #[test]
    fn test_unknown_sv_type_is_rejected() {
        let xml = r#"<sv:node sv:name="r">
              <sv:property sv:name="p" sv:type="Quaternion"><sv:value>1</sv:value></sv:property>
            </sv:node>"#;
        let err = read_tree(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_truncated_document_is_rejected() {
        let xml = r#"<sv:node sv:name="r"><sv:node sv:name="child">"#;
        assert!(read_tree(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_document_is_rejected() {
        assert!(read_tree(&b""[..]).is_err());
    }
}
