//! `xml_to_json` — decode an XML document into nested structured data.
//!
//! Conventions: attributes become `@name` keys, repeated sibling elements
//! fold into sequences, and an element holding only text collapses to its
//! string. Output: `{ json }`.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use engine::models::{OutputMap, WorkflowNode};
use engine::ActionHandler;

pub struct XmlToJsonAction;

#[async_trait]
impl ActionHandler for XmlToJsonAction {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &OutputMap,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<OutputMap> {
        let xml = input
            .get("xml")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("node '{}' requires a string 'xml' input", node.id))?;

        let parsed = xml_to_value(xml).context("failed to decode XML input")?;

        let mut output = OutputMap::new();
        output.insert("json".into(), parsed);
        Ok(output)
    }
}

/// Decode an XML document into a `Value` tree.
pub fn xml_to_value(xml: &str) -> anyhow::Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Stack of open elements; index 0 is the synthetic document root.
    let mut stack: Vec<(String, OutputMap)> = vec![(String::new(), OutputMap::new())];

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push((element_name(start.name().as_ref()), attributes(&start)?));
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref());
                let map = attributes(&start)?;
                let parent = &mut stack.last_mut().expect("document root").1;
                insert_child(parent, name, collapse(map));
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                if !text.is_empty() {
                    append_text(&mut stack.last_mut().expect("document root").1, &text);
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                append_text(&mut stack.last_mut().expect("document root").1, &text);
            }
            Event::End(_) => {
                let (name, map) = stack.pop().expect("matched start tag");
                if stack.is_empty() {
                    bail!("unbalanced XML: closing tag without opener");
                }
                let parent = &mut stack.last_mut().expect("document root").1;
                insert_child(parent, name, collapse(map));
            }
            Event::Eof => break,
            // Declarations, comments, and processing instructions carry no data.
            _ => {}
        }
    }

    if stack.len() != 1 {
        bail!("unbalanced XML: {} element(s) left open", stack.len() - 1);
    }
    let (_, root) = stack.pop().expect("document root");
    Ok(Value::Object(root))
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attributes(start: &quick_xml::events::BytesStart<'_>) -> anyhow::Result<OutputMap> {
    let mut map = OutputMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        map.insert(
            format!("@{}", element_name(attr.key.as_ref())),
            Value::String(attr.unescape_value()?.into_owned()),
        );
    }
    Ok(map)
}

/// An element with only text collapses to a string; with nothing, to null.
fn collapse(mut map: OutputMap) -> Value {
    if map.is_empty() {
        return Value::Null;
    }
    if map.len() == 1 {
        if let Some(Value::String(_)) = map.get("#text") {
            return map.remove("#text").expect("checked above");
        }
    }
    Value::Object(map)
}

/// Repeated sibling elements fold into a sequence under one key.
fn insert_child(parent: &mut OutputMap, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

fn append_text(map: &mut OutputMap, text: &str) {
    match map.get_mut("#text") {
        Some(Value::String(existing)) => existing.push_str(text),
        _ => {
            map.insert("#text".into(), Value::String(text.to_string()));
        }
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_elements_collapse_to_strings() {
        let value = xml_to_value("<root><title>hello</title></root>").unwrap();
        assert_eq!(value, json!({ "root": { "title": "hello" } }));
    }

    #[test]
    fn repeated_siblings_fold_into_a_sequence() {
        let value = xml_to_value("<rss><item>a</item><item>b</item><item>c</item></rss>").unwrap();
        assert_eq!(value, json!({ "rss": { "item": ["a", "b", "c"] } }));
    }

    #[test]
    fn attributes_are_prefixed() {
        let value = xml_to_value(r#"<link href="https://example.com" rel="self"/>"#).unwrap();
        assert_eq!(
            value,
            json!({ "link": { "@href": "https://example.com", "@rel": "self" } })
        );
    }

    #[test]
    fn mixed_attributes_and_children() {
        let value =
            xml_to_value(r#"<entry id="1"><title>t</title><empty/></entry>"#).unwrap();
        assert_eq!(
            value,
            json!({ "entry": { "@id": "1", "title": "t", "empty": null } })
        );
    }

    #[test]
    fn cdata_is_text() {
        let value = xml_to_value("<doc><![CDATA[raw <stuff>]]></doc>").unwrap();
        assert_eq!(value, json!({ "doc": "raw <stuff>" }));
    }

    #[test]
    fn entities_are_unescaped() {
        let value = xml_to_value("<doc>a &amp; b</doc>").unwrap();
        assert_eq!(value, json!({ "doc": "a & b" }));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(xml_to_value("<open><unclosed></open>").is_err());
    }

    #[tokio::test]
    async fn handler_wraps_the_decoded_document() {
        let node = WorkflowNode {
            id: "decode".into(),
            action: "xml_to_json".into(),
            input: json!({}),
            depends_on: vec![],
            timeout_ms: None,
            retry: None,
        };
        let input = json!({ "xml": "<a><b>x</b></a>" })
            .as_object()
            .cloned()
            .unwrap();

        let output = XmlToJsonAction
            .execute(&node, &input, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output["json"], json!({ "a": { "b": "x" } }));
    }
}
