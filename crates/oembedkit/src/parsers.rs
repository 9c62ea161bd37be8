//! Content parsers for provider responses
//!
//! Parsers are tried in the order of [`PARSERS`]; the first whose
//! content-type patterns match the response header wins.

use crate::error::ParseError;
use crate::glob::matches_any_ignore_case;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Key holding element attributes in decoded XML
pub const XML_ATTRIBUTES_KEY: &str = "$";

/// Key holding element text when the element also has attributes
pub const XML_TEXT_KEY: &str = "_";

/// A body decoder selected by content-type
#[derive(Debug)]
pub struct ContentParser {
    /// Name for logging
    pub name: &'static str,
    /// Glob patterns matched case-insensitively against the content-type
    pub content_types: &'static [&'static str],
    /// Decode the raw body
    pub parse: fn(&str) -> Result<Value, ParseError>,
}

/// JSON bodies are returned as decoded
pub const JSON_PARSER: ContentParser = ContentParser {
    name: "json",
    content_types: &["application/json**", "text/json**", "text/javascript**", "application/javascript**"],
    parse: parse_json,
};

/// XML bodies are decoded and normalized, see [`parse_xml`]
pub const XML_PARSER: ContentParser = ContentParser {
    name: "xml",
    content_types: &["text/xml**", "application/xml**"],
    parse: parse_xml,
};

/// Parsers in priority order
pub const PARSERS: &[ContentParser] = &[JSON_PARSER, XML_PARSER];

/// Select the first parser accepting a content-type
pub fn find_parser(content_type: &str) -> Option<&'static ContentParser> {
    PARSERS
        .iter()
        .find(|parser| matches_any_ignore_case(content_type, parser.content_types))
}

/// Decode a JSON body
pub fn parse_json(body: &str) -> Result<Value, ParseError> {
    Ok(serde_json::from_str(body)?)
}

/// Decode an XML body into a JSON object
///
/// - a single root element is unwrapped, so `<oembed><title>..</title></oembed>`
///   yields `{"title": ".."}`
/// - hyphens in top-level keys become underscores
/// - when every top-level value carries attributes (`<width type="integer">640</width>`),
///   each value is replaced by its text
///
/// Elements with only text decode to strings, repeated elements to arrays,
/// attributes to a `$` object and text beside attributes or children to `_`.
pub fn parse_xml(body: &str) -> Result<Value, ParseError> {
    let document = decode_xml(body)?;

    let mut root = match document {
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, inner)) => inner,
            None => Value::Null,
        },
        other => other,
    };

    if let Value::Object(map) = root {
        let mut normalized: Map<String, Value> = map
            .into_iter()
            .map(|(key, value)| (key.replace('-', "_"), value))
            .collect();

        let text_wrapped = !normalized.is_empty()
            && normalized.values().all(|value| {
                value
                    .as_object()
                    .is_some_and(|obj| obj.contains_key(XML_ATTRIBUTES_KEY))
            });
        if text_wrapped {
            for value in normalized.values_mut() {
                let text = value
                    .get(XML_TEXT_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                *value = Value::String(text);
            }
        }
        root = Value::Object(normalized);
    }

    Ok(root)
}

/// Element under construction
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let has_text = !self.text.trim().is_empty();
        let value = if self.children.is_empty() && self.attributes.is_empty() {
            Value::String(self.text)
        } else {
            let mut obj = self.children;
            if has_text {
                let text = if obj.is_empty() { self.text } else { self.text.trim().to_string() };
                obj.insert(XML_TEXT_KEY.to_string(), Value::String(text));
            }
            if !self.attributes.is_empty() {
                obj.insert(XML_ATTRIBUTES_KEY.to_string(), Value::Object(self.attributes));
            }
            Value::Object(obj)
        };
        (self.name, value)
    }
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

fn decode_xml(body: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document = Map::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut document, name, value),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ParseError::Shape("unbalanced closing tag".to_string()))?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut document, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Shape("unclosed element".to_string()));
    }
    if document.is_empty() {
        return Err(ParseError::Shape("no root element".to_string()));
    }
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_parser_by_content_type() {
        assert_eq!(find_parser("application/json").map(|p| p.name), Some("json"));
        assert_eq!(
            find_parser("application/json; charset=utf-8").map(|p| p.name),
            Some("json")
        );
        assert_eq!(
            find_parser("TEXT/XML; charset=utf-8").map(|p| p.name),
            Some("xml")
        );
        assert!(find_parser("text/html").is_none());
        assert!(find_parser("").is_none());
    }

    #[test]
    fn test_parse_json_passthrough() {
        let body = r#"{"version":"1.0","type":"rich","width":300}"#;
        assert_eq!(
            parse_json(body).unwrap(),
            json!({"version": "1.0", "type": "rich", "width": 300})
        );
        assert!(matches!(parse_json("<html>"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_parse_xml_unwraps_root_and_renames_keys() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<oembed>
  <version>1.0</version>
  <type>video</type>
  <provider-name>Example</provider-name>
  <thumbnail-url>https://example.com/t.jpg</thumbnail-url>
</oembed>"#;
        assert_eq!(
            parse_xml(body).unwrap(),
            json!({
                "version": "1.0",
                "type": "video",
                "provider_name": "Example",
                "thumbnail_url": "https://example.com/t.jpg"
            })
        );
    }

    #[test]
    fn test_parse_xml_text_wrapped_values() {
        let body = r#"<oembed>
  <version type="string">1.0</version>
  <width type="integer">640</width>
  <author-url type="string">http://talkaboutpopmusic.com</author-url>
  <html type="string">&lt;iframe src="x"&gt;&lt;/iframe&gt;</html>
</oembed>"#;
        assert_eq!(
            parse_xml(body).unwrap(),
            json!({
                "version": "1.0",
                "width": "640",
                "author_url": "http://talkaboutpopmusic.com",
                "html": "<iframe src=\"x\"></iframe>"
            })
        );
    }

    #[test]
    fn test_parse_xml_nested_and_repeated() {
        let body = "<root><a><b>1</b><b>2</b></a><c x=\"y\"/><d><![CDATA[<p>]]></d></root>";
        assert_eq!(
            parse_xml(body).unwrap(),
            json!({
                "a": {"b": ["1", "2"]},
                "c": {"$": {"x": "y"}},
                "d": "<p>"
            })
        );
    }

    #[test]
    fn test_parse_xml_rejects_garbage() {
        assert!(parse_xml("").is_err());
        assert!(parse_xml("<open>").is_err());
        assert!(parse_xml("<a></b>").is_err());
    }
}
