//! Flat XML documents used on the wire.
//!
//! Requests and responses are a single `<xml>` root holding one element per field:
//!
//! ```xml
//! <xml>
//!   <return_code><![CDATA[SUCCESS]]></return_code>
//!   <amount>100</amount>
//! </xml>
//! ```
//!
//! Nested elements, a root other than `<xml>`, stray text and truncated documents are
//! rejected with [`TransferError::Protocol`]; they are never partially accepted.
//!
//! Field text is kept exactly as received, since response signatures cover the raw
//! values. Whitespace between elements is ignored.

use std::collections::BTreeMap;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::{Result, TransferError};

/// Fields parsed from a response document.
pub type ResponseFields = BTreeMap<String, String>;

const ROOT: &str = "xml";

/// Serializes fields as a flat `<xml>` document in iteration order.
///
/// Text is escaped, so values cannot break out of their element.
pub fn encode<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut writer = Writer::new(Vec::new());
    // Writing into a Vec<u8> cannot fail.
    let _ = writer.write_event(Event::Start(BytesStart::new(ROOT)));
    for (name, value) in fields {
        let _ = writer.write_event(Event::Start(BytesStart::new(name)));
        let _ = writer.write_event(Event::Text(BytesText::new(value)));
        let _ = writer.write_event(Event::End(BytesEnd::new(name)));
    }
    let _ = writer.write_event(Event::End(BytesEnd::new(ROOT)));
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

/// Parses a flat response document.
///
/// # Errors
///
/// Returns [`TransferError::Protocol`] if the body is empty, is not well-formed XML, has a
/// root other than `<xml>`, has text outside a field, has nested field elements, repeats a
/// field, or ends before the root element is closed.
pub fn decode(body: &str) -> Result<ResponseFields> {
    if body.trim().is_empty() {
        return Err(protocol("empty response body"));
    }

    let mut reader = Reader::from_str(body);

    let mut fields = ResponseFields::new();
    let mut depth = 0usize;
    let mut current: Option<String> = None;
    let mut value = String::new();
    let mut closed_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| protocol(format!("malformed document at byte {}: {e}", reader.error_position())))?;

        match event {
            Event::Start(start) => {
                if closed_root {
                    return Err(protocol("content after root element"));
                }
                depth += 1;
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                match depth {
                    1 if name == ROOT => {}
                    1 => return Err(protocol(format!("unexpected root element <{name}>"))),
                    2 => {
                        current = Some(name);
                        value.clear();
                    }
                    _ => return Err(protocol(format!("nested element <{name}> is not allowed"))),
                }
            }
            Event::Empty(empty) => {
                if depth == 1 {
                    // <field/> carries no value and is treated as absent.
                    continue;
                }
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                return Err(protocol(format!("unexpected empty element <{name}>")));
            }
            Event::Text(text) => {
                if depth == 2 {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| protocol(format!("invalid text: {e}")))?;
                    value.push_str(&unescaped);
                } else if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(protocol(if depth == 1 {
                        "text outside a field"
                    } else {
                        "text outside root element"
                    }));
                }
            }
            Event::CData(data) => {
                if depth != 2 {
                    return Err(protocol("character data outside a field"));
                }
                let raw = data.into_inner();
                value.push_str(
                    std::str::from_utf8(&raw).map_err(|e| protocol(format!("invalid UTF-8: {e}")))?,
                );
            }
            Event::End(_) => {
                match depth {
                    2 => {
                        if let Some(name) = current.take() {
                            if fields.contains_key(&name) {
                                return Err(protocol(format!("duplicate field <{name}>")));
                            }
                            if !value.is_empty() {
                                fields.insert(name, std::mem::take(&mut value));
                            }
                        }
                    }
                    1 => closed_root = true,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 || !closed_root {
                    return Err(protocol("truncated document"));
                }
                break;
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    Ok(fields)
}

fn protocol(message: impl Into<String>) -> TransferError {
    TransferError::Protocol(message.into())
}
