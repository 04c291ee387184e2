//! Decoding of the generic XML return envelope
//!
//! The job endpoints answer with `<response><return>VALUE</return></response>`,
//! usually namespaced (`<ns:initiateDownloadResponse><ns:return>..`). VALUE is
//! opaque text whose meaning depends on the endpoint. The root element name is
//! not checked; the first `return` element at any depth wins.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

const RETURN_TAG: &[u8] = b"return";

/// Extract the text of the first `return` element, ignoring namespace prefixes
///
/// An empty element (`<return/>`) yields an empty string.
///
/// # Errors
///
/// [`Error::InvalidResponse`] when the body is not well-formed XML or has no
/// `return` element.
pub fn return_value(body: &str) -> Result<String> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut inside = false;
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == RETURN_TAG => inside = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == RETURN_TAG => {
                return Ok(String::new());
            }
            Ok(Event::Text(t)) if inside => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::InvalidResponse(format!("bad text in <return>: {e}")))?;
                value.push_str(&text);
            }
            Ok(Event::CData(c)) if inside => {
                value.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(e)) if inside && e.local_name().as_ref() == RETURN_TAG => {
                return Ok(value);
            }
            Ok(Event::Eof) => {
                return Err(Error::InvalidResponse(
                    "response has no <return> element".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(Error::InvalidResponse(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }
}
