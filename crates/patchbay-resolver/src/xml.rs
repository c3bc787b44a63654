//! XML emission for switch-facing documents.
//!
//! Identifier attributes (`name`, `field`, `application`) are escaped
//! for `< > & ' "`. The `expression` attribute and action `data` are
//! written verbatim: they legitimately carry `${…}` switch-side
//! interpolation tokens and regex metacharacters, and the resolver is
//! responsible for sanitizing anything user-controlled before it gets
//! here.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use tracing::{error, warn};

use crate::program::{self, ExtensionProgram};

/// Returned by directory lookups that matched nothing; the switch
/// treats it as "unknown user".
pub const EMPTY_DOCUMENT: &str = "<document type=\"freeswitch/xml\"/>";

/// Returned by configuration lookups for unrecognized keys.
pub const NOT_FOUND_DOCUMENT: &str = "<document type=\"freeswitch/xml\">\n  \
     <section name=\"result\">\n    \
     <result status=\"not found\"/>\n  \
     </section>\n</document>";

/// Last-ditch dialplan document, used only if the writer itself
/// fails. Keeps the always-answerable contract without recursing into
/// the emitter.
const WRITER_FAILURE_DOCUMENT: &str = "<document type=\"freeswitch/xml\">\n  \
     <section name=\"dialplan\">\n    \
     <context name=\"default\">\n      \
     <extension name=\"application_error\">\n        \
     <condition field=\"destination_number\" expression=\"^.*$\">\n          \
     <action application=\"answer\"/>\n          \
     <action application=\"playback\" \
     data=\"ivr/ivr-call_cannot_be_completed_as_dialed.wav\"/>\n          \
     <action application=\"hangup\"/>\n        \
     </condition>\n      \
     </extension>\n    \
     </context>\n  \
     </section>\n</document>";

type XmlResult<T> = Result<T, quick_xml::Error>;

/// Escaped attribute: safe for any identifier-ish value.
fn esc_attr<'a>(key: &'a str, value: &'a str) -> Attribute<'a> {
    let value = match quick_xml::escape::escape(value) {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    };
    Attribute {
        key: QName(key.as_bytes()),
        value,
    }
}

/// Verbatim attribute: bytes pass through untouched.
fn raw_attr<'a>(key: &'a str, value: &'a str) -> Attribute<'a> {
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Borrowed(value.as_bytes()),
    }
}

/// Small stack writer shared by the dialplan, directory, and
/// configuration renderers.
pub(crate) struct DocWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl DocWriter {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn element<'a>(
        name: &'a str,
        escaped: &'a [(&'a str, &'a str)],
        raw: &'a [(&'a str, &'a str)],
    ) -> BytesStart<'a> {
        let mut elem = BytesStart::new(name);
        for &(k, v) in escaped {
            elem.push_attribute(esc_attr(k, v));
        }
        for &(k, v) in raw {
            elem.push_attribute(raw_attr(k, v));
        }
        elem
    }

    pub(crate) fn start(&mut self, name: &str, escaped: &[(&str, &str)]) -> XmlResult<()> {
        self.start_mixed(name, escaped, &[])
    }

    pub(crate) fn start_mixed(
        &mut self,
        name: &str,
        escaped: &[(&str, &str)],
        raw: &[(&str, &str)],
    ) -> XmlResult<()> {
        self.writer
            .write_event(Event::Start(Self::element(name, escaped, raw)))?;
        Ok(())
    }

    pub(crate) fn empty(&mut self, name: &str, escaped: &[(&str, &str)]) -> XmlResult<()> {
        self.empty_mixed(name, escaped, &[])
    }

    pub(crate) fn empty_mixed(
        &mut self,
        name: &str,
        escaped: &[(&str, &str)],
        raw: &[(&str, &str)],
    ) -> XmlResult<()> {
        self.writer
            .write_event(Event::Empty(Self::element(name, escaped, raw)))?;
        Ok(())
    }

    pub(crate) fn end(&mut self, name: &str) -> XmlResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    pub(crate) fn finish(self) -> XmlResult<String> {
        let bytes = self.writer.into_inner().into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Render one extension program as the complete dialplan document the
/// switch executes.
///
/// Malformed programs are replaced by the standard error program; a
/// writer failure degrades to a static error document. This function
/// cannot fail.
pub fn render_dialplan(context: &str, program: &ExtensionProgram) -> String {
    let fallback;
    let program = if program.is_well_formed() {
        program
    } else {
        warn!(
            extension = %program.name,
            "malformed extension program replaced with error program"
        );
        fallback = program::application_error(None);
        &fallback
    };

    match build_dialplan(context, program) {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "dialplan document emission failed");
            WRITER_FAILURE_DOCUMENT.to_string()
        }
    }
}

fn build_dialplan(context: &str, program: &ExtensionProgram) -> XmlResult<String> {
    let mut w = DocWriter::new();
    w.start("document", &[("type", "freeswitch/xml")])?;
    w.start("section", &[("name", "dialplan")])?;
    w.start("context", &[("name", context)])?;
    w.start("extension", &[("name", &program.name)])?;
    w.start_mixed(
        "condition",
        &[("field", &program.condition_field)],
        &[("expression", &program.expression)],
    )?;
    for action in &program.actions {
        if action.data.is_empty() {
            w.empty("action", &[("application", &action.application)])?;
        } else {
            w.empty_mixed(
                "action",
                &[("application", &action.application)],
                &[("data", &action.data)],
            )?;
        }
    }
    w.end("condition")?;
    w.end("extension")?;
    w.end("context")?;
    w.end("section")?;
    w.end("document")?;
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ExtensionProgram;

    fn sample() -> ExtensionProgram {
        let mut p = ExtensionProgram::on_destination("local_extension_1001", "^1001$".into());
        p.push("set", "call_timeout=25");
        p.push("bridge", "user/1001@a.example");
        p.push("hangup", "");
        p
    }

    #[test]
    fn renders_canonical_shape() {
        let doc = render_dialplan("default", &sample());
        assert!(doc.starts_with("<document type=\"freeswitch/xml\">"));
        assert_eq!(doc.matches("<context").count(), 1);
        assert_eq!(doc.matches("<extension").count(), 1);
        assert!(doc.contains("<section name=\"dialplan\">"));
        assert!(doc.contains(
            "<condition field=\"destination_number\" expression=\"^1001$\">"
        ));
        assert!(doc.contains("<action application=\"set\" data=\"call_timeout=25\"/>"));
        // hangup without data gets no data attribute
        assert!(doc.contains("<action application=\"hangup\"/>"));
    }

    #[test]
    fn action_order_is_preserved() {
        let doc = render_dialplan("default", &sample());
        let set = doc.find("application=\"set\"").unwrap();
        let bridge = doc.find("application=\"bridge\"").unwrap();
        let hangup = doc.find("application=\"hangup\"").unwrap();
        assert!(set < bridge && bridge < hangup);
    }

    #[test]
    fn identifier_attributes_are_escaped() {
        let mut p = ExtensionProgram::on_destination("a<b>&\"name\"", "^x$".into());
        p.push("set", "x=y");
        let doc = render_dialplan("default", &p);
        assert!(doc.contains("name=\"a&lt;b&gt;&amp;&quot;name&quot;\""));
    }

    #[test]
    fn expression_and_data_pass_through_verbatim() {
        let mut p = ExtensionProgram::on_destination("t", r"^\+1(\d{10})$".into());
        p.push("set", "dialed=${destination_number}");
        p.push("bridge", "sofia/gateway/sw1/${dialed_extension}");
        let doc = render_dialplan("default", &p);
        assert!(doc.contains(r#"expression="^\+1(\d{10})$""#));
        assert!(doc.contains("data=\"dialed=${destination_number}\""));
        assert!(doc.contains("data=\"sofia/gateway/sw1/${dialed_extension}\""));
    }

    #[test]
    fn malformed_program_becomes_error_program() {
        let empty = ExtensionProgram::on_destination("broken", "^x$".into());
        let doc = render_dialplan("default", &empty);
        assert!(doc.contains("extension name=\"application_error\""));
        assert!(doc.contains("ivr/ivr-call_cannot_be_completed_as_dialed.wav"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(
            render_dialplan("default", &sample()),
            render_dialplan("default", &sample())
        );
    }
}
