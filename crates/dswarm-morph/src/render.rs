//! Metamorph XML rendering

use crate::script::{
    CollectRule, DataRule, LookupTable, MapEntry, MorphScript, Rule, ENTITY_MARKER,
    METAMORPH_NAMESPACE, METAMORPH_VERSION,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML write failed: {0}")]
    Xml(String),

    #[error("rendered script is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render `script` as an indented Metamorph document
///
/// Output depends only on the script value: sections, rules, attributes and
/// map entries are written in their stored order.
pub fn to_xml(script: &MorphScript) -> Result<String, RenderError> {
    let mut out = XmlOut::new();

    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.start(
        "metamorph",
        &[
            ("xmlns", METAMORPH_NAMESPACE),
            ("version", METAMORPH_VERSION),
            ("entityMarker", ENTITY_MARKER),
        ],
    )?;

    out.start("meta", &[])?;
    out.text_element("name", &script.name)?;
    out.end("meta")?;

    if !script.vars.is_empty() {
        out.start("vars", &[])?;
        for (name, value) in &script.vars {
            out.empty("var", &[("name", name.as_str()), ("value", value.as_str())])?;
        }
        out.end("vars")?;
    }

    if script.rules.is_empty() {
        out.empty("rules", &[])?;
    } else {
        out.start("rules", &[])?;
        for rule in &script.rules {
            match rule {
                Rule::Data(data) => out.data_rule(data)?,
                Rule::Collect(collect) => out.collect_rule(collect)?,
            }
        }
        out.end("rules")?;
    }

    if !script.maps.is_empty() {
        out.start("maps", &[])?;
        for table in script.maps.values() {
            out.table(table)?;
        }
        out.end("maps")?;
    }

    if !script.filters.is_empty() {
        out.start("filters", &[])?;
        for (name, filter) in &script.filters {
            out.empty(
                "filter",
                &[
                    ("name", name.as_str()),
                    ("type", filter.dialect.as_str()),
                    ("expression", filter.expression.as_str()),
                ],
            )?;
        }
        out.end("filters")?;
    }

    out.end("metamorph")?;
    out.finish()
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer
            .write_event(event)
            .map_err(|e| RenderError::Xml(e.to_string()))
    }

    fn start(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let element = with_attributes(tag, attrs.iter().copied());
        self.event(Event::Start(element))
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let element = with_attributes(tag, attrs.iter().copied());
        self.event(Event::Empty(element))
    }

    fn end(&mut self, tag: &str) -> Result<(), RenderError> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<(), RenderError> {
        if text.is_empty() {
            return self.empty(tag, &[]);
        }
        self.start(tag, &[])?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn data_rule(&mut self, rule: &DataRule) -> Result<(), RenderError> {
        let mut attrs = vec![("source", rule.source.as_str())];
        if let Some(name) = &rule.name {
            attrs.push(("name", name.as_str()));
        }
        if let Some(filter) = &rule.filter {
            attrs.push(("filter", filter.as_str()));
        }

        if rule.functions.is_empty() {
            return self.empty("data", &attrs);
        }

        self.start("data", &attrs)?;
        for function in &rule.functions {
            let element = with_attributes(
                &function.name,
                function.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
            self.event(Event::Empty(element))?;
        }
        self.end("data")
    }

    fn collect_rule(&mut self, rule: &CollectRule) -> Result<(), RenderError> {
        let attrs = std::iter::once(("name", rule.name.as_str()))
            .chain(rule.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        self.event(Event::Start(with_attributes(&rule.kind, attrs)))?;
        for input in &rule.inputs {
            self.data_rule(input)?;
        }
        self.end(&rule.kind)
    }

    fn table(&mut self, table: &LookupTable) -> Result<(), RenderError> {
        if table.entries.is_empty() {
            return self.empty("map", &[("name", table.name.as_str())]);
        }
        self.start("map", &[("name", table.name.as_str())])?;
        for entry in &table.entries {
            self.entry(entry)?;
        }
        self.end("map")
    }

    fn entry(&mut self, entry: &MapEntry) -> Result<(), RenderError> {
        let mut attrs = vec![("name", entry.name.as_str())];
        if let Some(value) = &entry.value {
            attrs.push(("value", value.as_str()));
        }
        if entry.entries.is_empty() {
            return self.empty("entry", &attrs);
        }
        self.start("entry", &attrs)?;
        for nested in &entry.entries {
            self.entry(nested)?;
        }
        self.end("entry")
    }

    fn finish(self) -> Result<String, RenderError> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }
}

fn with_attributes<'a>(
    tag: &'a str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
) -> BytesStart<'a> {
    let mut element = BytesStart::new(tag);
    for attr in attrs {
        element.push_attribute(attr);
    }
    element
}
