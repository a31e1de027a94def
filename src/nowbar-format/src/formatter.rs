use crate::error::{FormatError, FormatResult};
use crate::sanitize::{escape_markup, sanitize_unicode};
use crate::spec::FormatSpec;
use crate::template::{Directive, DirectiveSource, Segment, SpecPart, Template};
use crate::value::{Value, Values};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Immutable formatter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOptions {
    pub status_icons: BTreeMap<String, String>,
    pub markup_escape: bool,
    pub sanitize_unicode: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            status_icons: BTreeMap::new(),
            markup_escape: false,
            sanitize_unicode: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    options: FormatterOptions,
}

impl Formatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }

    /// Parses and renders in one go.
    pub fn format(&self, template: &str, values: &Values) -> FormatResult<String> {
        self.render(&Template::parse(template)?, values)
    }

    pub fn render(&self, template: &Template, values: &Values) -> FormatResult<String> {
        let mut out = String::new();
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = lookup(values, &field.name)?;
                    let rendered = match &field.directive {
                        DirectiveSource::Static(directive) => self.format_field(value, directive)?,
                        DirectiveSource::Dynamic(parts) => {
                            let spec = self.expand_spec(parts, values)?;
                            self.format_field(value, &Directive::classify(&spec)?)?
                        }
                    };
                    out.push_str(&rendered);
                }
            }
        }
        Ok(out)
    }

    fn expand_spec(&self, parts: &[SpecPart], values: &Values) -> FormatResult<String> {
        let mut spec = String::new();
        for part in parts {
            match part {
                SpecPart::Literal(text) => spec.push_str(text),
                SpecPart::Field { name, directive } => {
                    spec.push_str(&self.format_field(lookup(values, name)?, directive)?);
                }
            }
        }
        Ok(spec)
    }

    /// Sanitise, apply the directive, then escape.
    fn format_field(&self, value: &Value, directive: &Directive) -> FormatResult<String> {
        let value = match value {
            Value::Text(text) if self.options.sanitize_unicode => match sanitize_unicode(text) {
                Cow::Borrowed(_) => Cow::Borrowed(value),
                Cow::Owned(clean) => Cow::Owned(Value::Text(clean)),
            },
            _ => Cow::Borrowed(value),
        };

        let text = match directive {
            Directive::Plain => value.to_string(),
            Directive::Filter(filter) => filter.apply(&value, &self.options.status_icons)?,
            Directive::Truncate { truncate, raw } => match value.as_text() {
                Some(text) => truncate.apply(text),
                None => FormatSpec::parse(raw)?.apply(&value)?,
            },
            Directive::Spec(spec) => spec.apply(&value)?,
        };

        if self.options.markup_escape {
            Ok(escape_markup(&text))
        } else {
            Ok(text)
        }
    }
}

fn lookup<'v>(values: &'v Values, name: &str) -> FormatResult<&'v Value> {
    values
        .get(name)
        .ok_or_else(|| FormatError::MissingField(name.to_string()))
}
