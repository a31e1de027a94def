use crate::error::{FormatError, FormatResult};
use crate::filters::{Filter, Truncate};
use crate::spec::FormatSpec;
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

/// A compiled template. Static directives are classified and validated
/// here, so a malformed spec fails when the configuration is built rather
/// than on the first render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub name: String,
    pub directive: DirectiveSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DirectiveSource {
    Static(Directive),
    /// Spec text containing nested fields, classified after expansion.
    Dynamic(Vec<SpecPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpecPart {
    Literal(String),
    Field { name: String, directive: Directive },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive {
    Plain,
    Filter(Filter),
    /// Truncate-with-suffix; `raw` is reparsed as a base spec for non-text values.
    Truncate { truncate: Truncate, raw: String },
    Spec(FormatSpec),
}

impl Directive {
    pub fn classify(spec: &str) -> FormatResult<Self> {
        if spec.is_empty() {
            return Ok(Directive::Plain);
        }
        if let Some(filter) = Filter::from_name(spec) {
            return Ok(Directive::Filter(filter));
        }
        if let Some(truncate) = Truncate::parse(spec) {
            return Ok(Directive::Truncate {
                truncate,
                raw: spec.to_string(),
            });
        }
        FormatSpec::parse(spec).map(Directive::Spec)
    }
}

impl Template {
    pub fn parse(source: &str) -> FormatResult<Self> {
        let mut chars = source.chars().peekable();
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(parse_field(&mut chars)?));
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(FormatError::UnmatchedBrace('}')),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of every field the template reads, nested ones included.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flat_map(|segment| {
            let (name, nested): (Option<&str>, &[SpecPart]) = match segment {
                Segment::Literal(_) => (None, &[]),
                Segment::Field(field) => match &field.directive {
                    DirectiveSource::Static(_) => (Some(field.name.as_str()), &[]),
                    DirectiveSource::Dynamic(parts) => (Some(field.name.as_str()), parts),
                },
            };
            name.into_iter().chain(nested.iter().filter_map(|part| match part {
                SpecPart::Field { name, .. } => Some(name.as_str()),
                SpecPart::Literal(_) => None,
            }))
        })
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for Template {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses `name[:spec]}` after an opening brace.
fn parse_field(chars: &mut Peekable<Chars<'_>>) -> FormatResult<Field> {
    let name = parse_name(chars)?;
    let terminator = chars.next().ok_or(FormatError::UnclosedField)?;
    if terminator == '}' {
        return Ok(Field {
            name,
            directive: DirectiveSource::Static(Directive::Plain),
        });
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    loop {
        match chars.next().ok_or(FormatError::UnclosedField)? {
            '}' => break,
            '{' => {
                if !literal.is_empty() {
                    parts.push(SpecPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(parse_nested(chars)?);
            }
            other => literal.push(other),
        }
    }

    let directive = if parts.is_empty() {
        DirectiveSource::Static(Directive::classify(&literal)?)
    } else {
        if !literal.is_empty() {
            parts.push(SpecPart::Literal(literal));
        }
        DirectiveSource::Dynamic(parts)
    };
    Ok(Field { name, directive })
}

/// Parses a field nested inside a spec. Its own spec may not nest further.
fn parse_nested(chars: &mut Peekable<Chars<'_>>) -> FormatResult<SpecPart> {
    let name = parse_name(chars)?;
    let mut spec = String::new();
    if chars.next().ok_or(FormatError::UnclosedField)? == ':' {
        loop {
            match chars.next().ok_or(FormatError::UnclosedField)? {
                '}' => break,
                '{' => return Err(FormatError::NestingTooDeep),
                other => spec.push(other),
            }
        }
    }
    Ok(SpecPart::Field {
        name,
        directive: Directive::classify(&spec)?,
    })
}

/// Reads a field name, leaving the terminating `:` or `}` in place.
fn parse_name(chars: &mut Peekable<Chars<'_>>) -> FormatResult<String> {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            ':' | '}' => break,
            '{' => return Err(FormatError::BraceInFieldName),
            '!' => {
                chars.next();
                let conversion: String = chars.by_ref().take_while(|c| *c != '}').collect();
                return Err(FormatError::Conversion(conversion));
            }
            _ => {
                name.push(c);
                chars.next();
            }
        }
    }
    if chars.peek().is_none() {
        return Err(FormatError::UnclosedField);
    }
    if name.is_empty() {
        return Err(FormatError::EmptyFieldName);
    }
    Ok(name)
}
