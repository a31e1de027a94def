use crate::error::{FormatError, FormatResult};
use crate::value::Value;
use std::collections::BTreeMap;

/// Named directives that replace the base format spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    /// First character upper-cased, the rest lower-cased.
    Capitalize,
    /// Every whitespace-delimited word capitalised.
    Title,
    /// Looks the value up in the status icon table; `?` when unmapped.
    Icon,
}

type TextFn = fn(&str) -> String;

const NAMED_FILTERS: [(&str, Filter); 5] = [
    ("upper", Filter::Upper),
    ("lower", Filter::Lower),
    ("capitalize", Filter::Capitalize),
    ("title", Filter::Title),
    ("icon", Filter::Icon),
];

pub(crate) const UNKNOWN_ICON: &str = "?";

impl Filter {
    pub fn from_name(name: &str) -> Option<Self> {
        NAMED_FILTERS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .copied()
            .map(|(_, filter)| filter)
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Upper => "upper",
            Filter::Lower => "lower",
            Filter::Capitalize => "capitalize",
            Filter::Title => "title",
            Filter::Icon => "icon",
        }
    }

    fn text_fn(self) -> Option<TextFn> {
        match self {
            Filter::Upper => Some(str::to_uppercase),
            Filter::Lower => Some(str::to_lowercase),
            Filter::Capitalize => Some(capitalize),
            Filter::Title => Some(title_case),
            Filter::Icon => None,
        }
    }

    pub(crate) fn apply(
        self,
        value: &Value,
        icons: &BTreeMap<String, String>,
    ) -> FormatResult<String> {
        if let Some(transform) = self.text_fn() {
            return match value {
                Value::Text(text) => Ok(transform(text)),
                other => Err(FormatError::FilterType {
                    filter: self.name(),
                    kind: other.kind(),
                }),
            };
        }
        let icon = value
            .as_text()
            .and_then(|status| icons.get(status))
            .map_or(UNKNOWN_ICON, String::as_str);
        Ok(icon.to_string())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            out.push(c);
            word_start = true;
        } else if word_start {
            out.extend(c.to_uppercase());
            word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// `.N,SUFFIX`: keep the first `N` characters of a text value and append
/// `SUFFIX` when the value was actually shortened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Truncate {
    pub limit: usize,
    pub suffix: String,
}

impl Truncate {
    pub fn parse(spec: &str) -> Option<Self> {
        let rest = spec.strip_prefix('.')?;
        let (digits, suffix) = rest.split_once(',')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || suffix.is_empty() {
            return None;
        }
        Some(Self {
            limit: digits.parse().ok()?,
            suffix: suffix.to_string(),
        })
    }

    pub fn apply(&self, text: &str) -> String {
        match text.char_indices().nth(self.limit) {
            Some((cut, _)) => format!("{}{}", &text[..cut], self.suffix),
            None => text.to_string(),
        }
    }
}
