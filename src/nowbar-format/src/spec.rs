//! Base format spec: `[[fill]align][sign][#][0][width][grouping][.precision][type]`.

use crate::error::{FormatError, FormatResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign/prefix and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    /// Only negative numbers carry a sign.
    #[default]
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Option<Sign>,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    pub fn parse(spec: &str) -> FormatResult<Self> {
        let invalid = || FormatError::InvalidSpec(spec.to_string());
        let chars: Vec<char> = spec.chars().collect();
        let mut pos = 0;

        let mut fill = None;
        let mut align = None;
        if let Some(a) = chars.get(1).copied().and_then(align_from_char) {
            fill = Some(chars[0]);
            align = Some(a);
            pos = 2;
        } else if let Some(a) = chars.first().copied().and_then(align_from_char) {
            align = Some(a);
            pos = 1;
        }

        let sign = match chars.get(pos) {
            Some('+') => Some(Sign::Plus),
            Some('-') => Some(Sign::Minus),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if sign.is_some() {
            pos += 1;
        }

        let alternate = chars.get(pos) == Some(&'#');
        if alternate {
            pos += 1;
        }

        let zero = chars.get(pos) == Some(&'0');
        if zero {
            pos += 1;
        }

        let width = take_number(&chars, &mut pos).map_err(|_| invalid())?;

        let grouping = match chars.get(pos) {
            Some(c @ (',' | '_')) => {
                pos += 1;
                Some(*c)
            }
            _ => None,
        };

        let mut precision = None;
        if chars.get(pos) == Some(&'.') {
            pos += 1;
            precision = take_number(&chars, &mut pos).map_err(|_| invalid())?;
            if precision.is_none() {
                return Err(FormatError::NotAllowed(
                    "format specifier missing precision",
                ));
            }
        }

        let kind = match &chars[pos..] {
            [] => None,
            [c] => Some(*c),
            _ => return Err(invalid()),
        };

        Ok(Self {
            fill,
            align,
            sign,
            alternate,
            zero,
            width,
            grouping,
            precision,
            kind,
        })
    }

    pub fn apply(&self, value: &Value) -> FormatResult<String> {
        match value {
            Value::Text(text) => self.apply_text(text),
            Value::Int(number) => self.apply_int(*number),
        }
    }

    fn apply_text(&self, text: &str) -> FormatResult<String> {
        match self.kind {
            None | Some('s') => {}
            Some(code) => return Err(FormatError::UnknownCode { code, kind: "text" }),
        }
        if self.sign.is_some() {
            return Err(FormatError::NotAllowed(
                "sign not allowed in string format specifier",
            ));
        }
        if self.alternate {
            return Err(FormatError::NotAllowed(
                "alternate form (#) not allowed in string format specifier",
            ));
        }
        if self.align == Some(Align::AfterSign) {
            return Err(FormatError::NotAllowed(
                "'=' alignment not allowed in string format specifier",
            ));
        }
        if self.grouping.is_some() {
            return Err(FormatError::NotAllowed(
                "grouping not allowed in string format specifier",
            ));
        }

        let body: String = match self.precision {
            Some(limit) => text.chars().take(limit).collect(),
            None => text.to_string(),
        };
        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });
        let align = self.align.unwrap_or(Align::Left);
        Ok(pad("", &body, self.width, fill, align))
    }

    fn apply_int(&self, number: i64) -> FormatResult<String> {
        if self.precision.is_some() {
            return Err(FormatError::NotAllowed(
                "precision not allowed in integer format specifier",
            ));
        }
        let (radix, prefix) = match self.kind {
            None | Some('d') | Some('n') => (10, ""),
            Some('b') => (2, "0b"),
            Some('o') => (8, "0o"),
            Some('x') => (16, "0x"),
            Some('X') => (16, "0X"),
            Some(code) => {
                return Err(FormatError::UnknownCode {
                    code,
                    kind: "integer",
                })
            }
        };
        if self.grouping == Some(',') && radix != 10 {
            return Err(FormatError::NotAllowed(
                "',' grouping requires a decimal format",
            ));
        }

        let magnitude = number.unsigned_abs();
        let mut digits = match self.kind {
            Some('b') => format!("{magnitude:b}"),
            Some('o') => format!("{magnitude:o}"),
            Some('x') => format!("{magnitude:x}"),
            Some('X') => format!("{magnitude:X}"),
            _ => magnitude.to_string(),
        };
        if let Some(separator) = self.grouping {
            let group = if radix == 10 { 3 } else { 4 };
            digits = group_digits(&digits, separator, group);
        }

        let mut head = match (number < 0, self.sign.unwrap_or_default()) {
            (true, _) => "-".to_string(),
            (false, Sign::Plus) => "+".to_string(),
            (false, Sign::Space) => " ".to_string(),
            (false, Sign::Minus) => String::new(),
        };
        if self.alternate {
            head.push_str(prefix);
        }

        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });
        let align = match self.align {
            Some(align) => align,
            None if self.zero => Align::AfterSign,
            None => Align::Right,
        };
        Ok(pad(&head, &digits, self.width, fill, align))
    }
}

fn align_from_char(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

fn take_number(chars: &[char], pos: &mut usize) -> Result<Option<usize>, std::num::ParseIntError> {
    let start = *pos;
    while chars.get(*pos).is_some_and(|c| c.is_ascii_digit()) {
        *pos += 1;
    }
    if start == *pos {
        return Ok(None);
    }
    chars[start..*pos]
        .iter()
        .collect::<String>()
        .parse()
        .map(Some)
}

fn group_digits(digits: &str, separator: char, group: usize) -> String {
    let count = digits.chars().count();
    let mut grouped = String::with_capacity(digits.len() + count / group);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (count - i) % group == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

/// Pads `head + body` to `width` characters. `head` is the sign/prefix
/// part that `AfterSign` keeps in front of the padding.
fn pad(head: &str, body: &str, width: Option<usize>, fill: char, align: Align) -> String {
    let len = head.chars().count() + body.chars().count();
    let padding = width.map_or(0, |w| w.saturating_sub(len));
    let fill_run = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match align {
        Align::Left => format!("{head}{body}{}", fill_run(padding)),
        Align::Right => format!("{}{head}{body}", fill_run(padding)),
        Align::Center => {
            let left = padding / 2;
            let right = padding - left;
            format!("{}{head}{body}{}", fill_run(left), fill_run(right))
        }
        Align::AfterSign => format!("{head}{}{body}", fill_run(padding)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(spec: &str, value: impl Into<Value>) -> FormatResult<String> {
        FormatSpec::parse(spec)?.apply(&value.into())
    }

    #[test]
    fn parses_full_spec() {
        let spec = FormatSpec::parse("*^+#012,.3x").expect("valid spec");
        assert_eq!(spec.fill, Some('*'));
        assert_eq!(spec.align, Some(Align::Center));
        assert_eq!(spec.sign, Some(Sign::Plus));
        assert!(spec.alternate);
        assert!(spec.zero);
        assert_eq!(spec.width, Some(12));
        assert_eq!(spec.grouping, Some(','));
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('x'));
    }

    #[test]
    fn zero_padded_integers() {
        assert_eq!(apply("04d", 42).unwrap(), "0042");
        assert_eq!(apply("05", -42).unwrap(), "-0042");
        assert_eq!(apply("+d", 7).unwrap(), "+7");
        assert_eq!(apply("#06x", 255).unwrap(), "0x00ff");
        assert_eq!(apply(",", 1234567).unwrap(), "1,234,567");
    }

    #[test]
    fn string_precision_and_alignment() {
        assert_eq!(apply(".7", "hello world").unwrap(), "hello w");
        assert_eq!(apply("<15", "hello world").unwrap(), "hello world    ");
        assert_eq!(apply(">15", "hello world").unwrap(), "    hello world");
        assert_eq!(
            apply("^30", "hello world").unwrap(),
            "         hello world          "
        );
        assert_eq!(apply("-^9.3", "abcdef").unwrap(), "---abc---");
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        assert_eq!(apply(">4", "ñú").unwrap(), "  ñú");
    }

    #[test]
    fn type_mismatches_are_errors() {
        assert!(matches!(
            apply("d", "text"),
            Err(FormatError::UnknownCode { code: 'd', .. })
        ));
        assert!(matches!(apply(".3", 10), Err(FormatError::NotAllowed(_))));
        assert!(matches!(
            apply("+", "text"),
            Err(FormatError::NotAllowed(_))
        ));
    }

    #[test]
    fn malformed_specs_are_rejected() {
        assert!(matches!(
            FormatSpec::parse("abc"),
            Err(FormatError::InvalidSpec(_))
        ));
        assert!(matches!(
            FormatSpec::parse(".3,x"),
            Err(FormatError::InvalidSpec(_))
        ));
        assert!(FormatSpec::parse("10.").is_err());
    }
}
