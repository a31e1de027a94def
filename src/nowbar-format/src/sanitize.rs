use std::borrow::Cow;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Removes characters from the "other" categories except `Cf` (format).
///
/// Control, surrogate, private-use and unassigned code points are dropped;
/// zero-width and bidi marks stay where the player put them.
pub fn sanitize_unicode(value: &str) -> Cow<'_, str> {
    if !value.chars().any(is_stripped) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(value.chars().filter(|c| !is_stripped(*c)).collect())
}

fn is_stripped(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// Escapes `&`, `<`, `>`, `"` and `'` for Pango markup.
pub fn escape_markup(value: &str) -> String {
    htmlescape::encode_minimal(value)
}
