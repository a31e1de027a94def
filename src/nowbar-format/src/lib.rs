//! Template formatting for the status line.
//!
//! Templates follow the familiar `{field}` / `{field:directive}` brace
//! syntax. A directive is, in order of precedence:
//!
//! - a named filter: `upper`, `lower`, `capitalize`, `title` or `icon`;
//! - for text values, truncate-with-suffix: `.N,SUFFIX` keeps the first
//!   `N` characters and appends `SUFFIX` only when something was cut;
//! - a base format spec: `[[fill]align][sign][#][0][width][grouping][.precision][type]`,
//!   where any part may be supplied by a nested field, e.g. `{title:>{width}}`.
//!
//! Text values are sanitised before any directive runs and the final
//! field output is markup-escaped last, each when enabled in
//! [`FormatterOptions`].
//!
//! ```
//! use nowbar_format::{Formatter, FormatterOptions, Values};
//!
//! let formatter = Formatter::new(FormatterOptions::default());
//! let mut values = Values::new();
//! values.insert("title".into(), "Lateralus".into());
//! let line = formatter.format("{title:upper}", &values).unwrap();
//! assert_eq!(line, "LATERALUS");
//! ```

mod error;
mod filters;
mod formatter;
mod sanitize;
mod spec;
mod template;
mod value;

pub use error::{FormatError, FormatResult};
pub use filters::Filter;
pub use formatter::{Formatter, FormatterOptions};
pub use sanitize::{escape_markup, sanitize_unicode};
pub use spec::{Align, FormatSpec, Sign};
pub use template::Template;
pub use value::{Value, Values};
