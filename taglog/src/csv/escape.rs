//! CSV value escaping

use std::borrow::Cow;

const QUOTE: u8 = b'"';

/// Escape one CSV value.
///
/// Quotes are doubled; a value containing `delimiter` is wrapped in quotes.
/// Values needing neither are returned borrowed.
pub fn escape(value: &[u8], delimiter: u8) -> Cow<'_, [u8]> {
    let mut quotes = 0;
    let mut has_delimiter = false;
    for &b in value {
        if b == QUOTE {
            quotes += 1;
        } else if b == delimiter {
            has_delimiter = true;
        }
    }

    if quotes == 0 && !has_delimiter {
        return Cow::Borrowed(value);
    }

    let wrap = if has_delimiter { 2 } else { 0 };
    let mut out = Vec::with_capacity(value.len() + quotes + wrap);
    if has_delimiter {
        out.push(QUOTE);
    }
    for &b in value {
        out.push(b);
        if b == QUOTE {
            out.push(QUOTE);
        }
    }
    if has_delimiter {
        out.push(QUOTE);
    }
    Cow::Owned(out)
}

/// [`escape`] for text values
pub fn escape_str(value: &str, delimiter: u8) -> Cow<'_, str> {
    match escape(value.as_bytes(), delimiter) {
        Cow::Borrowed(_) => Cow::Borrowed(value),
        // Only ASCII quotes are inserted, so the output stays valid UTF-8.
        Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
