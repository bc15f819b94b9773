use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ellipsis appended when a line is cut.
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates `s` so that it occupies at most `max_width` terminal columns.
///
/// Wide characters (CJK, emoji) count as two columns. When the text has to be
/// cut and there is room for it, `...` is appended; for widths of three
/// columns or less the text is simply clipped.
///
/// # Examples
///
/// ```
/// use folio::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Tracker", 10), "Tracker");
/// assert_eq!(truncate_to_width("time tracker", 8), "time ...");
/// assert_eq!(truncate_to_width("Tracker", 3), "Tra");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width > ELLIPSIS_WIDTH {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    } else {
        (max_width, "")
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Removes control characters and ANSI escape sequences from store-provided text.
///
/// Tab, newline and carriage return are kept. CSI sequences (`ESC [ ... final`)
/// and OSC sequences (`ESC ] ... BEL` or `ESC ] ... ESC \`) are dropped whole.
/// Returns the input borrowed when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c == '\x1b' || c == '\x7f' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));

    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            if !is_unsafe(c) {
                out.push(c);
            }
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Indents every line of `s` by `indent` spaces.
pub fn indent(s: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    s.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
