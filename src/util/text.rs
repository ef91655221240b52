use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns (CJK and emoji count double).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";

/// Truncate to at most `max_width` columns, appending "..." when text is cut.
///
/// Widths of three columns or fewer get a plain cut with no ellipsis, since
/// there is no room for both. Returns `Cow::Borrowed` when the string fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS.len() {
        return Cow::Owned(take_columns(s, max_width).to_string());
    }
    let kept = take_columns(s, max_width - ELLIPSIS.len());
    Cow::Owned(format!("{}{}", kept, ELLIPSIS))
}

/// Longest prefix of `s` that fits in `columns`.
fn take_columns(s: &str, columns: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > columns {
            return &s[..idx];
        }
        used += w;
    }
    s
}

/// Break a single logical line into rows of at most `width` columns.
///
/// Prefers breaking at spaces; words longer than a row are split mid-word.
/// An empty line still occupies one row.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;

    for word in line.split(' ') {
        let word_width = display_width(word);
        let sep = usize::from(!row.is_empty());

        if row_width + sep + word_width <= width {
            if sep == 1 {
                row.push(' ');
            }
            row.push_str(word);
            row_width += sep + word_width;
            continue;
        }

        if !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            row_width = 0;
        }

        let mut rest = word;
        while display_width(rest) > width {
            let head = take_columns(rest, width);
            // A double-width char wider than the row still has to go somewhere
            let head = if head.is_empty() {
                let end = rest.chars().next().map_or(rest.len(), char::len_utf8);
                &rest[..end]
            } else {
                head
            };
            rows.push(head.to_string());
            rest = &rest[head.len()..];
        }
        row.push_str(rest);
        row_width = display_width(rest);
    }

    rows.push(row);
    rows
}

/// Number of rows `line` occupies when wrapped at `width`.
pub fn wrapped_height(line: &str, width: usize) -> usize {
    wrap_line(line, width).len()
}

/// Remove terminal control characters and escape sequences from remote text.
///
/// Keeps tab and newline; drops other C0 controls, DEL, and ESC together with
/// the CSI (`ESC [ ... final`) or OSC (`ESC ] ... BEL|ESC \`) sequence it starts.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let dirty = s
        .chars()
        .any(|c| c == '\x7f' || (c.is_ascii_control() && c != '\t' && c != '\n'));
    if !dirty {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
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
            },
            '\t' | '\n' => out.push(c),
            c if c == '\x7f' || c.is_ascii_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
