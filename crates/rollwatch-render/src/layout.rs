use unicode_width::UnicodeWidthStr;

pub const COLUMN_PADDING: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// Raw tab-separated columns.
    Tabs,
    /// Columns padded to a common width, ignoring escape sequences.
    #[default]
    Aligned,
}

/// Remove CSI escape sequences (`ESC [ ... final`) from `input`.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&next) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

pub fn display_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

/// Pad every tab-separated cell except the last to the widest cell of its
/// column plus `COLUMN_PADDING` spaces.
pub fn align_columns(lines: &[String]) -> Vec<String> {
    let mut widths: Vec<usize> = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split('\t').collect();
        let padded = cells.len().saturating_sub(1);
        for (idx, cell) in cells.iter().take(padded).enumerate() {
            let width = display_width(cell);
            if idx >= widths.len() {
                widths.push(width);
            } else if widths[idx] < width {
                widths[idx] = width;
            }
        }
    }

    lines
        .iter()
        .map(|line| {
            let cells: Vec<&str> = line.split('\t').collect();
            let last = cells.len().saturating_sub(1);
            let mut out = String::new();
            for (idx, cell) in cells.iter().enumerate() {
                out.push_str(cell);
                if idx < last {
                    let pad = widths[idx] - display_width(cell) + COLUMN_PADDING;
                    out.push_str(&" ".repeat(pad));
                }
            }
            out.trim_end().to_string()
        })
        .collect()
}
