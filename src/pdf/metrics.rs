//! Standard-14 Helvetica advance widths (AFM units, 1/1000 em).
//!
//! Used to wrap and align text for the vector export, where text is set in
//! the non-embedded Helvetica faces.

/// Helvetica, ASCII 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

/// Helvetica-Bold, ASCII 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {..~
];

/// Ascender and descender, AFM units.
pub const ASCENT: f64 = 718.0;
pub const DESCENT: f64 = 207.0;

/// Advance width of `ch` in AFM units. Characters outside ASCII use an
/// average lowercase width.
pub fn char_width(ch: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    let cp = ch as u32;
    if (32..=126).contains(&cp) {
        table[(cp - 32) as usize]
    } else if ch == '\u{a0}' {
        table[0]
    } else {
        556
    }
}

/// Width of `text` at `font_size`, in the same unit as `font_size`.
pub fn text_width(text: &str, font_size: f64, bold: bool) -> f64 {
    let units: u32 = text.chars().map(|c| char_width(c, bold) as u32).sum();
    units as f64 * font_size / 1000.0
}

/// Greedy word wrap to `max_width`. Explicit newlines always break; a single
/// word wider than the line stays on its own line.
pub fn wrap_lines(text: &str, font_size: f64, bold: bool, max_width: f64) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| wrap_paragraph(paragraph, font_size, bold, max_width))
        .collect()
}

/// Wrap one paragraph (no newlines). Always yields at least one line.
pub fn wrap_paragraph(paragraph: &str, font_size: f64, bold: bool, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if text_width(&candidate, font_size, bold) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    lines.push(current);
    lines
}

/// Extra advance per space that stretches `line` to `max_width`. Zero when
/// the line has no spaces or is already full.
pub fn justify_spacing(line: &str, font_size: f64, bold: bool, max_width: f64) -> f64 {
    let spaces = line.chars().filter(|&c| c == ' ').count();
    let slack = max_width - text_width(line, font_size, bold);
    if spaces == 0 || !(slack > 0.0) {
        return 0.0;
    }
    slack / spaces as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(char_width(' ', false), 278);
        assert_eq!(char_width('@', false), 1015);
        assert_eq!(char_width('W', false), 944);
        assert_eq!(char_width('i', false), 222);
        assert_eq!(char_width('~', false), 584);
        assert_eq!(char_width('m', true), 889);
        assert_eq!(char_width('é', false), 556);
    }

    #[test]
    fn test_text_width() {
        // H=722 e=556 l=222 l=222 o=556
        assert!((text_width("Hello", 10.0, false) - 22.78).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_lines() {
        let lines = wrap_lines("one two three four", 10.0, false, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 40.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), "one two three four");
    }

    #[test]
    fn test_wrap_keeps_explicit_breaks() {
        assert_eq!(wrap_lines("a\n\nb", 10.0, false, 1000.0), vec!["a", "", "b"]);
        assert_eq!(wrap_paragraph("", 10.0, false, 1000.0), vec![""]);
    }

    #[test]
    fn test_justify_spacing() {
        // "a b": 556 + 278 + 556 = 1390 units, 13.9 at size 10
        assert!((justify_spacing("a b", 10.0, false, 20.0) - 6.1).abs() < 1e-9);
        assert!((justify_spacing("a b c", 10.0, false, 30.0) - 3.88).abs() < 1e-9);
        assert_eq!(justify_spacing("word", 10.0, false, 100.0), 0.0);
        assert_eq!(justify_spacing("a b", 10.0, false, 5.0), 0.0);
    }
}
