//! Font metrics and greedy word wrapping.
//!
//! Both export paths lay text out in the standard PDF Helvetica faces, so the
//! widths below are the Adobe core-font metrics in 1/1000 em. They cover
//! printable ASCII (0x20..=0x7E, index = code - 32); anything else falls back
//! to an average glyph width.

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// CSS pixels per PostScript point (96 dpi / 72 dpi).
pub const PX_PER_PT: f32 = 96.0 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    /// Base-14 PostScript name.
    pub fn postscript_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
        }
    }

    /// CSS `font-weight` for the rendered view.
    pub fn css_weight(self) -> &'static str {
        match self {
            FontStyle::Regular => "normal",
            FontStyle::Bold => "bold",
        }
    }

    fn table(self) -> &'static [u16; 95] {
        match self {
            FontStyle::Regular => &HELVETICA,
            FontStyle::Bold => &HELVETICA_BOLD,
        }
    }

    /// Width of `text` in em units.
    pub fn measure_em(self, text: &str) -> f32 {
        let table = self.table();
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    table[code - 32] as u32
                } else {
                    AVERAGE_WIDTH as u32
                }
            })
            .sum();
        units as f32 / 1000.0
    }
}

/// A font face at a size, able to measure in any unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub style: FontStyle,
    pub size_pt: f32,
}

impl Font {
    pub const fn new(style: FontStyle, size_pt: f32) -> Self {
        Self { style, size_pt }
    }

    pub fn width_mm(&self, text: &str) -> f32 {
        self.style.measure_em(text) * self.size_pt * MM_PER_PT
    }

    pub fn width_px(&self, text: &str) -> f32 {
        self.style.measure_em(text) * self.size_pt * PX_PER_PT
    }
}

/// Splits `text` into lines no wider than `max_width`, as measured by
/// `measure`. Explicit newlines are kept as paragraph breaks; words wider
/// than a full line are broken by character.
pub fn wrap_with<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            for piece in split_oversized(word, max_width, &measure) {
                if current.is_empty() {
                    current = piece;
                    continue;
                }
                let candidate = format!("{current} {piece}");
                if measure(&candidate) <= max_width {
                    current = candidate;
                } else {
                    lines.push(std::mem::replace(&mut current, piece));
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Wraps to a width in millimetres.
pub fn wrap_mm(text: &str, font: Font, max_width_mm: f32) -> Vec<String> {
    wrap_with(text, max_width_mm, |s| font.width_mm(s))
}

/// Wraps to a width in CSS pixels.
pub fn wrap_px(text: &str, font: Font, max_width_px: f32) -> Vec<String> {
    wrap_with(text, max_width_px, |s| font.width_px(s))
}

fn split_oversized<F>(word: &str, max_width: f32, measure: &F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    if measure(word) <= max_width {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if measure(&current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

const AVERAGE_WIDTH: u16 = 556;

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A-M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N-Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a-m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n-z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    333, 333, 584, 584, 584, 611, 975,
    // A-M
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    // N-Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    333, 278, 333, 584, 556, 333,
    // a-m
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    // n-z
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // {    |    }    ~
    389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_measure_known_widths() {
        // "Hi" = H(722) + i(222)
        assert!((FontStyle::Regular.measure_em("Hi") - 0.944).abs() < 1e-6);
        assert!(FontStyle::Bold.measure_em("Hi") > FontStyle::Regular.measure_em("Hi"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let font = Font::new(FontStyle::Regular, 10.0);
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_mm(&text, font, 60.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(font.width_mm(line) <= 60.0, "line too wide: {line}");
        }
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn test_wrap_keeps_paragraph_breaks_and_drops_blank_input() {
        let font = Font::new(FontStyle::Regular, 10.0);
        assert_eq!(wrap_mm("one\ntwo", font, 170.0), vec!["one", "two"]);
        assert!(wrap_mm("   \n ", font, 170.0).is_empty());
    }

    #[test]
    fn test_wrap_breaks_oversized_word() {
        let font = Font::new(FontStyle::Regular, 10.0);
        let url = "https://example.com/".to_string() + &"segment/".repeat(30);
        let lines = wrap_mm(&url, font, 50.0);

        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), url);
    }
}
