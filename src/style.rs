//! Style strings and their terminal encoding.
//!
//! A style string is a whitespace separated list of tokens such as
//! `"bold fg:#ff8800 bg:236"`. [`StyleSpec::parse`] turns it into a canonical
//! value; [`StyleSpec::paint`] wraps text in the matching SGR escape sequences.
//!
//! # Example
//!
//! ```rust
//! use sigil::style::{Color, StyleSpec};
//!
//! let style = StyleSpec::parse("bold red bg:blue");
//! assert!(style.bold);
//! assert_eq!(style.fg, Some(Color::Red));
//! assert_eq!(style.bg, Some(Color::Blue));
//! assert_eq!(style.to_string(), "bold fg:red bg:blue");
//!
//! // Empty means "explicitly reset", not "inherit".
//! assert!(StyleSpec::parse("").is_plain());
//! ```

use std::fmt;

use owo_colors::{AnsiColors, DynColors, XtermColors};
use tracing::trace;

/// A terminal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    /// 256-colour palette index
    Fixed(u8),
    /// 24-bit colour
    Rgb(u8, u8, u8),
}

/// Named colours in canonical spelling, indexable by their ANSI order.
const NAMED: &[(&str, Color)] = &[
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("magenta", Color::Magenta),
    ("cyan", Color::Cyan),
    ("white", Color::White),
    ("bright-black", Color::BrightBlack),
    ("bright-red", Color::BrightRed),
    ("bright-green", Color::BrightGreen),
    ("bright-yellow", Color::BrightYellow),
    ("bright-blue", Color::BrightBlue),
    ("bright-magenta", Color::BrightMagenta),
    ("bright-cyan", Color::BrightCyan),
    ("bright-white", Color::BrightWhite),
];

impl Color {
    /// Parse a single colour token (already lowercased).
    ///
    /// Accepts the named colours, `purple` as an alias of `magenta`, a
    /// decimal palette index `0..=255`, and `#rrggbb`.
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(hex) = token.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        if let Ok(index) = token.parse::<u8>() {
            return Some(Self::Fixed(index));
        }

        match token {
            "purple" => Some(Self::Magenta),
            "bright-purple" => Some(Self::BrightMagenta),
            _ => NAMED
                .iter()
                .find(|(name, _)| *name == token)
                .map(|(_, color)| *color),
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    fn to_dyn(self) -> DynColors {
        match self {
            Self::Black => DynColors::Ansi(AnsiColors::Black),
            Self::Red => DynColors::Ansi(AnsiColors::Red),
            Self::Green => DynColors::Ansi(AnsiColors::Green),
            Self::Yellow => DynColors::Ansi(AnsiColors::Yellow),
            Self::Blue => DynColors::Ansi(AnsiColors::Blue),
            Self::Magenta => DynColors::Ansi(AnsiColors::Magenta),
            Self::Cyan => DynColors::Ansi(AnsiColors::Cyan),
            Self::White => DynColors::Ansi(AnsiColors::White),
            Self::BrightBlack => DynColors::Ansi(AnsiColors::BrightBlack),
            Self::BrightRed => DynColors::Ansi(AnsiColors::BrightRed),
            Self::BrightGreen => DynColors::Ansi(AnsiColors::BrightGreen),
            Self::BrightYellow => DynColors::Ansi(AnsiColors::BrightYellow),
            Self::BrightBlue => DynColors::Ansi(AnsiColors::BrightBlue),
            Self::BrightMagenta => DynColors::Ansi(AnsiColors::BrightMagenta),
            Self::BrightCyan => DynColors::Ansi(AnsiColors::BrightCyan),
            Self::BrightWhite => DynColors::Ansi(AnsiColors::BrightWhite),
            Self::Fixed(index) => DynColors::Xterm(XtermColors::from(index)),
            Self::Rgb(r, g, b) => DynColors::Rgb(r, g, b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(index) => write!(f, "{}", index),
            Self::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(_, color)| color == named)
                    .map(|(name, _)| *name)
                    .unwrap_or("white");
                f.write_str(name)
            }
        }
    }
}

/// Canonical description of a text style.
///
/// `StyleSpec::default()` has every attribute cleared; it is what an explicit
/// empty style string produces. "No style given" is modelled by the caller as
/// `Option::<StyleSpec>::None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StyleSpec {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub dimmed: bool,
    pub inverted: bool,
    pub blink: bool,
    pub strikethrough: bool,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl StyleSpec {
    /// Parse a style string.
    ///
    /// Unknown tokens are skipped so that configs written for richer
    /// terminals keep working; the last of two conflicting tokens wins.
    pub fn parse(input: &str) -> Self {
        let mut style = Self::default();

        for raw in input.split_whitespace() {
            let token = raw.to_ascii_lowercase();
            match token.as_str() {
                "bold" => style.bold = true,
                "italic" => style.italic = true,
                "underline" => style.underline = true,
                "dimmed" => style.dimmed = true,
                "inverted" => style.inverted = true,
                "blink" => style.blink = true,
                "strikethrough" => style.strikethrough = true,
                "none" => style = Self::default(),
                _ => {
                    if let Some(color) = token.strip_prefix("fg:") {
                        if let Some(slot) = Self::parse_color_slot(color, raw) {
                            style.fg = slot;
                        }
                    } else if let Some(color) = token.strip_prefix("bg:") {
                        if let Some(slot) = Self::parse_color_slot(color, raw) {
                            style.bg = slot;
                        }
                    } else if let Some(color) = Color::parse(&token) {
                        style.fg = Some(color);
                    } else {
                        trace!("Ignoring unknown style token: {}", raw);
                    }
                }
            }
        }

        style
    }

    /// `Some(None)` clears the slot, `None` leaves it untouched.
    fn parse_color_slot(color: &str, raw: &str) -> Option<Option<Color>> {
        if color == "none" {
            return Some(None);
        }
        let parsed = Color::parse(color);
        if parsed.is_none() {
            trace!("Ignoring unknown colour in style token: {}", raw);
        }
        parsed.map(Some)
    }

    /// True when painting with this style would emit no escape sequences.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Build the equivalent `owo-colors` style.
    pub fn to_owo(&self) -> owo_colors::Style {
        let mut style = owo_colors::Style::new();
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        if self.underline {
            style = style.underline();
        }
        if self.dimmed {
            style = style.dimmed();
        }
        if self.inverted {
            style = style.reversed();
        }
        if self.blink {
            style = style.blink();
        }
        if self.strikethrough {
            style = style.strikethrough();
        }
        if let Some(fg) = self.fg {
            style = style.color(fg.to_dyn());
        }
        if let Some(bg) = self.bg {
            style = style.on_color(bg.to_dyn());
        }
        style
    }

    /// Wrap `text` in the escape sequences for this style.
    ///
    /// Plain styles return the text untouched.
    pub fn paint(&self, text: &str) -> String {
        if self.is_plain() || text.is_empty() {
            return text.to_string();
        }
        self.to_owo().style(text).to_string()
    }
}

impl fmt::Display for StyleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.bold, "bold"),
            (self.italic, "italic"),
            (self.underline, "underline"),
            (self.dimmed, "dimmed"),
            (self.inverted, "inverted"),
            (self.blink, "blink"),
            (self.strikethrough, "strikethrough"),
        ];

        let mut tokens: Vec<String> = flags
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| (*name).to_string())
            .collect();
        if let Some(fg) = self.fg {
            tokens.push(format!("fg:{}", fg));
        }
        if let Some(bg) = self.bg {
            tokens.push(format!("bg:{}", bg));
        }

        f.write_str(&tokens.join(" "))
    }
}

/// Parse a style string. Free-function form of [`StyleSpec::parse`].
pub fn parse_style(input: &str) -> StyleSpec {
    StyleSpec::parse(input)
}
