//! Tag codec
//!
//! An entry's tags are stored as a single text column: `name:color` pairs
//! joined with commas, e.g. `travel:#ff5555,work:#5599ff`. This module is
//! the only place that knows that representation.
//!
//! Decoding is lenient. A fragment that does not split into exactly two
//! `:`-separated components is dropped rather than failing the read.

use crate::models::Tag;

/// Separates tags in the encoded string
pub const TAG_SEPARATOR: char = ',';

/// Separates a tag's name from its color
pub const PAIR_SEPARATOR: char = ':';

/// Color used when none is given
pub const DEFAULT_COLOR: &str = "#5599ff";

/// Named colors offered for tags
pub const PALETTE: &[(&str, &str)] = &[
    ("Red", "#ff5555"),
    ("Blue", "#5599ff"),
    ("Green", "#55cc55"),
    ("Purple", "#9955dd"),
    ("Orange", "#ff9955"),
    ("Yellow", "#ffdd55"),
    ("Pink", "#ff55aa"),
    ("Cyan", "#55dddd"),
    ("Gray", "#999999"),
    ("Black", "#333333"),
];

/// Encode tags into their persisted form
pub fn encode(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| format!("{}{}{}", tag.name, PAIR_SEPARATOR, tag.color))
        .collect::<Vec<_>>()
        .join(&TAG_SEPARATOR.to_string())
}

/// Decode a persisted tag string, silently dropping malformed fragments
pub fn decode(encoded: &str) -> Vec<Tag> {
    decode_lossy(encoded).tags
}

/// Result of decoding with the rejected fragments kept for reporting
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Decoded {
    pub tags: Vec<Tag>,
    /// Fragments that were not a `name:color` pair
    pub rejected: Vec<String>,
}

/// Decode a persisted tag string, collecting malformed fragments
pub fn decode_lossy(encoded: &str) -> Decoded {
    let mut decoded = Decoded::default();

    for fragment in encoded.split(TAG_SEPARATOR) {
        if fragment.trim().is_empty() {
            continue;
        }
        match parse_fragment(fragment) {
            Some(tag) => decoded.tags.push(tag),
            None => decoded.rejected.push(fragment.to_string()),
        }
    }

    decoded
}

/// Parse one `name:color` fragment
///
/// Returns `None` unless the fragment has exactly two components and the
/// color is not blank.
pub fn parse_fragment(fragment: &str) -> Option<Tag> {
    let mut parts = fragment.split(PAIR_SEPARATOR);
    let name = parts.next()?;
    let color = parts.next()?.trim();
    if parts.next().is_some() || color.is_empty() {
        return None;
    }
    Some(Tag::new(name.trim(), color))
}

/// Parse user input: `name`, `name:color` or `name:ColorLabel`
///
/// Palette labels are resolved to their hex token. A bare name gets
/// [`DEFAULT_COLOR`].
pub fn parse_input(input: &str) -> Option<Tag> {
    let input = input.trim();
    if input.is_empty() || input.contains(TAG_SEPARATOR) {
        return None;
    }

    if !input.contains(PAIR_SEPARATOR) {
        return Some(Tag::new(input, DEFAULT_COLOR));
    }

    let tag = parse_fragment(input)?;
    if tag.name.is_empty() {
        return None;
    }
    let color = color_for_label(&tag.color)
        .map(str::to_string)
        .unwrap_or(tag.color);
    Some(Tag::new(tag.name, color))
}

/// Resolve a palette label (case-insensitive) to its color token
pub fn color_for_label(label: &str) -> Option<&'static str> {
    PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, color)| *color)
}
