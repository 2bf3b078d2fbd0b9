//! Strict template label parser.

use crate::domain::{CONTROL_MARKER, EXPERIMENTAL_MARKER, WellLabel};

/// Parse one template cell.
///
/// Accepted forms (after trimming whitespace, case-sensitive): `C`, `E`,
/// `C<n>`, `E<n>` with `n >= 1`. A blank cell is `WellLabel::Empty`; any other
/// text is `WellLabel::Unrecognized`.
pub fn parse_label(raw: &str) -> WellLabel {
    let s = raw.trim();
    let mut chars = s.chars();
    let Some(marker) = chars.next() else {
        return WellLabel::Empty;
    };
    let rest = chars.as_str();

    let is_control = marker == CONTROL_MARKER;
    if !is_control && marker != EXPERIMENTAL_MARKER {
        return WellLabel::Unrecognized(s.to_string());
    }

    if rest.is_empty() {
        return if is_control {
            WellLabel::PlainControl
        } else {
            WellLabel::PlainExperimental
        };
    }

    // Only plain ASCII digits; `str::parse` would also accept a leading `+`.
    if !rest.bytes().all(|b| b.is_ascii_digit()) {
        return WellLabel::Unrecognized(s.to_string());
    }
    match rest.parse::<u32>() {
        Ok(n) if n >= 1 => {
            if is_control {
                WellLabel::GroupedControl(n)
            } else {
                WellLabel::GroupedExperimental(n)
            }
        }
        _ => WellLabel::Unrecognized(s.to_string()),
    }
}
