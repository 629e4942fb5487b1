//! Length arithmetic in UTF-16 code units.
//!
//! Stored multi-field values carry lengths counted in UTF-16 code units, so
//! every width and offset in the codecs goes through these helpers.

/// Length of `s` in UTF-16 code units.
pub(crate) fn len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Split `s` after `units` UTF-16 code units.
///
/// Returns `None` when `s` is shorter than `units`. An offset falling inside
/// a surrogate pair keeps the whole character in the head.
pub(crate) fn split_at(s: &str, units: usize) -> Option<(&str, &str)> {
    let mut seen = 0;
    for (index, ch) in s.char_indices() {
        if seen >= units {
            return Some(s.split_at(index));
        }
        seen += ch.len_utf16();
    }
    if seen >= units {
        Some((s, ""))
    } else {
        None
    }
}
