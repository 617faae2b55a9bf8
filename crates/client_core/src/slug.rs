//! Title to slug derivation.

/// Maps a title to a URL-safe identifier.
///
/// The input is lowercased and trimmed, every character outside
/// `[a-z0-9]`, whitespace and `-` is dropped, and each whitespace run becomes
/// a single `-`. An empty or fully stripped title yields an empty slug; callers
/// decide whether that is acceptable.
pub fn generate(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for ch in lowered.trim().chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-') {
            continue;
        }
        if in_whitespace {
            slug.push('-');
            in_whitespace = false;
        }
        slug.push(ch);
    }

    // A whitespace run is collapsed even when nothing kept follows it.
    if in_whitespace {
        slug.push('-');
    }

    slug
}

#[cfg(test)]
#[path = "tests/slug_tests.rs"]
mod tests;
