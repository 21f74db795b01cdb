//! Shared utility functions for the bvs crate.

/// Find balanced JSON arrays of objects (`[{...}, ...]`) embedded in text.
///
/// Candidates are returned in order of appearance. Brackets inside string
/// literals are ignored. Candidates are not validated as JSON.
pub fn json_array_candidates(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('[') {
        let start = pos + offset;
        let opens_object = text[start + 1..]
            .trim_start()
            .starts_with('{');
        if opens_object && let Some(end) = balanced_end(bytes, start) {
            candidates.push(&text[start..end]);
            pos = end;
        } else {
            pos = start + 1;
        }
    }

    candidates
}

/// Byte index just past the bracket closing the one at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
