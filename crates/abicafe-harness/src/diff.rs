//! Diff rendering for captured bytes.

use abicafe_capture::hex;

const CHUNK: usize = 16;

/// Render a hex diff between expected and actual bytes, one line per
/// 16-byte chunk that differs.
#[must_use]
pub fn render_bytes_diff(expected: &[u8], actual: &[u8]) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    let chunks = expected.len().max(actual.len()).div_ceil(CHUNK);
    for i in 0..chunks {
        let e = chunk(expected, i);
        let a = chunk(actual, i);
        if e != a {
            out.push_str(&format!("@@ byte {} @@\n", i * CHUNK));
            out.push_str(&format!("-{}\n", spaced(e)));
            out.push_str(&format!("+{}\n", spaced(a)));
        }
    }
    out
}

fn chunk(bytes: &[u8], index: usize) -> &[u8] {
    let start = (index * CHUNK).min(bytes.len());
    let end = (start + CHUNK).min(bytes.len());
    &bytes[start..end]
}

fn spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode(&[*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes() {
        assert_eq!(render_bytes_diff(&[1, 2], &[1, 2]), "[identical]");
    }

    #[test]
    fn only_differing_chunks_are_shown() {
        let expected: Vec<u8> = (0..32).collect();
        let mut actual = expected.clone();
        actual[20] = 0xff;
        let diff = render_bytes_diff(&expected, &actual);
        assert!(diff.starts_with("--- expected\n+++ actual\n"));
        assert!(diff.contains("@@ byte 16 @@"));
        assert!(!diff.contains("@@ byte 0 @@"));
        assert!(diff.contains("+10 11 12 13 ff 15"));
    }

    #[test]
    fn length_difference_shows_missing_tail() {
        let diff = render_bytes_diff(&[0xaa, 0xbb], &[0xaa]);
        assert_eq!(diff, "--- expected\n+++ actual\n@@ byte 0 @@\n-aa bb\n+aa\n");
    }
}
