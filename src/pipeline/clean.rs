//! Text cleanup: deterministic normalisation of extracted text runs.
//!
//! PDF text layers from exam-export tools carry artefacts that break the
//! line-shape rules downstream: `ﬁ` ligatures inside words, non-breaking
//! spaces between an option letter and its text, zero-width joiners, stray
//! carriage returns inside a run. Each rule below is a pure `&str → String`
//! pass so it can be tested on its own.
//!
//! ## Rule Order
//!
//! Line breaks and exotic spaces become plain spaces before the final
//! collapse, and invisible characters go before ligature expansion so a
//! zero-width joiner between two ligatures cannot survive.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one fragment of extracted text.
///
/// Rules (applied in order):
/// 1. Line breaks and tabs → space
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 3. Expand typographic ligatures (`ﬁ` → `fi`)
/// 4. Unicode space variants → ASCII space
/// 5. Collapse whitespace runs and trim
pub fn clean_text(input: &str) -> String {
    let s = flatten_line_breaks(input);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = normalise_spaces(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Line breaks ──────────────────────────────────────────────────────

fn flatten_line_breaks(input: &str) -> String {
    input.replace(['\r', '\n', '\t'], " ")
}

// ── Rule 2: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Ligatures ────────────────────────────────────────────────────────

fn expand_ligatures(input: &str) -> String {
    if !input.chars().any(|c| ('\u{FB00}'..='\u{FB06}').contains(&c)) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{FB05}' | '\u{FB06}' => out.push_str("st"),
            other => out.push(other),
        }
    }
    out
}

// ── Rule 4: Space variants ───────────────────────────────────────────────────

fn normalise_spaces(input: &str) -> String {
    input.replace(
        [
            '\u{00A0}', '\u{2002}', '\u{2003}', '\u{2007}', '\u{2009}', '\u{202F}', '\u{3000}',
        ],
        " ",
    )
}

// ── Rule 5: Collapse whitespace ──────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_SPACES.replace_all(input.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_line_breaks() {
        assert_eq!(flatten_line_breaks("a\r\nb\tc"), "a  b c");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "Ex\u{200B}hibit\u{FEFF} A\u{00AD}";
        assert_eq!(remove_invisible_chars(input), "Exhibit A");
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("con\u{FB01}gure the \u{FB02}ow"), "configure the flow");
        assert_eq!(expand_ligatures("plain"), "plain");
    }

    #[test]
    fn test_normalise_spaces() {
        assert_eq!(normalise_spaces("A.\u{00A0}Option"), "A. Option");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b  "), "a b");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let input = " b)\u{00A0}\u{00A0}Use a \u{FB01}rewall\r\n rule\u{200B} ";
        assert_eq!(clean_text(input), "b) Use a firewall rule");
    }
}
