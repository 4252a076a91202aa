// Macro pre-processor for formula source text.
//
// Applies an ordered table of regex substitutions before parsing: strips a
// single leading dialect marker (🧬) and normalizes curly quotes to their
// straight equivalents.
//
// Preconditions: none.
// Postconditions: output is parseable where the input differed only by
// macro-level glyphs; idempotent on already-clean text.
// Failure modes: none.
// Side effects: none.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// One substitution rule. Rules are applied in table order.
struct MacroRule {
    pattern: Regex,
    replacement: &'static str,
}

fn macro_table() -> &'static [MacroRule] {
    static TABLE: OnceLock<Vec<MacroRule>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            // Leading dialect marker. Anchored, so at most one is stripped.
            MacroRule {
                pattern: Regex::new("^🧬").unwrap(),
                replacement: "",
            },
            MacroRule {
                pattern: Regex::new("[\u{201C}\u{201D}]").unwrap(),
                replacement: "\"",
            },
            MacroRule {
                pattern: Regex::new("[\u{2018}\u{2019}]").unwrap(),
                replacement: "'",
            },
        ]
    })
}

/// Apply the macro substitution table to `text`.
///
/// Borrows the input unchanged when no rule matches.
pub fn replace_macros(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);
    for rule in macro_table() {
        if rule.pattern.is_match(out.as_ref()) {
            let replaced = rule
                .pattern
                .replace_all(out.as_ref(), rule.replacement)
                .into_owned();
            out = Cow::Owned(replaced);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_leading_marker() {
        assert_eq!(replace_macros("🧬getBots()"), "getBots()");
        // Only the leading marker is a macro; later ones are left alone.
        assert_eq!(replace_macros("🧬a🧬b"), "a🧬b");
    }

    #[test]
    fn normalizes_curly_quotes() {
        assert_eq!(replace_macros("getBot(“#tag”)"), "getBot(\"#tag\")");
        assert_eq!(replace_macros("getBot(‘#tag’)"), "getBot('#tag')");
    }

    #[test]
    fn clean_text_is_borrowed_unchanged() {
        let out = replace_macros("getBot(\"#tag\")");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn idempotent() {
        let once = replace_macros("🧬getBot(“#tag”)").into_owned();
        let twice = replace_macros(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_unchanged() {
        assert_eq!(replace_macros(""), "");
    }
}
