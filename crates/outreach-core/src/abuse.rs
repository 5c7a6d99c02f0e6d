//! Abuse detector: flags abusive language in patient transcript turns.
//!
//! Pure and idempotent: the same transcript always yields the same answer.
//! Only patient turns are scanned (the agent's own words never trigger a
//! flag). Matching is case-insensitive and tolerates single-character symbol
//! obfuscation ("sh*t", "f#ck"). False positives are fine — they just route
//! a call to human review; false negatives are the costly direction, so the
//! pattern list errs broad and lives in one tunable constant.

use crate::domain::{Speaker, TranscriptTurn};

/// Lexical patterns checked against normalized patient text.
///
/// Maintained as data, not logic: tune this list, not the scanner.
const ABUSE_PATTERNS: &[&str] = &[
    "fuck",
    "shit",
    "bitch",
    "asshole",
    "bastard",
    "cunt",
    "dick",
    "piss off",
    "go to hell",
    "idiot",
    "stupid",
    "moron",
    "kill you",
    "hurt you",
    "sue you",
    "hate you",
    "shut up",
];

/// Scan a transcript for abusive language from the patient side.
pub fn detect(turns: &[TranscriptTurn]) -> bool {
    turns
        .iter()
        .filter(|t| t.speaker == Speaker::Patient)
        .any(|t| text_is_abusive(&t.text))
}

fn text_is_abusive(text: &str) -> bool {
    let normalized = normalize(text);
    ABUSE_PATTERNS
        .iter()
        .any(|pattern| contains_obfuscated(&normalized, pattern))
}

/// Lowercase and collapse whitespace runs to single spaces.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substring match where any single pattern character may have been replaced
/// by a symbol (e.g. "sh*t" still matches "shit").
fn contains_obfuscated(haystack: &str, pattern: &str) -> bool {
    let hay: Vec<char> = haystack.chars().collect();
    let pat: Vec<char> = pattern.chars().collect();
    if pat.is_empty() || hay.len() < pat.len() {
        return false;
    }

    'outer: for start in 0..=(hay.len() - pat.len()) {
        let mut substitutions = 0;
        for (i, &p) in pat.iter().enumerate() {
            let h = hay[start + i];
            if h == p {
                continue;
            }
            // Allow one non-alphanumeric stand-in per match window.
            if !h.is_alphanumeric() && substitutions == 0 {
                substitutions = 1;
                continue;
            }
            continue 'outer;
        }
        return true;
    }
    false
}
