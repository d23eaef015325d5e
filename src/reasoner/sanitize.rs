//! Symptom-input sanitization.
//!
//! Patient narratives are embedded verbatim into reasoner prompts, so
//! they are scrubbed before leaving the process: invisible Unicode and
//! control characters out, known prompt-injection phrases neutralized,
//! angle brackets stripped, and the whole thing capped at a fixed
//! length. Applied to every narrative exactly once, at the client.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum symptom narrative length in bytes.
pub const MAX_SYMPTOM_LENGTH: usize = 2_000;

/// Sanitize a symptom narrative before it reaches the reasoner.
pub fn sanitize_for_reasoner(raw: &str) -> String {
    let text = remove_invisible_unicode(raw);
    let text = remove_control_characters(&text);
    let text = remove_injection_patterns(&text);
    let text = strip_angle_brackets(&text);
    let clean = truncate_at_word_boundary(&text, MAX_SYMPTOM_LENGTH);
    if clean != raw {
        tracing::debug!(
            original_len = raw.len(),
            clean_len = clean.len(),
            "Sanitized symptom narrative"
        );
    }
    clean
}

/// Remove zero-width and invisible Unicode characters.
fn remove_invisible_unicode(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200F}'  // Zero-width chars
                | '\u{202A}'..='\u{202E}' // Directional formatting
                | '\u{2060}'..='\u{2064}' // Invisible operators
                | '\u{2066}'..='\u{2069}' // Directional isolates
                | '\u{FEFF}'              // BOM
                | '\u{00AD}'              // Soft hyphen
                | '\u{034F}'              // Combining grapheme joiner
                | '\u{061C}'              // Arabic letter mark
                | '\u{180E}'              // Mongolian vowel separator
            )
        })
        .collect()
}

/// Remove control characters except newline and tab.
fn remove_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Remove known prompt injection patterns, replacing with [FILTERED].
fn remove_injection_patterns(text: &str) -> String {
    static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        vec![
            // Role override attempts
            Regex::new(r"(?i)ignore\s+(?:previous|above|all\s+prior|the\s+above)\s+(?:instructions?|rules?|prompts?)").unwrap(),
            Regex::new(r"(?i)forget\s+(?:everything|all|your)\s+(?:previous|prior)?").unwrap(),
            Regex::new(r"(?i)new\s+instructions?:").unwrap(),
            Regex::new(r"(?i)you\s+are\s+now\s+(?:a|an)\s+").unwrap(),
            // System/role tags
            Regex::new(r"(?i)system\s*:").unwrap(),
            Regex::new(r"(?i)assistant\s*:").unwrap(),
            Regex::new(r"<<SYS>>").unwrap(),
            Regex::new(r"\[INST\]").unwrap(),
            Regex::new(r"<\|im_start\|>").unwrap(),
            Regex::new(r"<\|im_end\|>").unwrap(),
            // Verdict steering
            Regex::new(r"(?i)(?:always|must)\s+(?:answer|respond|triage)\s+(?:GREEN|YELLOW|RED)").unwrap(),
        ]
    });

    let mut result = text.to_string();
    for pattern in INJECTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, "[FILTERED]").to_string();
    }
    result
}

/// Drop angle brackets so narrative text cannot open or close prompt
/// delimiter tags. Runs after pattern filtering, which matches on
/// bracketed tags itself.
fn strip_angle_brackets(text: &str) -> String {
    text.chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Truncate text at a word boundary, never mid-codepoint.
fn truncate_at_word_boundary(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(pos) => truncated[..pos].to_string(),
        None => truncated.to_string(),
    }
}
