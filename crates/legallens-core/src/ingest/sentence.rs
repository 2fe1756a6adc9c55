use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

/// Tokens that end in a period without ending the sentence.
static ABBREVIATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "inc", "ltd", "corp", "co", "llc", "l.l.c",
        "llp", "plc", "e.g", "i.e", "vs", "v", "etc", "approx", "u.s", "u.k", "p.m", "a.m", "st",
        "ave", "dept", "fig", "no", "nos", "sec", "secs", "art", "para", "cl", "ch", "cf", "al",
        "u.s.c", "c.f.r", "viz", "incl",
    ]
    .into_iter()
    .collect()
});

fn ends_with_abbreviation(segment: &str) -> bool {
    let trimmed = segment.trim_end();
    if !trimmed.ends_with('.') {
        return false;
    }

    let last = trimmed
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or(trimmed)
        .trim_start_matches(['(', '"', '\u{201c}'])
        .trim_end_matches('.')
        .to_lowercase();

    ABBREVIATIONS.contains(last.as_str())
}

/// Splits prose into sentences on Unicode sentence boundaries. Line breaks
/// are treated as spaces, and boundaries after known abbreviations are
/// dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut sentences: Vec<String> = Vec::new();
    let mut pending = String::new();

    for segment in flat.split_sentence_bounds() {
        pending.push_str(segment);
        if ends_with_abbreviation(&pending) {
            continue;
        }

        let sentence = pending.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        pending.clear();
    }

    let rest = pending.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}
