use regex::Regex;
use std::sync::LazyLock;

use super::rules::{word_count, ClauseRules};
use super::sentence::split_sentences;
use crate::clause::Clause;

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\.\d+)\.?\s+(\S.*?)\s*$").expect("valid heading pattern")
});

static INLINE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\.\d+)\.?\s+([^.:;,!?]+?)[.:]\s+(\S.*)$")
        .expect("valid inline heading pattern")
});

/// Lowercase words allowed inside a title-cased heading.
const TITLE_JOINERS: [&str; 8] = ["and", "of", "or", "the", "to", "for", "in", "on"];

/// Longest inline title, in words. Longer runs are treated as prose.
const INLINE_HEADING_MAX_WORDS: usize = 4;

/// Longest title, in words, that still reads as a heading rather than prose.
const HEADING_MAX_WORDS: usize = 8;

/// A run of text under the nearest preceding numbered heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionChunk {
    pub heading: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    section: Option<String>,
    text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub sections: usize,
    pub candidates: usize,
    pub merged: usize,
    pub clauses: usize,
}

fn heading_of(line: &str) -> Option<String> {
    let caps = NUMBERED_HEADING.captures(line)?;
    let number = &caps[1];
    let title = &caps[2];

    let words = word_count(title);
    if words > HEADING_MAX_WORDS {
        return None;
    }

    let title = match title.chars().last() {
        Some(';' | ',' | '!' | '?') => return None,
        Some('.') if words > 4 || title[..title.len() - 1].contains('.') => return None,
        Some('.' | ':') => &title[..title.len() - 1],
        _ if title.contains(". ") => return None,
        _ => title,
    };

    Some(format!("{number} {}", title.trim_end()))
}

/// A heading sharing its line with body text, e.g. `1.1 Term. This Agreement ...`.
/// Returns the heading and the remaining body.
fn inline_heading_of(line: &str) -> Option<(String, &str)> {
    let caps = INLINE_HEADING.captures(line)?;
    let title = caps.get(2)?.as_str().trim();

    let words: Vec<&str> = title.split_whitespace().collect();
    if words.is_empty() || words.len() > INLINE_HEADING_MAX_WORDS {
        return None;
    }
    let title_cased = words.iter().enumerate().all(|(i, word)| {
        word.chars().next().is_some_and(char::is_uppercase)
            || (i > 0 && TITLE_JOINERS.contains(word))
    });
    if !title_cased {
        return None;
    }

    let body = caps.get(3)?.as_str();
    Some((format!("{} {title}", &caps[1]), body))
}

/// Partitions text on line-anchored `X.Y Title` headings. Text before the
/// first heading forms a chunk without context.
pub fn split_sections(text: &str) -> Vec<SectionChunk> {
    let mut sections = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut current_body = String::new();

    for line in text.lines() {
        if let Some(heading) = heading_of(line) {
            if !current_body.trim().is_empty() || current_heading.is_some() {
                sections.push(SectionChunk {
                    heading: current_heading.take(),
                    body: std::mem::take(&mut current_body),
                });
            }
            current_heading = Some(heading);
            current_body.clear();
        } else if let Some((heading, body)) = inline_heading_of(line) {
            if !current_body.trim().is_empty() || current_heading.is_some() {
                sections.push(SectionChunk {
                    heading: current_heading.take(),
                    body: std::mem::take(&mut current_body),
                });
            }
            current_heading = Some(heading);
            current_body.clear();
            current_body.push_str(body);
        } else {
            if !current_body.is_empty() {
                current_body.push('\n');
            }
            current_body.push_str(line);
        }
    }

    if !current_body.trim().is_empty() || current_heading.is_some() {
        sections.push(SectionChunk {
            heading: current_heading,
            body: current_body,
        });
    }

    sections
}

/// Splits normalized contract text into clauses in document order.
#[derive(Debug, Clone, Default)]
pub struct ClauseSegmenter {
    rules: ClauseRules,
}

impl ClauseSegmenter {
    #[must_use]
    pub fn new(rules: ClauseRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClauseRules {
        &self.rules
    }

    pub fn segment(&self, text: &str) -> Vec<Clause> {
        self.segment_with_stats(text).0
    }

    pub fn segment_with_stats(&self, text: &str) -> (Vec<Clause>, SegmentStats) {
        let sections = split_sections(text);
        let candidates = self.candidates(&sections);
        let candidate_count = candidates.len();
        let merged = self.merge(candidates);

        let clauses: Vec<Clause> = merged
            .into_iter()
            .filter(|c| self.rules.is_valid(&c.text))
            .enumerate()
            .map(|(index, c)| Clause::new(index, c.text).with_section(c.section))
            .collect();

        let stats = SegmentStats {
            sections: sections.len(),
            candidates: candidate_count,
            merged: candidate_count.saturating_sub(clauses.len()),
            clauses: clauses.len(),
        };

        tracing::debug!(
            "Segmented {} sections into {} candidates and {} clauses",
            stats.sections,
            stats.candidates,
            stats.clauses
        );

        (clauses, stats)
    }

    fn candidates(&self, sections: &[SectionChunk]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for section in sections {
            for sentence in split_sentences(&section.body) {
                if !self.rules.is_valid(&sentence) {
                    continue;
                }

                let text = match &section.heading {
                    Some(heading) if !sentence.starts_with(&format!("{heading}:")) => {
                        format!("{heading}: {sentence}")
                    }
                    _ => sentence,
                };

                candidates.push(Candidate {
                    section: section.heading.clone(),
                    text,
                });
            }
        }

        candidates
    }

    /// Recombines fragments with their neighbours. A buffered run is emitted
    /// on its own when it is complete by itself, otherwise it is prefixed to
    /// the candidate that completes it. Only the final remainder may still be
    /// a fragment.
    fn merge(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut merged = Vec::with_capacity(candidates.len());
        let mut buffer: Vec<Candidate> = Vec::new();

        for mut candidate in candidates {
            if self.rules.is_fragment(&candidate.text) {
                buffer.push(candidate);
                continue;
            }

            if let Some(flushed) = join_buffer(&mut buffer) {
                if self.rules.is_fragment(&flushed.text) {
                    candidate.text = format!("{} {}", flushed.text, candidate.text);
                    candidate.section = flushed.section;
                } else {
                    merged.push(flushed);
                }
            }
            merged.push(candidate);
        }

        if let Some(rest) = join_buffer(&mut buffer) {
            merged.push(rest);
        }

        merged
    }
}

fn join_buffer(buffer: &mut Vec<Candidate>) -> Option<Candidate> {
    if buffer.is_empty() {
        return None;
    }

    let section = buffer[0].section.clone();
    let text = buffer
        .drain(..)
        .map(|c| c.text)
        .collect::<Vec<_>>()
        .join(" ");

    Some(Candidate { section, text })
}
