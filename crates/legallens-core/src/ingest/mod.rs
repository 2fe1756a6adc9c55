mod enrich;
mod normalizer;
mod parser;
mod pipeline;
mod rules;
mod segmenter;
mod sentence;
mod state;
pub mod summary;

pub use enrich::{EnrichStats, Enriched, EnrichmentOrchestrator};
pub use normalizer::{normalize, scrub_summary, tidy_inline, REDACTED};
pub use parser::{
    CompositeParser, DocumentFormat, DocxParser, ParseError, ParseResult, ParsedDocument, Parser,
    PdfParser, PlainTextParser, TEXT_ENCODINGS,
};
pub use pipeline::AnalysisPipeline;
pub use rules::{word_count, ClauseRules};
pub use segmenter::{split_sections, ClauseSegmenter, SectionChunk, SegmentStats};
pub use sentence::split_sentences;
pub use state::{AnalysisContext, AnalysisState};
pub use summary::Summarizer;
