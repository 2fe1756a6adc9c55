use std::collections::HashSet;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use unicode_segmentation::UnicodeSegmentation;

use super::{ExtractiveSummarizer, ModelError, ModelResult};
use crate::ingest::split_sentences;

/// Extractive summarization by TextRank over a sentence-similarity graph.
#[derive(Debug, Clone)]
pub struct TextRankSummarizer {
    /// Damping factor (typically 0.85)
    pub damping: f64,
    pub max_iterations: usize,
    /// L1 convergence threshold
    pub threshold: f64,
}

impl Default for TextRankSummarizer {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            threshold: 1e-6,
        }
    }
}

impl TextRankSummarizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Indices of the `k` highest-scoring sentences, in document order.
    pub fn select(&self, sentences: &[String], k: usize) -> Vec<usize> {
        if sentences.len() <= k {
            return (0..sentences.len()).collect();
        }

        let graph = similarity_graph(sentences);
        let scores = self.scores(&graph);

        let mut ranked: Vec<usize> = (0..sentences.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        ranked.truncate(k);
        ranked.sort_unstable();
        ranked
    }

    fn scores(&self, graph: &UnGraph<usize, f64>) -> Vec<f64> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let totals: Vec<f64> = graph
            .node_indices()
            .map(|node| graph.edges(node).map(|e| *e.weight()).sum())
            .collect();
        let dangling: Vec<usize> = totals
            .iter()
            .enumerate()
            .filter(|&(_, &total)| total <= 0.0)
            .map(|(i, _)| i)
            .collect();

        let teleport = (1.0 - self.damping) / n as f64;
        let mut scores = vec![1.0 / n as f64; n];
        let mut next = vec![0.0; n];
        let mut delta = f64::MAX;
        let mut iterations = 0;

        while iterations < self.max_iterations && delta > self.threshold {
            iterations += 1;

            let dangling_mass: f64 = dangling.iter().map(|&d| scores[d]).sum();
            next.fill(teleport + self.damping * dangling_mass / n as f64);

            for node in graph.node_indices() {
                let i = node.index();
                if totals[i] <= 0.0 {
                    continue;
                }
                for edge in graph.edges(node) {
                    let other = if edge.source() == node {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    next[other.index()] += self.damping * scores[i] * edge.weight() / totals[i];
                }
            }

            delta = scores
                .iter()
                .zip(next.iter())
                .map(|(old, new)| (old - new).abs())
                .sum();
            std::mem::swap(&mut scores, &mut next);
        }

        tracing::trace!("TextRank finished after {} iterations (delta {:e})", iterations, delta);
        scores
    }
}

fn word_set(sentence: &str) -> HashSet<String> {
    sentence.unicode_words().map(str::to_lowercase).collect()
}

/// Shared words normalised by the log of both sentence lengths.
fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let norm = (a.len() as f64).ln() + (b.len() as f64).ln();
    if norm <= 0.0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / norm
}

fn similarity_graph(sentences: &[String]) -> UnGraph<usize, f64> {
    let words: Vec<HashSet<String>> = sentences.iter().map(|s| word_set(s)).collect();
    let mut graph = UnGraph::with_capacity(sentences.len(), sentences.len());
    let nodes: Vec<NodeIndex> = (0..sentences.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..sentences.len() {
        for j in (i + 1)..sentences.len() {
            let weight = similarity(&words[i], &words[j]);
            if weight > 0.0 {
                graph.add_edge(nodes[i], nodes[j], weight);
            }
        }
    }

    graph
}

#[async_trait::async_trait]
impl ExtractiveSummarizer for TextRankSummarizer {
    async fn rank(&self, text: &str, k: usize) -> ModelResult<Vec<String>> {
        let sentences = split_sentences(text);
        if sentences.is_empty() || k == 0 {
            return Err(ModelError::EmptyInput);
        }

        let picked = self.select(&sentences, k);
        Ok(picked.into_iter().map(|i| sentences[i].clone()).collect())
    }
}
