use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::AnalysisConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisState {
    Idle,
    Loaded,
    Segmented,
    Enriched,
    Summarized,
    Complete,
    Failed,
}

impl AnalysisState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Segmented => "segmented",
            Self::Enriched => "enriched",
            Self::Summarized => "summarized",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Forward edges only. `Failed` is entered from the stages that can
    /// raise blocking errors: loading (from `Idle`) and segmentation (from
    /// `Loaded`).
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Loaded)
                | (Self::Loaded, Self::Segmented)
                | (Self::Segmented, Self::Enriched)
                | (Self::Enriched, Self::Summarized)
                | (Self::Summarized, Self::Complete)
                | (Self::Idle | Self::Loaded, Self::Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one analysis request carries between stages. Created per
/// request and never shared.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    source: Option<PathBuf>,
    config: AnalysisConfig,
    state: AnalysisState,
    started: Instant,
    last_transition: Instant,
    timings: Vec<(AnalysisState, Duration)>,
    failure: Option<String>,
}

impl AnalysisContext {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let now = Instant::now();
        Self {
            source: None,
            config,
            state: AnalysisState::Idle,
            started: now,
            last_transition: now,
            timings: Vec::new(),
            failure: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Moves to `next`, recording how long the previous stage took.
    pub fn advance(&mut self, next: AnalysisState) -> crate::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let now = Instant::now();
        self.timings.push((next, now - self.last_transition));
        self.last_transition = now;

        tracing::debug!("Analysis {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> crate::Result<()> {
        self.advance(AnalysisState::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time spent reaching each state, in the order the states were entered.
    pub fn stage_timings(&self) -> &[(AnalysisState, Duration)] {
        &self.timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [AnalysisState; 5] = [
        AnalysisState::Loaded,
        AnalysisState::Segmented,
        AnalysisState::Enriched,
        AnalysisState::Summarized,
        AnalysisState::Complete,
    ];

    #[test]
    fn test_happy_path() {
        let mut ctx = AnalysisContext::new(AnalysisConfig::default()).with_source("a.txt");
        for state in HAPPY_PATH {
            ctx.advance(state).unwrap();
        }

        assert_eq!(ctx.state(), AnalysisState::Complete);
        assert!(ctx.state().is_terminal());
        assert_eq!(ctx.stage_timings().len(), 5);
        assert_eq!(ctx.source(), Some(Path::new("a.txt")));
    }

    #[test]
    fn test_rejects_skipped_stage() {
        let mut ctx = AnalysisContext::new(AnalysisConfig::default());
        let err = ctx.advance(AnalysisState::Segmented).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::InvalidTransition {
                from: AnalysisState::Idle,
                to: AnalysisState::Segmented
            }
        ));
        assert_eq!(err.to_string(), "Invalid pipeline transition: idle -> segmented");
        assert_eq!(ctx.state(), AnalysisState::Idle);
    }

    #[test]
    fn test_failure_only_from_blocking_stages() {
        let mut ctx = AnalysisContext::new(AnalysisConfig::default());
        ctx.advance(AnalysisState::Loaded).unwrap();
        ctx.fail("no clauses").unwrap();
        assert_eq!(ctx.state(), AnalysisState::Failed);
        assert_eq!(ctx.failure(), Some("no clauses"));
        assert!(ctx.advance(AnalysisState::Segmented).is_err());

        let mut ctx = AnalysisContext::new(AnalysisConfig::default());
        ctx.advance(AnalysisState::Loaded).unwrap();
        ctx.advance(AnalysisState::Segmented).unwrap();
        assert!(ctx.fail("too late").is_err());
        assert_eq!(ctx.failure(), None);
    }

    #[test]
    fn test_complete_is_final() {
        let mut ctx = AnalysisContext::new(AnalysisConfig::default());
        for state in HAPPY_PATH {
            ctx.advance(state).unwrap();
        }
        for state in HAPPY_PATH {
            assert!(ctx.advance(state).is_err());
        }
        assert!(ctx.advance(AnalysisState::Idle).is_err());
    }
}
