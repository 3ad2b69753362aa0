//! In-progress analysis state and the stale-result guard.
//!
//! Every image gets a fresh generation. Sub-analyses commit their result
//! with the token they were started with; once a newer image has begun,
//! older tokens no longer match and their late results are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::{
    ColorSwatch, FileDetails, FormattedEntry, GeoPoint,
    analysis::color::ColorDistribution,
    detection::{ai_likelihood::AiLikelihood, text_presence::TextPresence},
    error::{InsightError, Result},
    report::{AnalysisReport, Section},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageToken {
    generation: u64,
}

impl ImageToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionState<T> {
    Pending,
    Settled(T),
}

impl<T> SectionState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SectionState::Pending)
    }

    pub fn settled(&self) -> Option<&T> {
        match self {
            SectionState::Pending => None,
            SectionState::Settled(value) => Some(value),
        }
    }
}

/// One finished piece of an analysis.
#[derive(Debug, Clone)]
pub enum SectionUpdate {
    File(FileDetails),
    Entries(Vec<FormattedEntry>),
    Location(GeoPoint),
    ColorDistribution(Section<ColorDistribution>),
    MainColors(Section<Vec<ColorSwatch>>),
    AiLikelihood(Section<AiLikelihood>),
    TextPresence(Section<TextPresence>),
}

/// What the display sees while sections settle in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    pub image_name: Option<String>,
    pub file: SectionState<FileDetails>,
    pub entries: SectionState<Vec<FormattedEntry>>,
    pub location: SectionState<GeoPoint>,
    pub color_distribution: SectionState<Section<ColorDistribution>>,
    pub main_colors: SectionState<Section<Vec<ColorSwatch>>>,
    pub ai_likelihood: SectionState<Section<AiLikelihood>>,
    pub text_presence: SectionState<Section<TextPresence>>,
}

impl ReportDraft {
    fn new(image_name: Option<String>) -> Self {
        Self {
            image_name,
            file: SectionState::Pending,
            entries: SectionState::Pending,
            location: SectionState::Pending,
            color_distribution: SectionState::Pending,
            main_colors: SectionState::Pending,
            ai_likelihood: SectionState::Pending,
            text_presence: SectionState::Pending,
        }
    }

    fn apply(&mut self, update: SectionUpdate) {
        match update {
            SectionUpdate::File(v) => self.file = SectionState::Settled(v),
            SectionUpdate::Entries(v) => self.entries = SectionState::Settled(v),
            SectionUpdate::Location(v) => self.location = SectionState::Settled(v),
            SectionUpdate::ColorDistribution(v) => self.color_distribution = SectionState::Settled(v),
            SectionUpdate::MainColors(v) => self.main_colors = SectionState::Settled(v),
            SectionUpdate::AiLikelihood(v) => self.ai_likelihood = SectionState::Settled(v),
            SectionUpdate::TextPresence(v) => self.text_presence = SectionState::Settled(v),
        }
    }

    pub fn pending_sections(&self) -> Vec<&'static str> {
        [
            ("file", self.file.is_pending()),
            ("entries", self.entries.is_pending()),
            ("location", self.location.is_pending()),
            ("color distribution", self.color_distribution.is_pending()),
            ("main colors", self.main_colors.is_pending()),
            ("AI likelihood", self.ai_likelihood.is_pending()),
            ("text presence", self.text_presence.is_pending()),
        ]
        .into_iter()
        .filter(|(_, pending)| *pending)
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_sections().is_empty()
    }

    fn assemble(&self) -> Result<AnalysisReport> {
        let pending = self.pending_sections();
        if !pending.is_empty() {
            return Err(InsightError::IncompleteReport(pending.join(", ")));
        }

        let incomplete = || InsightError::IncompleteReport("unknown section".into());

        Ok(AnalysisReport {
            file: self.file.settled().ok_or_else(incomplete)?.clone(),
            entries: self.entries.settled().ok_or_else(incomplete)?.clone(),
            location: self.location.settled().ok_or_else(incomplete)?.clone(),
            color_distribution: self.color_distribution.settled().ok_or_else(incomplete)?.clone(),
            main_colors: self.main_colors.settled().ok_or_else(incomplete)?.clone(),
            ai_likelihood: self.ai_likelihood.settled().ok_or_else(incomplete)?.clone(),
            text_presence: self.text_presence.settled().ok_or_else(incomplete)?.clone(),
        })
    }
}

struct SessionState {
    generation: u64,
    draft: ReportDraft,
}

pub struct AnalysisSession {
    generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: Mutex::new(SessionState {
                generation: 0,
                draft: ReportDraft::new(None),
            }),
        }
    }

    /// Starts a new image. Everything committed for earlier tokens is
    /// discarded and their future commits are ignored.
    pub fn begin(&self, image_name: &str) -> ImageToken {
        let mut state = self.state.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        state.generation = generation;
        state.draft = ReportDraft::new(Some(image_name.to_string()));

        ImageToken { generation }
    }

    /// Clears all state, e.g. when the user resets the view.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        state.generation = generation;
        state.draft = ReportDraft::new(None);
    }

    /// Drops the state of `token`'s image if it is still the current one.
    pub fn cancel(&self, token: &ImageToken) {
        if self.is_current(token) {
            self.reset();
        }
    }

    pub fn is_current(&self, token: &ImageToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.generation
    }

    /// Records a finished section. Returns `false` if the token is stale.
    pub fn commit(&self, token: &ImageToken, update: SectionUpdate) -> bool {
        let mut state = self.state.lock();

        if state.generation != token.generation {
            debug!(
                "Discarding stale result from generation {} (current {})",
                token.generation, state.generation
            );
            return false;
        }

        state.draft.apply(update);
        true
    }

    pub fn snapshot(&self) -> ReportDraft {
        self.state.lock().draft.clone()
    }

    /// The finished report for `token`, once every section has settled.
    pub fn finish(&self, token: &ImageToken) -> Result<AnalysisReport> {
        let state = self.state.lock();

        if state.generation != token.generation {
            return Err(InsightError::Superseded);
        }

        state.draft.assemble()
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::color::ColorShare;

    fn distribution(rgb: [u8; 3]) -> Section<ColorDistribution> {
        Section::ready(ColorDistribution {
            total_pixels: 1,
            shares: vec![ColorShare {
                swatch: ColorSwatch(rgb),
                percentage: 100.0,
                count: 1,
            }],
        })
    }

    fn settle_all(session: &AnalysisSession, token: &ImageToken) {
        let updates = vec![
            SectionUpdate::File(FileDetails {
                name: "b.png".into(),
                size: 10,
                size_formatted: "10.00 Bytes".into(),
                mime_type: "image/png".into(),
                width: 1,
                height: 1,
            }),
            SectionUpdate::Entries(vec![]),
            SectionUpdate::Location(GeoPoint::default()),
            SectionUpdate::ColorDistribution(distribution([0, 0, 255])),
            SectionUpdate::MainColors(Section::ready(vec![])),
            SectionUpdate::AiLikelihood(Section::unavailable("none")),
            SectionUpdate::TextPresence(Section::unavailable("none")),
        ];
        for update in updates {
            assert!(session.commit(token, update));
        }
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let session = AnalysisSession::new();
        let a = session.begin("a.png");
        let b = session.begin("b.png");

        assert!(!session.commit(&a, SectionUpdate::ColorDistribution(distribution([255, 0, 0]))));

        let draft = session.snapshot();
        assert_eq!(draft.image_name.as_deref(), Some("b.png"));
        assert!(draft.color_distribution.is_pending());

        assert!(session.commit(&b, SectionUpdate::ColorDistribution(distribution([0, 0, 255]))));
        assert_eq!(
            session.snapshot().color_distribution,
            SectionState::Settled(distribution([0, 0, 255]))
        );
    }

    #[test]
    fn test_finish_requires_all_sections() {
        let session = AnalysisSession::new();
        let token = session.begin("b.png");
        session.commit(&token, SectionUpdate::Entries(vec![]));
        assert!(!session.snapshot().is_complete());

        match session.finish(&token) {
            Err(InsightError::IncompleteReport(pending)) => {
                assert!(pending.contains("color distribution"));
                assert!(!pending.contains("entries"));
            }
            other => panic!("expected incomplete report, got {:?}", other),
        }

        settle_all(&session, &token);
        assert!(session.snapshot().is_complete());
        let report = session.finish(&token).unwrap();
        assert_eq!(report.file.name, "b.png");
    }

    #[test]
    fn test_superseded_token_cannot_finish() {
        let session = AnalysisSession::new();
        let a = session.begin("a.png");
        settle_all(&session, &a);
        session.begin("b.png");

        assert!(matches!(session.finish(&a), Err(InsightError::Superseded)));
    }

    #[test]
    fn test_reset_and_cancel() {
        let session = AnalysisSession::new();
        let a = session.begin("a.png");
        session.reset();

        assert!(!session.is_current(&a));
        assert!(session.snapshot().image_name.is_none());
        assert_eq!(session.snapshot().pending_sections().len(), 7);

        let b = session.begin("b.png");
        let c = session.begin("c.png");
        session.cancel(&b);
        assert!(session.is_current(&c));

        session.cancel(&c);
        assert!(!session.is_current(&c));
    }
}
