//! Pipeline stages and per-stage timings.

use std::fmt;
use std::time::Duration;

use crate::error::FailureKind;

/// One of the five fixed pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Validate,
    PreConvert,
    Intercept,
    Invoke,
    PostConvert,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Validate,
        Stage::PreConvert,
        Stage::Intercept,
        Stage::Invoke,
        Stage::PostConvert,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::PreConvert => "pre_convert",
            Self::Intercept => "intercept",
            Self::Invoke => "invoke",
            Self::PostConvert => "post_convert",
        }
    }

    /// Category assigned to an untyped collaborator error raised in this stage.
    #[must_use]
    pub const fn failure_kind(self) -> FailureKind {
        match self {
            Self::Validate => FailureKind::Validation,
            Self::PreConvert | Self::PostConvert => FailureKind::Conversion,
            Self::Intercept => FailureKind::Intercept,
            Self::Invoke => FailureKind::ServiceInvocation,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of completed stage segments for one call.
///
/// A segment is appended only once its stage has finished, so there is never
/// a running segment to stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTimings {
    segments: Vec<(Stage, Duration)>,
}

impl StageTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.segments.push((stage, elapsed));
    }

    #[must_use]
    pub fn segments(&self) -> &[(Stage, Duration)] {
        &self.segments
    }

    /// Stages in the order they were recorded.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.segments.iter().map(|(stage, _)| *stage)
    }

    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.segments
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, elapsed)| *elapsed)
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.segments.iter().map(|(_, elapsed)| *elapsed).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (stage, elapsed) in &self.segments {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{stage}={}us", elapsed.as_micros())?;
        }
        Ok(())
    }
}
