//! Directive log and per-sample-time resolution.
//!
//! `play` appends directives at the cursor without moving it; `wait` moves the cursor without
//! appending anything. Start times therefore never decrease in issuance order except through
//! [`Timeline::play_at`], which schedules relative to the previous `play` and may land past the
//! cursor.

use crate::animation::anim::Animation;
use crate::animation::ease::Ease;
use crate::foundation::error::{TradeanimError, TradeanimResult};

/// A scheduled animation; immutable once issued.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// What runs.
    pub animation: Animation,
    /// Absolute start in seconds.
    pub start_time: f64,
    /// Length in seconds; zero snaps to the end state.
    pub duration: f64,
    /// Curve applied to raw progress.
    pub ease: Ease,
}

impl Directive {
    /// Absolute end in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration.max(0.0)
    }

    /// Raw progress at `t`, or `None` before the start.
    ///
    /// Zero-length directives are complete as soon as they start.
    pub fn raw_progress(&self, t: f64) -> Option<f64> {
        if t < self.start_time {
            return None;
        }
        if self.duration <= 0.0 {
            return Some(1.0);
        }
        Some(((t - self.start_time) / self.duration).clamp(0.0, 1.0))
    }
}

/// A directive resolved at one sample time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved<'a> {
    /// Issuance index.
    pub index: usize,
    /// The directive.
    pub directive: &'a Directive,
    /// Raw progress in `[0, 1]`.
    pub progress: f64,
    /// The directive's interval has passed; it holds its end state.
    pub settled: bool,
}

impl Resolved<'_> {
    /// Progress passed through the directive's ease.
    pub fn eased(&self) -> f64 {
        self.directive.ease.apply(self.progress)
    }
}

/// Ordered directive log plus the scheduling cursor.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    directives: Vec<Directive>,
    cursor: f64,
    last_play_start: f64,
}

fn check_secs(what: &str, secs: f64) -> TradeanimResult<()> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(TradeanimError::timeline(format!(
            "{what} must be finite and >= 0 (got {secs})"
        )));
    }
    Ok(())
}

impl Timeline {
    /// Empty timeline with the cursor at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule every animation at the cursor with a shared duration and ease.
    pub fn play(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
        ease: Ease,
    ) -> TradeanimResult<()> {
        self.play_staggered(animations.into_iter().map(|a| (a, duration, ease)), 0.0)
    }

    /// Schedule `(animation, duration, ease)` entries from the cursor, entry `i` starting
    /// `i * delay` later. The batch counts as one play for [`Timeline::play_at`].
    pub fn play_staggered(
        &mut self,
        batch: impl IntoIterator<Item = (Animation, f64, Ease)>,
        delay: f64,
    ) -> TradeanimResult<()> {
        self.push(self.cursor, batch, delay)?;
        self.last_play_start = self.cursor;
        Ok(())
    }

    /// Schedule every animation at `start` without touching the cursor.
    ///
    /// `start` may precede the cursor but not the start of the most recent [`Timeline::play`].
    pub fn play_at(
        &mut self,
        start: f64,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
        ease: Ease,
    ) -> TradeanimResult<()> {
        self.play_at_staggered(start, animations.into_iter().map(|a| (a, duration, ease)), 0.0)
    }

    /// [`Timeline::play_at`] with per-entry durations and eases and a start stagger.
    pub fn play_at_staggered(
        &mut self,
        start: f64,
        batch: impl IntoIterator<Item = (Animation, f64, Ease)>,
        delay: f64,
    ) -> TradeanimResult<()> {
        check_secs("start time", start)?;
        if start < self.last_play_start {
            return Err(TradeanimError::timeline(format!(
                "start time {start} precedes the previous play at {}",
                self.last_play_start
            )));
        }
        self.push(start, batch, delay)
    }

    fn push(
        &mut self,
        start: f64,
        batch: impl IntoIterator<Item = (Animation, f64, Ease)>,
        delay: f64,
    ) -> TradeanimResult<()> {
        check_secs("delay", delay)?;
        let mut directives = Vec::new();
        for (i, (animation, duration, ease)) in batch.into_iter().enumerate() {
            check_secs("duration", duration)?;
            directives.push(Directive {
                animation,
                start_time: start + i as f64 * delay,
                duration,
                ease,
            });
        }
        if directives.is_empty() {
            return Err(TradeanimError::timeline("play called with no animations"));
        }
        self.directives.extend(directives);
        Ok(())
    }

    /// Advance the cursor by `secs`.
    pub fn wait(&mut self, secs: f64) -> TradeanimResult<()> {
        check_secs("wait", secs)?;
        self.cursor += secs;
        Ok(())
    }

    /// Current scheduling position in seconds.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Start of the most recent `play`.
    pub fn last_play_start(&self) -> f64 {
        self.last_play_start
    }

    /// Issued directives in issuance order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Number of issued directives.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// No directive has been issued.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Scene length: the latest directive end or the cursor, whichever is later.
    pub fn total_duration(&self) -> f64 {
        self.directives
            .iter()
            .map(Directive::end_time)
            .fold(self.cursor, f64::max)
    }

    /// Every directive started at `t`, in issuance order.
    ///
    /// Finished directives are reported settled at progress 1 so that their end state persists.
    pub fn resolve(&self, t: f64) -> Vec<Resolved<'_>> {
        self.directives
            .iter()
            .enumerate()
            .filter_map(|(index, directive)| {
                let progress = directive.raw_progress(t)?;
                Some(Resolved {
                    index,
                    directive,
                    progress,
                    settled: if directive.duration <= 0.0 {
                        t > directive.start_time
                    } else {
                        t >= directive.end_time()
                    },
                })
            })
            .collect()
    }

    /// Directives whose `[start, start + duration)` interval contains `t`.
    ///
    /// A zero-length directive is active only at exactly its start, with progress 1.
    pub fn resolve_active(&self, t: f64) -> Vec<Resolved<'_>> {
        self.resolve(t).into_iter().filter(|r| !r.settled).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/timeline.rs"]
mod tests;
