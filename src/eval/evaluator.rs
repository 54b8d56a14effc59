use std::collections::BTreeMap;

use crate::animation::anim::ApplyCtx;
use crate::config::render::RenderConfig;
use crate::eval::state::{FrameState, Snapshot};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::camera::{Camera, FitPadding};
use crate::scene::registry::{ElementId, ElementRegistry};
use crate::timeline::{Directive, Timeline};

/// A scene frozen for rendering: base state, directive log and every start snapshot.
///
/// Everything here is read-only once prepared, so frames can be evaluated in any order and on
/// any number of threads.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    config: RenderConfig,
    base: FrameState,
    timeline: Timeline,
    snapshots: Vec<Snapshot>,
}

impl PreparedScene {
    /// Freeze `registry`, `camera` and `timeline` and capture every directive's start snapshot.
    ///
    /// Elements whose first directive is an entrance start hidden. Incompatible targets surface
    /// here as animation errors, before any frame is rendered, and so does any directive issued
    /// after a removing fade-out that still targets the removed element.
    #[tracing::instrument(skip_all, fields(elements = registry.len(), directives = timeline.len()))]
    pub fn prepare(
        config: RenderConfig,
        registry: &ElementRegistry,
        camera: Camera,
        timeline: Timeline,
    ) -> TradeanimResult<Self> {
        config.validate()?;
        let mut base = FrameState::from_registry(registry, camera);

        let mut first: BTreeMap<ElementId, (f64, bool)> = BTreeMap::new();
        for d in timeline.directives() {
            for id in d.animation.targets() {
                let earlier = first.get(&id).is_some_and(|(t, _)| *t <= d.start_time);
                if !earlier {
                    first.insert(id, (d.start_time, d.animation.is_entrance()));
                }
            }
        }
        for (id, (_, entrance)) in first {
            if !registry.contains(id) {
                return Err(TradeanimError::timeline(format!(
                    "directive targets element {id} which is not in the scene"
                )));
            }
            if entrance {
                base.element_mut(id)?.visible = false;
            }
        }

        for (k, d) in timeline.directives().iter().enumerate() {
            let Some(gone) = d.animation.removes() else {
                continue;
            };
            let later = timeline.directives()[k + 1..]
                .iter()
                .find(|l| l.animation.targets().contains(&gone));
            if let Some(l) = later {
                return Err(TradeanimError::timeline(format!(
                    "{} targets element {gone} after fade_out removes it",
                    l.animation.name()
                )));
            }
        }

        let mut prepared = Self {
            config,
            base,
            timeline,
            snapshots: Vec::new(),
        };
        let directives = prepared.timeline.directives();
        let mut snapshots = Vec::with_capacity(directives.len());
        for (k, d) in directives.iter().enumerate() {
            let mut state = prepared.evaluate(&directives[..k], &snapshots, d.start_time)?;
            let snap = d
                .animation
                .capture(&state)
                .map_err(|e| with_directive(e, k, d))?;
            // Trial application so capability mismatches fail here rather than mid-render.
            d.animation
                .apply(&mut state, &snap, d.ease.apply(0.0), &prepared.ctx())
                .map_err(|e| with_directive(e, k, d))?;
            snapshots.push(snap);
        }
        prepared.snapshots = snapshots;

        tracing::debug!(
            total_secs = prepared.total_duration(),
            frames = prepared.frame_count(),
            "scene prepared"
        );
        Ok(prepared)
    }

    fn ctx(&self) -> ApplyCtx<'_> {
        ApplyCtx {
            theme: &self.config.theme,
            fit: FitPadding {
                top: self.config.padding_top,
                bottom: self.config.padding_bottom,
                right: self.config.padding_right,
            },
        }
    }

    fn evaluate(
        &self,
        directives: &[Directive],
        snapshots: &[Snapshot],
        t: f64,
    ) -> TradeanimResult<FrameState> {
        let ctx = self.ctx();
        let mut state = self.base.clone();
        for (i, (d, snap)) in directives.iter().zip(snapshots).enumerate() {
            let Some(p) = d.raw_progress(t) else {
                continue;
            };
            d.animation
                .apply(&mut state, snap, d.ease.apply(p), &ctx)
                .map_err(|e| with_directive(e, i, d))?;
        }
        Ok(state)
    }

    /// Element states and camera at `t` seconds.
    ///
    /// Directives are applied in issuance order on a fresh copy of the base state; finished ones
    /// contribute their end state.
    pub fn state_at(&self, t: f64) -> TradeanimResult<FrameState> {
        self.evaluate(self.timeline.directives(), &self.snapshots, t)
    }

    /// State sampled for frame `idx`.
    pub fn frame_state(&self, idx: FrameIndex) -> TradeanimResult<FrameState> {
        self.state_at(self.sample_time(idx))
    }

    /// Sample time of frame `idx` in seconds.
    pub fn sample_time(&self, idx: FrameIndex) -> f64 {
        self.config.fps.frame_time_secs(idx)
    }

    /// `ceil(total_duration * fps)`.
    pub fn frame_count(&self) -> u64 {
        self.config.fps.frame_count(self.total_duration())
    }

    /// Scene length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// Render settings the scene was prepared with.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Directive log.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// State before any directive runs.
    pub fn base(&self) -> &FrameState {
        &self.base
    }

    /// Start snapshot of directive `index`.
    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }
}

fn with_directive(e: TradeanimError, index: usize, d: &Directive) -> TradeanimError {
    match e {
        TradeanimError::Animation(msg) => TradeanimError::animation(format!(
            "directive {index} ({} at {}s): {msg}",
            d.animation.name(),
            d.start_time
        )),
        other => other,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/evaluator.rs"]
mod tests;
