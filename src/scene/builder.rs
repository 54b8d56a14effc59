use std::collections::BTreeSet;

use crate::animation::anim::Animation;
use crate::animation::ease::Ease;
use crate::config::render::RenderConfig;
use crate::eval::evaluator::PreparedScene;
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::camera::Camera;
use crate::scene::element::Element;
use crate::scene::registry::{ElementId, ElementRegistry};
use crate::scene::trade::{Trade, TradeHandle, TradeStyle};
use crate::timeline::Timeline;

/// Per-call timing for [`SceneBuilder::play_with`] and friends.
///
/// Missing durations and eases fall back to each animation's own defaults
/// ([`Animation::default_duration`], [`Animation::default_ease`]).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayOpts {
    /// Shared duration in seconds.
    pub duration: Option<f64>,
    /// Start of animation `i` is delayed by `i * delay` seconds.
    pub delay: f64,
    /// Shared ease.
    pub ease: Option<Ease>,
}

impl PlayOpts {
    /// Shared duration and ease, no stagger.
    pub fn fixed(duration: f64, ease: Ease) -> Self {
        Self {
            duration: Some(duration),
            delay: 0.0,
            ease: Some(ease),
        }
    }

    /// Per-animation defaults with starts `delay` seconds apart.
    pub fn staggered(delay: f64) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

/// A fully constructed scene: render settings, elements, initial camera and directive log.
#[derive(Debug, Clone)]
pub struct Scene {
    config: RenderConfig,
    registry: ElementRegistry,
    camera: Camera,
    timeline: Timeline,
}

impl Scene {
    /// Validate `config` and run `construct` against a fresh builder.
    ///
    /// ```
    /// use tradeanim::{Animation, Element, RenderConfig, Scene};
    ///
    /// let scene = Scene::build(RenderConfig::default(), |s| {
    ///     let c = s.add_element(Element::candle(0, 10.0, 12.0, 9.0, 11.0));
    ///     s.play_and_wait([Animation::appear(vec![c])], 2.0)?;
    ///     Ok(())
    /// })
    /// .unwrap();
    /// assert_eq!(scene.total_duration(), 2.0);
    /// ```
    pub fn build<F>(config: RenderConfig, construct: F) -> TradeanimResult<Self>
    where
        F: FnOnce(&mut SceneBuilder) -> TradeanimResult<()>,
    {
        config.validate()?;
        let mut builder = SceneBuilder {
            config,
            registry: ElementRegistry::new(),
            camera: Camera::default(),
            timeline: Timeline::new(),
            referenced: BTreeSet::new(),
        };
        construct(&mut builder)?;
        Ok(builder.finish())
    }

    /// Freeze the scene for rendering.
    pub fn prepare(&self) -> TradeanimResult<PreparedScene> {
        PreparedScene::prepare(
            self.config.clone(),
            &self.registry,
            self.camera,
            self.timeline.clone(),
        )
    }

    /// Render settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Elements.
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Camera before any directive runs.
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Directive log.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Scene length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// `ceil(total_duration * fps)`.
    pub fn frame_count(&self) -> u64 {
        self.config.fps.frame_count(self.total_duration())
    }
}

/// Mutation handle passed to [`Scene::build`].
///
/// These calls are the only way to change a scene. Every duration, offset and wait is divided by
/// the config's `speed_multiplier`, and bad calls fail immediately with timeline errors.
#[derive(Debug)]
pub struct SceneBuilder {
    config: RenderConfig,
    registry: ElementRegistry,
    camera: Camera,
    timeline: Timeline,
    referenced: BTreeSet<ElementId>,
}

impl SceneBuilder {
    fn finish(self) -> Scene {
        Scene {
            config: self.config,
            registry: self.registry,
            camera: self.camera,
            timeline: self.timeline,
        }
    }

    fn scaled(&self, what: &str, secs: f64) -> TradeanimResult<f64> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(TradeanimError::timeline(format!(
                "{what} must be finite and >= 0 (got {secs})"
            )));
        }
        Ok(secs / self.config.speed_multiplier)
    }

    fn check_targets(&self, animations: &[Animation]) -> TradeanimResult<()> {
        for anim in animations {
            for id in anim.targets() {
                if !self.registry.contains(id) {
                    return Err(TradeanimError::timeline(format!(
                        "{} targets element {id} which is not in the scene",
                        anim.name()
                    )));
                }
            }
        }
        Ok(())
    }

    fn mark<'a>(&mut self, animations: impl IntoIterator<Item = &'a Animation>) {
        self.referenced
            .extend(animations.into_iter().flat_map(Animation::targets));
    }

    /// Render settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Add an element and return its handle.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        self.registry.add(element)
    }

    /// Add several elements, returning handles in the same order.
    pub fn add_elements(&mut self, elements: impl IntoIterator<Item = Element>) -> Vec<ElementId> {
        elements.into_iter().map(|e| self.add_element(e)).collect()
    }

    /// Remove an element no directive refers to.
    pub fn remove_element(&mut self, id: ElementId) -> TradeanimResult<Element> {
        if self.referenced.contains(&id) {
            return Err(TradeanimError::timeline(format!(
                "element {id} is referenced by an issued directive"
            )));
        }
        self.registry
            .remove(id)
            .ok_or_else(|| TradeanimError::timeline(format!("element {id} is not in the scene")))
    }

    /// Current state of an element.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.registry.get(id)
    }

    /// Set the camera before any directive runs.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Initial camera.
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Current scheduling position in seconds.
    pub fn current_time(&self) -> f64 {
        self.timeline.cursor()
    }

    /// Run `animations` concurrently from the current time, linearly eased.
    ///
    /// The cursor does not move, so a following `play` overlaps this one.
    pub fn play(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
    ) -> TradeanimResult<()> {
        self.play_eased(animations, duration, Ease::Linear)
    }

    /// [`SceneBuilder::play`] with an explicit ease.
    pub fn play_eased(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
        ease: Ease,
    ) -> TradeanimResult<()> {
        self.play_with(animations, PlayOpts::fixed(duration, ease))
    }

    /// Run `animations` from the current time with optional stagger and per-animation defaults.
    ///
    /// ```
    /// use tradeanim::{Animation, Element, PlayOpts, RenderConfig, Scene};
    ///
    /// let scene = Scene::build(RenderConfig::default(), |s| {
    ///     let a = s.add_element(Element::hline(1.0));
    ///     let b = s.add_element(Element::hline(2.0));
    ///     s.play_with([Animation::fade_in(a), Animation::fade_in(b)], PlayOpts::staggered(0.25))?;
    ///     Ok(())
    /// })
    /// .unwrap();
    /// assert_eq!(scene.total_duration(), 0.75);
    /// ```
    pub fn play_with(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        opts: PlayOpts,
    ) -> TradeanimResult<()> {
        let (batch, delay) = self.batch(animations, opts)?;
        self.timeline.play_staggered(batch, delay)
    }

    /// Start `animations` `offset` seconds after the previous `play` started.
    pub fn play_with_previous(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
        offset: f64,
    ) -> TradeanimResult<()> {
        self.play_with_previous_eased(animations, duration, offset, Ease::Linear)
    }

    /// [`SceneBuilder::play_with_previous`] with an explicit ease.
    pub fn play_with_previous_eased(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
        offset: f64,
        ease: Ease,
    ) -> TradeanimResult<()> {
        self.play_with_previous_opts(animations, offset, PlayOpts::fixed(duration, ease))
    }

    /// [`SceneBuilder::play_with_previous`] with [`PlayOpts`] timing.
    pub fn play_with_previous_opts(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        offset: f64,
        opts: PlayOpts,
    ) -> TradeanimResult<()> {
        let offset = self.scaled("offset", offset)?;
        let (batch, delay) = self.batch(animations, opts)?;
        let start = self.timeline.last_play_start() + offset;
        self.timeline.play_at_staggered(start, batch, delay)
    }

    /// `play` followed by a wait of the same duration.
    pub fn play_and_wait(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        duration: f64,
    ) -> TradeanimResult<()> {
        self.play(animations, duration)?;
        self.wait(duration)
    }

    /// [`SceneBuilder::play_with`], then wait until the last animation of the batch ends.
    pub fn play_and_wait_with(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        opts: PlayOpts,
    ) -> TradeanimResult<()> {
        let (batch, delay) = self.batch(animations, opts)?;
        let span = batch
            .iter()
            .enumerate()
            .map(|(i, (_, duration, _))| i as f64 * delay + duration)
            .fold(0.0, f64::max);
        self.timeline.play_staggered(batch, delay)?;
        self.timeline.wait(span)
    }

    /// Resolve durations, eases and the stagger of one batch, already divided by the speed.
    fn batch(
        &mut self,
        animations: impl IntoIterator<Item = Animation>,
        opts: PlayOpts,
    ) -> TradeanimResult<(Vec<(Animation, f64, Ease)>, f64)> {
        let animations: Vec<Animation> = animations.into_iter().collect();
        let delay = self.scaled("delay", opts.delay)?;
        let shared = opts
            .duration
            .map(|d| self.scaled("duration", d))
            .transpose()?;
        self.check_targets(&animations)?;
        let mut batch = Vec::with_capacity(animations.len());
        for anim in animations {
            let duration = match shared {
                Some(d) => d,
                None => self.scaled("duration", anim.default_duration())?,
            };
            let ease = opts.ease.unwrap_or_else(|| anim.default_ease());
            batch.push((anim, duration, ease));
        }
        self.mark(batch.iter().map(|(a, _, _)| a));
        Ok((batch, delay))
    }

    /// Add a trade's zones, entry level and readouts, returning their handles.
    pub fn add_trade(&mut self, trade: Trade, style: &TradeStyle) -> TradeanimResult<TradeHandle> {
        trade.validate()?;
        let parts = trade.parts(style);
        Ok(TradeHandle {
            tp_zone: self.add_element(parts.tp_zone),
            sl_zone: self.add_element(parts.sl_zone),
            entry_line: self.add_element(parts.entry_line),
            info: parts.info.map(|e| self.add_element(e)),
            pnl: parts.pnl.map(|e| self.add_element(e)),
            trade,
        })
    }

    /// Advance the current time by `secs`.
    pub fn wait(&mut self, secs: f64) -> TradeanimResult<()> {
        let secs = self.scaled("wait", secs)?;
        self.timeline.wait(secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/builder.rs"]
mod tests;
