//! Render loop: samples the prepared scene frame by frame, rasterizes and streams into a sink.
//!
//! Rendering may run on a rayon pool, but the sink only ever sees frames in index order. A
//! dedicated encoder thread reorders completed frames and is the single writer to the sink; the
//! bounded channel in front of it and the sink's own blocking `submit` keep memory bounded.

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::eval::evaluator::PreparedScene;
use crate::eval::state::FrameState;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::render::backend::{BackendKind, FrameRGBA, RenderBackend, create_backend};
use crate::render::text::FontBook;
use crate::scene::builder::Scene;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Options controlling [`Director::render`].
#[derive(Clone, Debug)]
pub struct DirectorOpts {
    /// Render frames on a dedicated rayon pool.
    pub parallel: bool,
    /// Worker thread count. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames handed to the pool at a time; also capped by the reorder memory budget.
    pub chunk_size: usize,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
    /// Rasterizer used by every worker.
    pub backend: BackendKind,
}

impl Default for DirectorOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            chunk_size: 64,
            channel_capacity: 4,
            backend: BackendKind::Cpu,
        }
    }
}

/// Render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames submitted to the sink.
    pub frames: u64,
    /// Wall time of the whole pass, including sink `open` and `close`.
    pub elapsed: Duration,
}

/// Progress snapshot reported after each submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderProgress {
    /// Frames submitted so far.
    pub done: u64,
    /// Frames in the scene.
    pub total: u64,
    /// Time since rendering started.
    pub elapsed: Duration,
}

impl RenderProgress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }

    /// Linear estimate of the remaining time, once at least one frame is done.
    pub fn eta(&self) -> Option<Duration> {
        if self.done == 0 {
            return None;
        }
        let per_frame = self.elapsed.as_secs_f64() / self.done as f64;
        let left = self.total.saturating_sub(self.done) as f64;
        Some(Duration::from_secs_f64(per_frame * left))
    }
}

/// Drives a prepared scene through a renderer into a [`FrameSink`].
#[derive(Debug)]
pub struct Director {
    prepared: PreparedScene,
    fonts: FontBook,
    opts: DirectorOpts,
}

impl Director {
    /// Prepare `scene` (start snapshots, validation) and use the system fonts.
    pub fn new(scene: &Scene, opts: DirectorOpts) -> TradeanimResult<Self> {
        Ok(Self::from_prepared(scene.prepare()?, opts))
    }

    /// Wrap an already prepared scene.
    pub fn from_prepared(prepared: PreparedScene, opts: DirectorOpts) -> Self {
        Self {
            prepared,
            fonts: FontBook::system(),
            opts,
        }
    }

    /// Replace the font database used for text.
    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    /// The prepared scene.
    pub fn prepared(&self) -> &PreparedScene {
        &self.prepared
    }

    /// Render options.
    pub fn opts(&self) -> &DirectorOpts {
        &self.opts
    }

    /// `ceil(total_duration * fps)`.
    pub fn frame_count(&self) -> u64 {
        self.prepared.frame_count()
    }

    /// Scene length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.prepared.total_duration()
    }

    /// Evaluated state at `t` seconds.
    pub fn state_at(&self, t: f64) -> TradeanimResult<FrameState> {
        self.prepared.state_at(t)
    }

    /// Render one frame with a fresh backend.
    pub fn render_frame(&self, idx: FrameIndex) -> TradeanimResult<FrameRGBA> {
        let total = self.frame_count();
        if idx.0 >= total {
            return Err(TradeanimError::config(format!(
                "frame {} is outside the scene (0..{total})",
                idx.0
            )));
        }
        let mut backend = self.backend()?;
        render_one(&self.prepared, &mut *backend, idx)
    }

    /// Render every frame into `sink`.
    ///
    /// There are `ceil(total_duration * fps)` frames and frame `i` samples the scene at
    /// `i / fps`. The last frame therefore lands strictly before `total_duration`: an animation
    /// that ends the scene is last seen at a progress just below 1 and its finished state is
    /// never encoded. Append a short [`wait`](crate::SceneBuilder::wait) to hold the final pose.
    pub fn render(&self, sink: &mut dyn FrameSink) -> TradeanimResult<RenderStats> {
        self.render_with_progress(sink, |_| {})
    }

    /// Render every frame into `sink`, calling `on_progress` after each submitted frame.
    ///
    /// On any failure the producer stops, `sink.abort()` is called and the first cause is
    /// returned. A scene with zero frames fails before the sink is opened.
    #[tracing::instrument(skip_all, fields(frames = self.frame_count(), parallel = self.opts.parallel))]
    pub fn render_with_progress<F>(
        &self,
        sink: &mut dyn FrameSink,
        on_progress: F,
    ) -> TradeanimResult<RenderStats>
    where
        F: FnMut(RenderProgress) + Send,
    {
        let total = self.frame_count();
        if total == 0 {
            return Err(TradeanimError::config(
                "scene has zero frames; nothing to render",
            ));
        }

        let cfg = SinkConfig::from_render_config(self.prepared.config());
        let bytes_per_frame = (cfg.frame_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = (self.opts.chunk_size.max(1) as u64)
            .min(max_chunk_by_mem)
            .min(total);
        let cap = self.opts.channel_capacity.max(1);

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };
        // Surfaces backend construction errors before the sink is opened.
        let mut backend = self.backend()?;

        tracing::info!(
            total,
            duration = self.total_duration(),
            width = cfg.width,
            height = cfg.height,
            chunk_size,
            "render started"
        );
        let started = Instant::now();

        let result = std::thread::scope(|scope| -> TradeanimResult<u64> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let enc = scope.spawn(move || encode_loop(sink, cfg, rx, total, started, on_progress));

            let produce_res = match pool.as_ref() {
                Some(pool) => {
                    let ctx = ChunkCtx {
                        prepared: &self.prepared,
                        fonts: &self.fonts,
                        kind: self.opts.backend,
                        pool,
                        tx: &tx,
                    };
                    FrameRange::first(total)
                        .chunks(chunk_size)
                        .try_for_each(|chunk| render_chunk(&ctx, chunk))
                }
                None => FrameRange::first(total)
                    .indices()
                    .try_for_each(|idx| -> TradeanimResult<()> {
                        let frame = render_one(&self.prepared, &mut *backend, idx)?;
                        tx.send(FrameMsg { idx, frame })
                            .map_err(|_| encoder_gone())
                    }),
            };

            drop(tx);
            let enc_res = enc
                .join()
                .map_err(|_| TradeanimError::encode("encoder thread panicked"))?;

            match (produce_res, enc_res) {
                (Ok(()), Ok(frames)) => Ok(frames),
                (Err(e), Err(EncodeExit::Disconnected)) => Err(e),
                (_, Err(EncodeExit::Sink(e))) => Err(e),
                (Err(e), Ok(_)) => Err(e),
                (Ok(()), Err(EncodeExit::Disconnected)) => Err(TradeanimError::encode(
                    "frame producer stopped before the last frame",
                )),
            }
        });

        match result {
            Ok(frames) => {
                let stats = RenderStats {
                    frames,
                    elapsed: started.elapsed(),
                };
                tracing::info!(frames, elapsed = ?stats.elapsed, "render finished");
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!(error = %e, "render aborted");
                Err(e)
            }
        }
    }

    fn backend(&self) -> TradeanimResult<Box<dyn RenderBackend + Send>> {
        create_backend(self.opts.backend, self.prepared.config(), &self.fonts)
    }
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
}

enum EncodeExit {
    /// The producer hung up early; its own error is the cause.
    Disconnected,
    Sink(TradeanimError),
}

fn encoder_gone() -> TradeanimError {
    TradeanimError::encode("encoder thread is not accepting frames")
}

fn render_one(
    prepared: &PreparedScene,
    backend: &mut (dyn RenderBackend + Send),
    idx: FrameIndex,
) -> TradeanimResult<FrameRGBA> {
    let state = prepared.frame_state(idx)?;
    backend.render(&state, prepared.sample_time(idx))
}

/// Open the sink, submit frames in index order, then close it. Any failure aborts the sink.
fn encode_loop<F>(
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    rx: mpsc::Receiver<FrameMsg>,
    total: u64,
    started: Instant,
    mut on_progress: F,
) -> Result<u64, EncodeExit>
where
    F: FnMut(RenderProgress),
{
    let res = (|| -> Result<u64, EncodeExit> {
        sink.open(cfg).map_err(EncodeExit::Sink)?;

        let log_every = (total / 10).max(1);
        let mut next = 0u64;
        let mut pending = HashMap::<u64, FrameRGBA>::new();
        while next < total {
            let frame = match pending.remove(&next) {
                Some(frame) => frame,
                None => {
                    let msg = rx.recv().map_err(|_| EncodeExit::Disconnected)?;
                    if msg.idx.0 != next {
                        pending.insert(msg.idx.0, msg.frame);
                        continue;
                    }
                    msg.frame
                }
            };
            sink.submit(FrameIndex(next), &frame)
                .map_err(EncodeExit::Sink)?;
            next += 1;

            let progress = RenderProgress {
                done: next,
                total,
                elapsed: started.elapsed(),
            };
            if next % log_every == 0 || next == total {
                tracing::debug!(done = next, total, eta = ?progress.eta(), "render progress");
            }
            on_progress(progress);
        }

        sink.close().map_err(EncodeExit::Sink)?;
        Ok(next)
    })();

    if res.is_err() {
        sink.abort();
    }
    res
}

fn build_thread_pool(threads: Option<usize>) -> TradeanimResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TradeanimError::config("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TradeanimError::render(format!("failed to build rayon thread pool: {e}")))
}

#[derive(Clone, Copy)]
struct ChunkCtx<'a> {
    prepared: &'a PreparedScene,
    fonts: &'a FontBook,
    kind: BackendKind,
    pool: &'a rayon::ThreadPool,
    tx: &'a mpsc::SyncSender<FrameMsg>,
}

fn render_chunk(ctx: &ChunkCtx<'_>, chunk: FrameRange) -> TradeanimResult<()> {
    let tx = ctx.tx.clone();
    tracing::trace!(start = chunk.start.0, frames = chunk.len_frames(), "render chunk");
    ctx.pool.install(|| {
        (chunk.start.0..chunk.end.0).into_par_iter().try_for_each_init(
            || None::<Box<dyn RenderBackend + Send>>,
            move |worker, f| -> TradeanimResult<()> {
                let backend = match worker.take() {
                    Some(b) => b,
                    None => create_backend(ctx.kind, ctx.prepared.config(), ctx.fonts)?,
                };
                let backend = worker.insert(backend);
                let frame = render_one(ctx.prepared, &mut **backend, FrameIndex(f))?;
                tx.send(FrameMsg {
                    idx: FrameIndex(f),
                    frame,
                })
                .map_err(|_| encoder_gone())
            },
        )
    })
}

#[cfg(test)]
#[path = "../../tests/unit/director/director.rs"]
mod tests;
