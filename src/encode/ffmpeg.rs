use crate::encode::sink::{FrameOrder, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const SPAWN_ATTEMPTS: u32 = 2;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(250);
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// Encoder executable, looked up on `PATH` when not absolute.
    pub ffmpeg_bin: PathBuf,
    /// Longest time `close` waits for the encoder to exit before killing it.
    pub close_timeout: Duration,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            close_timeout: Duration::from_secs(30),
        }
    }
}

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: SinkConfig,
    order: FrameOrder,
}

/// Sink that spawns `ffmpeg` and streams raw frames into its stdin.
///
/// `submit` blocks on the pipe whenever ffmpeg falls behind. Any failure, an `abort`, or dropping
/// the sink with a session still open kills the process and deletes the partial output file.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    session: Option<Session>,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("open", &self.session.is_some())
            .finish()
    }
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            session: None,
            scratch: Vec::new(),
        }
    }

    /// Options the sink was created with.
    pub fn opts(&self) -> &FfmpegSinkOpts {
        &self.opts
    }

    fn command(&self, cfg: &SinkConfig) -> Command {
        let mut cmd = Command::new(&self.opts.ffmpeg_bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });

        // Frames are flattened to opaque RGBA before they reach the pipe.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);
        cmd.args(quality_args(cfg));
        cmd.args(["-movflags", "+faststart"]);
        cmd.arg(&self.opts.out_path);
        cmd
    }

    fn spawn(&self, cfg: &SinkConfig) -> TradeanimResult<Child> {
        let mut attempt = 1;
        loop {
            match self.command(cfg).spawn() {
                Ok(child) => return Ok(child),
                Err(e) if attempt < SPAWN_ATTEMPTS => {
                    tracing::warn!(
                        bin = %self.opts.ffmpeg_bin.display(),
                        attempt,
                        error = %e,
                        "encoder failed to start, retrying"
                    );
                    attempt += 1;
                    std::thread::sleep(SPAWN_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(TradeanimError::encode(format!(
                        "failed to start '{}' after {attempt} attempts (is ffmpeg installed and on PATH?): {e}",
                        self.opts.ffmpeg_bin.display()
                    )));
                }
            }
        }
    }

    /// Kill the process, collect whatever it wrote to stderr and delete the partial output.
    fn fail(&mut self) -> String {
        let stderr = match self.session.take() {
            Some(mut s) => {
                drop(s.stdin.take());
                let _ = s.child.kill();
                let _ = s.child.wait();
                join_stderr(s.stderr_drain.take()).unwrap_or_default()
            }
            None => String::new(),
        };
        self.remove_partial_output();
        stderr
    }

    fn remove_partial_output(&self) {
        let path = &self.opts.out_path;
        if path.exists() {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output")
                }
            }
        }
    }
}

impl FrameSink for FfmpegSink {
    fn open(&mut self, cfg: SinkConfig) -> TradeanimResult<()> {
        if self.session.is_some() {
            return Err(TradeanimError::encode("ffmpeg sink is already open"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(TradeanimError::config(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if cfg.quality.pixel_format.starts_with("yuv420")
            && (!cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2))
        {
            return Err(TradeanimError::config(format!(
                "ffmpeg sink width/height must be even for pixel format '{}'",
                cfg.quality.pixel_format
            )));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(TradeanimError::config(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        let mut child = self.spawn(&cfg)?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(mut stderr)) = (stdin, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TradeanimError::encode("failed to open ffmpeg pipes"));
        };
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            codec = %cfg.quality.codec,
            crf = cfg.quality.crf,
            "encoder started"
        );
        self.scratch = vec![0u8; cfg.frame_len()];
        self.session = Some(Session {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            cfg,
            order: FrameOrder::new(),
        });
        Ok(())
    }

    fn submit(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> TradeanimResult<()> {
        let bg = self.opts.bg_rgba;
        let Some(session) = self.session.as_mut() else {
            return Err(TradeanimError::encode("ffmpeg sink is not open"));
        };
        session.order.check(idx)?;
        session.cfg.check_frame(frame)?;

        flatten_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, frame.premultiplied, bg)?;

        let Some(stdin) = session.stdin.as_mut() else {
            return Err(TradeanimError::encode("ffmpeg sink is already finalized"));
        };
        if let Err(e) = stdin.write_all(&self.scratch) {
            let exited = session.child.try_wait().ok().flatten();
            let stderr = self.fail();
            return Err(TradeanimError::encode(format!(
                "ffmpeg stopped accepting frames at frame {} ({}): {}",
                idx.0,
                exited.map_or_else(|| e.to_string(), |s| format!("exited with {s}")),
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn close(&mut self) -> TradeanimResult<()> {
        let timeout = self.opts.close_timeout;
        let Some(session) = self.session.as_mut() else {
            return Err(TradeanimError::encode("ffmpeg sink is not open"));
        };
        drop(session.stdin.take());

        let status = match wait_with_timeout(&mut session.child, timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let stderr = self.fail();
                return Err(TradeanimError::encode(format!(
                    "ffmpeg did not finish within {timeout:?} and was killed: {}",
                    stderr.trim()
                )));
            }
            Err(e) => {
                self.fail();
                return Err(TradeanimError::encode(format!(
                    "failed to wait for ffmpeg to finish: {e}"
                )));
            }
        };

        let frames = session.order.accepted();
        let stderr = join_stderr(session.stderr_drain.take());
        if !status.success() {
            let stderr = stderr.unwrap_or_default();
            self.fail();
            return Err(TradeanimError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        stderr?;

        self.session = None;
        tracing::debug!(out = %self.opts.out_path.display(), frames, "encoder finished");
        Ok(())
    }

    fn abort(&mut self) {
        if self.session.is_some() {
            tracing::warn!(out = %self.opts.out_path.display(), "aborting encoder");
            self.fail();
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

fn quality_args(cfg: &SinkConfig) -> Vec<String> {
    let q = &cfg.quality;
    vec![
        "-c:v".to_owned(),
        q.codec.clone(),
        "-pix_fmt".to_owned(),
        q.pixel_format.clone(),
        "-crf".to_owned(),
        q.crf.to_string(),
        "-preset".to_owned(),
        q.preset.clone(),
    ]
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input `-r` goes before `-i`; rational rates are passed as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL);
    }
}

fn join_stderr(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> TradeanimResult<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| TradeanimError::encode("ffmpeg stderr drain thread panicked"))?
        .map_err(|e| TradeanimError::encode(format!("ffmpeg stderr read failed: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn flatten_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    premultiplied: bool,
    bg_rgba: [u8; 4],
) -> TradeanimResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(TradeanimError::encode(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255 - a;
        for c in 0..3 {
            let fg = if premultiplied {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TradeanimResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
