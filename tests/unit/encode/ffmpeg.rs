use super::*;
use crate::encode::sink::EncodeQuality;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::new(30, 1).unwrap(),
        quality: EncodeQuality::default(),
    }
}

fn frame(width: u32, height: u32) -> FrameRGBA {
    FrameRGBA {
        width,
        height,
        data: vec![200; FrameRGBA::expected_len(width, height)],
        premultiplied: true,
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_over_bg_to_opaque_rgba8(&mut dst, &src, true, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_over_bg_to_opaque_rgba8(&mut dst, &src, true, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn flatten_straight_alpha_premultiplies_first() {
    let src = vec![255u8, 0, 0, 128];
    let mut dst = vec![0u8; 4];
    flatten_over_bg_to_opaque_rgba8(&mut dst, &src, false, [0, 0, 255, 255]).unwrap();
    assert_eq!(dst, vec![128, 0, 127, 255]);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_over_bg_to_opaque_rgba8(&mut dst, &[0u8; 4], true, [0; 4]).is_err());
}

#[test]
fn command_carries_quality_and_rational_fps() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/x.mp4"));
    let mut c = cfg(64, 32);
    c.fps = Fps::new(30000, 1001).unwrap();
    c.quality.crf = 23;
    c.quality.preset = "slow".to_owned();
    let cmd = sink.command(&c);
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let joined = args.join(" ");
    assert!(joined.starts_with("-y "), "{joined}");
    assert!(joined.contains("-s 64x32"), "{joined}");
    assert!(joined.contains("-r 30000/1001 -i pipe:0"), "{joined}");
    assert!(
        joined.contains("-c:v libx264 -pix_fmt yuv420p -crf 23 -preset slow"),
        "{joined}"
    );
    assert_eq!(args.last().map(String::as_str), Some("out/x.mp4"));
}

#[test]
fn odd_size_is_rejected_for_yuv420() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(dir.path().join("o.mp4")));
    assert!(matches!(
        sink.open(cfg(63, 32)),
        Err(TradeanimError::Config(_))
    ));
}

#[test]
fn missing_encoder_fails_after_retry() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = FfmpegSinkOpts::new(dir.path().join("o.mp4"));
    opts.ffmpeg_bin = dir.path().join("no-such-ffmpeg");
    let mut sink = FfmpegSink::new(opts);
    let err = sink.open(cfg(16, 16)).unwrap_err();
    assert!(matches!(err, TradeanimError::Encode(_)));
    assert!(err.to_string().contains("2 attempts"), "{err}");
}

#[test]
fn refuses_to_overwrite_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exists.mp4");
    std::fs::write(&out, b"keep").unwrap();
    let mut opts = FfmpegSinkOpts::new(&out);
    opts.overwrite = false;
    let mut sink = FfmpegSink::new(opts);
    assert!(sink.open(cfg(16, 16)).is_err());
    assert_eq!(std::fs::read(&out).unwrap(), b"keep");
}

#[test]
fn submit_without_open_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("never.mp4"));
    assert!(sink.submit(FrameIndex(0), &frame(2, 2)).is_err());
    assert!(sink.close().is_err());
}

#[cfg(unix)]
mod fake_encoder {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;

    /// Write an executable shell script standing in for ffmpeg. `$out` is its last argument.
    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-ffmpeg");
        let text = format!("#!/bin/sh\nfor a; do out=$a; done\n{body}\n");
        std::fs::write(&path, text).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn sink_with(dir: &Path, body: &str) -> (FfmpegSink, PathBuf) {
        let out = dir.join("nested").join("out.mp4");
        let mut opts = FfmpegSinkOpts::new(&out);
        opts.ffmpeg_bin = script(dir, body);
        opts.close_timeout = Duration::from_millis(300);
        (FfmpegSink::new(opts), out)
    }

    #[test]
    fn frames_stream_through_the_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, out) = sink_with(dir.path(), r#"cat > "$out""#);
        sink.open(cfg(8, 4)).unwrap();
        for i in 0..3 {
            sink.submit(FrameIndex(i), &frame(8, 4)).unwrap();
        }
        sink.close().unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(bytes.len(), 3 * 8 * 4 * 4);
        assert!(bytes.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn out_of_order_submit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, _) = sink_with(dir.path(), r#"cat > "$out""#);
        sink.open(cfg(8, 4)).unwrap();
        sink.submit(FrameIndex(0), &frame(8, 4)).unwrap();
        assert!(matches!(
            sink.submit(FrameIndex(2), &frame(8, 4)),
            Err(TradeanimError::Encode(_))
        ));
        sink.abort();
    }

    #[test]
    fn early_exit_reports_stderr_and_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, out) = sink_with(
            dir.path(),
            r#"echo partial > "$out"; echo "boom: unknown encoder" >&2; exit 1"#,
        );
        sink.open(cfg(64, 64)).unwrap();

        let mut failure = None;
        for i in 0..64 {
            if let Err(e) = sink.submit(FrameIndex(i), &frame(64, 64)) {
                failure = Some(e);
                break;
            }
        }
        let err = match failure {
            Some(e) => e,
            None => sink.close().unwrap_err(),
        };
        assert!(matches!(err, TradeanimError::Encode(_)));
        assert!(err.to_string().contains("boom"), "{err}");
        assert!(!out.exists());
    }

    #[test]
    fn close_times_out_on_a_hung_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, out) = sink_with(dir.path(), r#"echo partial > "$out"; exec sleep 30"#);
        sink.open(cfg(8, 4)).unwrap();
        let start = Instant::now();
        let err = sink.close().unwrap_err();
        assert!(err.to_string().contains("did not finish"), "{err}");
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!out.exists());
    }

    #[test]
    fn submit_blocks_while_the_encoder_stalls() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, _) = sink_with(dir.path(), "sleep 1; cat > /dev/null");
        sink.open(cfg(256, 256)).unwrap();
        let start = Instant::now();
        for i in 0..4 {
            sink.submit(FrameIndex(i), &frame(256, 256)).unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(500));
        sink.close().unwrap();
    }

    #[test]
    fn abort_and_drop_remove_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let (mut sink, out) = sink_with(dir.path(), r#"cat > "$out""#);
        sink.open(cfg(8, 4)).unwrap();
        sink.submit(FrameIndex(0), &frame(8, 4)).unwrap();
        sink.abort();
        assert!(!out.exists());

        let other = tempfile::tempdir().unwrap();
        let (mut dropped, out) = sink_with(other.path(), r#"cat > "$out""#);
        dropped.open(cfg(8, 4)).unwrap();
        dropped.submit(FrameIndex(0), &frame(8, 4)).unwrap();
        drop(dropped);
        assert!(!out.exists());
    }
}

#[test]
fn real_ffmpeg_encodes_when_available() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("real.mp4");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    let mut c = cfg(32, 32);
    c.quality.preset = "ultrafast".to_owned();
    sink.open(c).unwrap();
    for i in 0..5 {
        sink.submit(FrameIndex(i), &frame(32, 32)).unwrap();
    }
    sink.close().unwrap();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}
