use super::*;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::new(10, 1).unwrap(),
        quality: EncodeQuality::default(),
    }
}

fn frame(width: u32, height: u32, fill: u8) -> FrameRGBA {
    FrameRGBA {
        width,
        height,
        data: vec![fill; FrameRGBA::expected_len(width, height)],
        premultiplied: true,
    }
}

#[test]
fn order_guard_accepts_contiguous_indices_from_zero() {
    let mut order = FrameOrder::new();
    for i in 0..5 {
        order.check(FrameIndex(i)).unwrap();
    }
    assert_eq!(order.accepted(), 5);
}

#[test]
fn order_guard_rejects_gaps_repeats_and_late_starts() {
    let mut late = FrameOrder::new();
    assert!(matches!(
        late.check(FrameIndex(1)),
        Err(TradeanimError::Encode(_))
    ));

    let mut order = FrameOrder::new();
    order.check(FrameIndex(0)).unwrap();
    let err = order.check(FrameIndex(0)).unwrap_err().to_string();
    assert!(err.contains("expected frame 1"), "{err}");
    assert!(order.check(FrameIndex(2)).is_err());
    assert_eq!(order.accepted(), 1);
}

#[test]
fn in_memory_sink_captures_frames_in_order() {
    let mut sink = InMemorySink::new();
    sink.open(cfg(4, 2)).unwrap();
    sink.submit(FrameIndex(0), &frame(4, 2, 1)).unwrap();
    sink.submit(FrameIndex(1), &frame(4, 2, 2)).unwrap();
    sink.close().unwrap();

    assert!(sink.is_closed());
    assert_eq!(sink.config().map(|c| c.width), Some(4));
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, vec![0, 1]);
    assert_eq!(sink.frames()[1].1.data[0], 2);
}

#[test]
fn in_memory_sink_rejects_out_of_order_and_mismatched_frames() {
    let mut sink = InMemorySink::new();
    sink.open(cfg(4, 2)).unwrap();
    assert!(sink.submit(FrameIndex(3), &frame(4, 2, 0)).is_err());
    assert!(sink.submit(FrameIndex(0), &frame(2, 2, 0)).is_err());
    assert!(sink.frames().is_empty());
}

#[test]
fn submit_before_open_fails() {
    let mut sink = InMemorySink::new();
    assert!(matches!(
        sink.submit(FrameIndex(0), &frame(1, 1, 0)),
        Err(TradeanimError::Encode(_))
    ));
    assert!(sink.close().is_err());
}

#[test]
fn abort_discards_frames() {
    let mut sink = InMemorySink::new();
    sink.open(cfg(1, 1)).unwrap();
    sink.submit(FrameIndex(0), &frame(1, 1, 9)).unwrap();
    sink.abort();
    assert!(sink.is_aborted());
    assert!(!sink.is_closed());
    assert!(sink.frames().is_empty());
}

#[test]
fn sink_config_follows_render_config() {
    let rc = RenderConfig {
        width: 640,
        height: 360,
        crf: 23,
        preset: "fast".to_owned(),
        ..RenderConfig::default()
    };
    let sc = SinkConfig::from_render_config(&rc);
    assert_eq!((sc.width, sc.height), (640, 360));
    assert_eq!(sc.fps, rc.fps);
    assert_eq!(sc.quality.crf, 23);
    assert_eq!(sc.quality.preset, "fast");
    assert_eq!(sc.quality.codec, "libx264");
    assert_eq!(sc.frame_len(), 640 * 360 * 4);
}
