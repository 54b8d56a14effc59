use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: px.repeat((w * h) as usize),
        premultiplied: true,
    }
}

#[test]
fn blur_constant_image_is_identity() {
    let f = solid(6, 4, [10, 20, 30, 255]);
    let out = blur_rgba8(&f.data, 6, 4, 2).unwrap();
    assert_eq!(out, f.data);
    assert_eq!(blur_rgba8(&f.data, 6, 4, 0).unwrap(), f.data);
    assert!(blur_rgba8(&f.data[..8], 6, 4, 2).is_err());
}

#[test]
fn blur_spreads_energy_from_a_single_pixel() {
    let (w, h) = (9u32, 9u32);
    let mut src = vec![0u8; FrameRGBA::expected_len(w, h)];
    let center = ((4 * w + 4) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    let out = blur_rgba8(&src, w, h, 1).unwrap();
    assert!(out.chunks_exact(4).filter(|px| px[3] != 0).count() > 1);
    let sum_a: i32 = out.chunks_exact(4).map(|px| i32::from(px[3])).sum();
    assert!((sum_a - 255).abs() <= 6);
}

#[test]
fn kernel_sums_to_one_in_q16() {
    for sigma in [1u32, 3, 15] {
        let k = gaussian_kernel_q16(sigma * 3, f64::from(sigma));
        assert_eq!(k.len() as u32, sigma * 6 + 1);
        assert_eq!(k.iter().sum::<u32>(), 1 << 16);
    }
}

#[test]
fn disabled_post_leaves_the_frame_alone() {
    let mut f = solid(4, 4, [40, 80, 120, 255]);
    let before = f.clone();
    apply(&mut f, &PostProcessConfig::default()).unwrap();
    assert_eq!(f, before);
    assert!(!PostProcessConfig::default().is_enabled());
}

#[test]
fn vignette_darkens_corners_and_keeps_the_center() {
    let mut f = solid(20, 20, [200, 200, 200, 255]);
    apply(
        &mut f,
        &PostProcessConfig {
            vignette: Some(Vignette::default()),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f.pixel(10, 10).unwrap(), [200, 200, 200, 255]);
    assert_eq!(f.pixel(0, 0).unwrap(), [140, 140, 140, 255]);
}

#[test]
fn color_grading_scales_brightness_and_saturation() {
    let mut f = solid(2, 2, [100, 50, 0, 255]);
    apply(
        &mut f,
        &PostProcessConfig {
            color_grading: Some(ColorGrading {
                brightness: 2.0,
                ..ColorGrading::default()
            }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f.pixel(0, 0).unwrap(), [200, 100, 0, 255]);

    let mut grey = solid(2, 2, [200, 100, 50, 255]);
    apply(
        &mut grey,
        &PostProcessConfig {
            color_grading: Some(ColorGrading {
                saturation: 0.0,
                ..ColorGrading::default()
            }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    let px = grey.pixel(1, 1).unwrap();
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
}

#[test]
fn contrast_pulls_towards_the_mean() {
    let mut f = FrameRGBA {
        width: 2,
        height: 1,
        data: vec![0, 0, 0, 255, 200, 200, 200, 255],
        premultiplied: true,
    };
    apply(
        &mut f,
        &PostProcessConfig {
            color_grading: Some(ColorGrading {
                contrast: 0.0,
                ..ColorGrading::default()
            }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f.pixel(0, 0), f.pixel(1, 0));
    assert_eq!(f.pixel(0, 0).unwrap()[0], 100);
}

#[test]
fn chromatic_aberration_shifts_red_left_and_blue_right() {
    let mut f = solid(8, 1, [0, 0, 0, 255]);
    f.data[4 * 4..4 * 4 + 3].copy_from_slice(&[255, 255, 255]);
    apply(
        &mut f,
        &PostProcessConfig {
            chromatic_aberration: Some(ChromaticAberration { offset: 2.0 }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f.pixel(2, 0).unwrap(), [255, 0, 0, 255]);
    assert_eq!(f.pixel(4, 0).unwrap(), [0, 255, 0, 255]);
    assert_eq!(f.pixel(6, 0).unwrap(), [0, 0, 255, 255]);
}

#[test]
fn lens_distortion_keeps_the_center_and_moves_the_edges() {
    let (w, h) = (16u32, 16u32);
    let mut f = solid(w, h, [0, 0, 0, 255]);
    for y in 0..h {
        for x in 0..w {
            let i = ((y * w + x) * 4) as usize;
            f.data[i] = (x * 16) as u8;
        }
    }
    let before = f.clone();
    apply(
        &mut f,
        &PostProcessConfig {
            lens_distortion: Some(LensDistortion { k: 0.5 }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f.pixel(8, 8), before.pixel(8, 8));
    // Pincushion samples from further out, clamped to the border.
    assert_eq!(f.pixel(1, 8).unwrap()[0], 0);
    assert_ne!(f, before);
}

#[test]
fn bloom_of_a_flat_frame_is_a_no_op() {
    let mut f = solid(12, 12, [30, 60, 90, 255]);
    let before = f.clone();
    apply(
        &mut f,
        &PostProcessConfig {
            bloom: Some(Bloom {
                radius: 2,
                intensity: 0.5,
            }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    assert_eq!(f, before);
}

#[test]
fn bloom_softens_a_hard_edge() {
    let mut f = solid(12, 4, [0, 0, 0, 255]);
    for y in 0..4usize {
        for x in 6..12usize {
            let i = (y * 12 + x) * 4;
            f.data[i..i + 3].copy_from_slice(&[255, 255, 255]);
        }
    }
    apply(
        &mut f,
        &PostProcessConfig {
            bloom: Some(Bloom {
                radius: 2,
                intensity: 0.5,
            }),
            ..PostProcessConfig::default()
        },
    )
    .unwrap();
    let dark_side = f.pixel(5, 1).unwrap()[0];
    let bright_side = f.pixel(6, 1).unwrap()[0];
    assert!(dark_side > 0 && bright_side < 255, "{dark_side} {bright_side}");
}

#[test]
fn downsample_shrinks_a_flat_frame_by_the_factor() {
    let f = solid(8, 6, [20, 40, 60, 255]);
    let out = downsample(f, 2).unwrap();
    assert_eq!((out.width, out.height), (4, 3));
    assert_eq!(out.data.len(), FrameRGBA::expected_len(4, 3));
    assert_eq!(out.pixel(1, 1).unwrap(), [20, 40, 60, 255]);

    let same = downsample(solid(3, 3, [1, 2, 3, 255]), 1).unwrap();
    assert_eq!(same.width, 3);
    assert!(downsample(solid(1, 1, [0, 0, 0, 255]), 2).is_err());
}
