use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::config::post::{
    Bloom, ChromaticAberration, ColorGrading, LensDistortion, PostProcessConfig, Vignette,
};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::render::backend::FrameRGBA;

/// Shrink a premultiplied frame by an integer `factor` with a Lanczos filter.
pub fn downsample(frame: FrameRGBA, factor: u32) -> TradeanimResult<FrameRGBA> {
    if factor <= 1 {
        return Ok(frame);
    }
    let (w, h) = (frame.width / factor, frame.height / factor);
    if w == 0 || h == 0 {
        return Err(TradeanimError::render(format!(
            "cannot shrink {}x{} by {factor}",
            frame.width, frame.height
        )));
    }
    let premultiplied = frame.premultiplied;
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or_else(|| TradeanimError::render("frame byte len mismatch"))?;
    let mut data = imageops::resize(&img, w, h, FilterType::Lanczos3).into_raw();
    if premultiplied {
        clamp_to_alpha(&mut data);
    }
    Ok(FrameRGBA {
        width: w,
        height: h,
        data,
        premultiplied,
    })
}

/// Run every enabled effect of `post` over `frame` in place.
pub fn apply(frame: &mut FrameRGBA, post: &PostProcessConfig) -> TradeanimResult<()> {
    if frame.data.len() != FrameRGBA::expected_len(frame.width, frame.height) {
        return Err(TradeanimError::render("frame byte len mismatch"));
    }
    if let Some(b) = post.bloom {
        bloom(frame, b)?;
    }
    if let Some(v) = post.vignette {
        vignette(frame, v);
    }
    if let Some(g) = post.color_grading {
        color_grade(frame, g);
    }
    if let Some(c) = post.chromatic_aberration {
        chromatic_aberration(frame, c);
    }
    if let Some(l) = post.lens_distortion {
        lens_distortion(frame, l);
    }
    if frame.premultiplied {
        clamp_to_alpha(&mut frame.data);
    }
    Ok(())
}

fn bloom(frame: &mut FrameRGBA, b: Bloom) -> TradeanimResult<()> {
    if b.radius == 0 || b.intensity <= 0.0 {
        return Ok(());
    }
    let blurred = blur_rgba8(&frame.data, frame.width, frame.height, b.radius)?;
    let t = b.intensity.clamp(0.0, 1.0);
    for (d, s) in frame.data.iter_mut().zip(&blurred) {
        *d = to_u8(f64::from(*d) * (1.0 - t) + f64::from(*s) * t);
    }
    Ok(())
}

fn vignette(frame: &mut FrameRGBA, v: Vignette) {
    let (cx, cy) = (f64::from(frame.width) / 2.0, f64::from(frame.height) / 2.0);
    let r_max2 = cx * cx + cy * cy;
    if r_max2 <= 0.0 {
        return;
    }
    let w = frame.width as usize;
    for (i, px) in frame.data.chunks_exact_mut(4).enumerate() {
        let (x, y) = ((i % w) as f64, (i / w) as f64);
        let r2 = ((x - cx).powi(2) + (y - cy).powi(2)) / r_max2;
        let f = (1.0 - v.strength * r2).clamp(0.0, 1.0);
        for c in &mut px[..3] {
            *c = to_u8(f64::from(*c) * f);
        }
    }
}

fn luma(px: &[u8]) -> f64 {
    0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2])
}

fn color_grade(frame: &mut FrameRGBA, g: ColorGrading) {
    let data = &mut frame.data;
    if g.brightness != 1.0 {
        for px in data.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = to_u8(f64::from(*c) * g.brightness);
            }
        }
    }
    if g.contrast != 1.0 {
        let n = (data.len() / 4).max(1) as f64;
        let mean = (data.chunks_exact(4).map(luma).sum::<f64>() / n).round();
        for px in data.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = to_u8(mean + (f64::from(*c) - mean) * g.contrast);
            }
        }
    }
    if g.saturation != 1.0 {
        for px in data.chunks_exact_mut(4) {
            let l = luma(px);
            for c in &mut px[..3] {
                *c = to_u8(l + (f64::from(*c) - l) * g.saturation);
            }
        }
    }
}

fn chromatic_aberration(frame: &mut FrameRGBA, c: ChromaticAberration) {
    if c.offset <= 0.0 {
        return;
    }
    let (w, h) = (frame.width as usize, frame.height as usize);
    let off = (c.offset.round() as usize).max(1);
    let src = frame.data.clone();
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            frame.data[i] = if x + off < w { src[i + off * 4] } else { 0 };
            frame.data[i + 2] = if x >= off { src[i + 2 - off * 4] } else { 0 };
        }
    }
}

fn lens_distortion(frame: &mut FrameRGBA, l: LensDistortion) {
    if l.k == 0.0 {
        return;
    }
    let (w, h) = (frame.width as usize, frame.height as usize);
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let r_max = (cx * cx + cy * cy).sqrt();
    let src = frame.data.clone();
    for y in 0..h {
        for x in 0..w {
            let dx = (x as f64 - cx) / r_max;
            let dy = (y as f64 - cy) / r_max;
            let factor = 1.0 + l.k * (dx * dx + dy * dy);
            let sx = ((cx + dx * factor * r_max) as i64).clamp(0, w as i64 - 1) as usize;
            let sy = ((cy + dy * factor * r_max) as i64).clamp(0, h as i64 - 1) as usize;
            let (d, s) = ((y * w + x) * 4, (sy * w + sx) * 4);
            frame.data[d..d + 4].copy_from_slice(&src[s..s + 4]);
        }
    }
}

fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn clamp_to_alpha(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = (*c).min(a);
        }
    }
}

/// Separable Gaussian blur with standard deviation `sigma` pixels over RGBA8 bytes.
pub(crate) fn blur_rgba8(src: &[u8], width: u32, height: u32, sigma: u32) -> TradeanimResult<Vec<u8>> {
    let expected_len = FrameRGBA::expected_len(width, height);
    if src.len() != expected_len {
        return Err(TradeanimError::render(
            "blur_rgba8 expects src matching width*height*4",
        ));
    }
    if sigma == 0 || width == 0 || height == 0 {
        return Ok(src.to_vec());
    }
    let kernel = gaussian_kernel_q16(sigma.saturating_mul(3), f64::from(sigma));
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    blur_pass(src, &mut tmp, width, height, &kernel, (1, 0));
    blur_pass(&tmp, &mut out, width, height, &kernel, (0, 1));
    Ok(out)
}

/// Normalized weights in Q16 summing to exactly `1 << 16`.
fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let r = radius as i64;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r).map(|i| (-(i * i) as f64 / denom).exp()).collect();
    let sum: f64 = weights_f.iter().sum();
    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    weights
}

fn blur_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], step: (i64, i64)) {
    let radius = (k.len() / 2) as i64;
    let (w, h) = (i64::from(width), i64::from(height));
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let d = ki as i64 - radius;
                let sx = (x + d * step.0).clamp(0, w - 1);
                let sy = (y + d * step.1).clamp(0, h - 1);
                let idx = ((sy * w + sx) as usize) * 4;
                for (a, &v) in acc.iter_mut().zip(&src[idx..idx + 4]) {
                    *a += u64::from(kw) * u64::from(v);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for (o, a) in dst[out..out + 4].iter_mut().zip(acc) {
                *o = ((a + 32768) >> 16).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/post.rs"]
mod tests;
