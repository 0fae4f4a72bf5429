//! Five-point face alignment onto the 112x112 ArcFace template.
//!
//! Gallery embeddings are computed from faces warped so that the eyes, nose
//! tip and mouth corners land on fixed template positions. Query faces go
//! through the same warp before embedding.

use image::{Rgb, RgbImage};

use crate::shared::frame::Frame;

/// Side of the aligned crop in pixels.
pub const ALIGNED_SIZE: u32 = 112;

/// Template positions for left eye, right eye, nose tip, left and right
/// mouth corner in a 112x112 crop.
pub const ARCFACE_TEMPLATE: [[f64; 2]; 5] = [
    [38.2946, 51.6963],
    [73.5318, 51.5014],
    [56.0252, 71.7366],
    [41.5493, 92.3655],
    [70.7299, 92.2041],
];

/// Rotation, uniform scale and translation:
/// `x' = a*x - b*y + tx`, `y' = b*x + a*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform {
    /// Least-squares fit mapping `src` points onto `dst`. `None` when the
    /// source points are collapsed onto one spot.
    pub fn estimate(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Self> {
        if src.len() != dst.len() || src.len() < 2 {
            return None;
        }
        let n = src.len() as f64;
        let mean = |pts: &[[f64; 2]]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
            [sx / n, sy / n]
        };
        let ms = mean(src);
        let md = mean(dst);

        let (mut var, mut dot, mut cross) = (0.0, 0.0, 0.0);
        for (s, d) in src.iter().zip(dst) {
            let (xs, ys) = (s[0] - ms[0], s[1] - ms[1]);
            let (xd, yd) = (d[0] - md[0], d[1] - md[1]);
            var += xs * xs + ys * ys;
            dot += xs * xd + ys * yd;
            cross += xs * yd - ys * xd;
        }
        if var < 1e-9 {
            return None;
        }

        let a = dot / var;
        let b = cross / var;
        Some(Self {
            a,
            b,
            tx: md[0] - (a * ms[0] - b * ms[1]),
            ty: md[1] - (b * ms[0] + a * ms[1]),
        })
    }

    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.a * p[0] - self.b * p[1] + self.tx,
            self.b * p[0] + self.a * p[1] + self.ty,
        ]
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let (a, b) = (self.a / det, -self.b / det);
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

/// Warps the face described by `keypoints` onto the ArcFace template.
pub fn align_face(frame: &Frame, keypoints: &[[f64; 2]; 5]) -> Option<RgbImage> {
    let transform = SimilarityTransform::estimate(keypoints, &ARCFACE_TEMPLATE)?;
    warp(frame, &transform, ALIGNED_SIZE)
}

/// Samples each output pixel from the frame through the inverse of
/// `transform`, bilinearly. Pixels mapping outside the frame are black.
pub fn warp(frame: &Frame, transform: &SimilarityTransform, size: u32) -> Option<RgbImage> {
    let inverse = transform.inverse()?;
    Some(RgbImage::from_fn(size, size, |x, y| {
        let [sx, sy] = inverse.apply([x as f64, y as f64]);
        sample_bilinear(frame, sx, sy)
    }))
}

fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let data = frame.data();

    let texel = |px: i64, py: i64, c: usize| -> f64 {
        if px < 0 || py < 0 || px >= w || py >= h {
            return 0.0;
        }
        data[((py * w + px) * 3) as usize + c] as f64
    };

    let mut out = [0u8; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = texel(x0, y0, c) * (1.0 - fx) + texel(x0 + 1, y0, c) * fx;
        let bottom = texel(x0, y0 + 1, c) * (1.0 - fx) + texel(x0 + 1, y0 + 1, c) * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
