//! 2x3 仿射矩阵与双三次插值重采样

use image::RgbImage;
use rayon::prelude::*;

use super::shape::Point2;

/// 2x3 仿射矩阵，映射 源坐标 -> 目标坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub m: [[f64; 3]; 2],
}

impl Affine2 {
    #[cfg(test)]
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    /// 绕 `center` 旋转 `angle_deg` 度（正角度在 y 向下的图像上逆时针），缩放 `scale`
    pub fn rotation(center: Point2, angle_deg: f64, scale: f64) -> Self {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let alpha = scale * cos;
        let beta = scale * sin;
        Self {
            m: [
                [alpha, beta, (1.0 - alpha) * center.x - beta * center.y],
                [-beta, alpha, beta * center.x + (1.0 - alpha) * center.y],
            ],
        }
    }

    pub fn translate(mut self, dx: f64, dy: f64) -> Self {
        self.m[0][2] += dx;
        self.m[1][2] += dy;
        self
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        Point2::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2],
        )
    }

    pub fn invert(&self) -> Option<Self> {
        let [[a, b, c], [d, e, f]] = self.m;
        let det = a * e - b * d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;
        Some(Self {
            m: [
                [ia, ib, -(ia * c + ib * f)],
                [id, ie, -(id * c + ie * f)],
            ],
        })
    }
}

/// a = -0.75 的三次卷积核
fn cubic_weights(t: f64) -> [f32; 4] {
    const A: f64 = -0.75;
    let w0 = ((A * (t + 1.0) - 5.0 * A) * (t + 1.0) + 8.0 * A) * (t + 1.0) - 4.0 * A;
    let w1 = ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0;
    let w2 = ((A + 2.0) * (1.0 - t) - (A + 3.0)) * (1.0 - t) * (1.0 - t) + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0 as f32, w1 as f32, w2 as f32, w3 as f32]
}

/// 按 `matrix`（源 -> 目标）把 `src` 重采样到 `out_w x out_h` 的新画布。
/// 越界像素取边缘复制值。
pub fn warp_affine(src: &RgbImage, matrix: &Affine2, out_w: u32, out_h: u32) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);
    if out_w == 0 || out_h == 0 || src.width() == 0 || src.height() == 0 {
        return out;
    }
    let Some(inv) = matrix.invert() else {
        return out;
    };

    let sw = src.width() as i64;
    let sh = src.height() as i64;
    let src_raw = src.as_raw();
    let row_len = out_w as usize * 3;

    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..out_w as usize {
                let p = inv.apply(Point2::new(x as f64, y as f64));
                let fx = p.x.floor();
                let fy = p.y.floor();
                let wx = cubic_weights(p.x - fx);
                let wy = cubic_weights(p.y - fy);
                let ix = fx as i64;
                let iy = fy as i64;

                let mut acc = [0f32; 3];
                for (j, wyj) in wy.iter().enumerate() {
                    let sy = (iy - 1 + j as i64).clamp(0, sh - 1) as usize;
                    for (i, wxi) in wx.iter().enumerate() {
                        let sx = (ix - 1 + i as i64).clamp(0, sw - 1) as usize;
                        let idx = (sy * sw as usize + sx) * 3;
                        let w = wyj * wxi;
                        acc[0] += src_raw[idx] as f32 * w;
                        acc[1] += src_raw[idx + 1] as f32 * w;
                        acc[2] += src_raw[idx + 2] as f32 * w;
                    }
                }

                let o = x * 3;
                for c in 0..3 {
                    row[o + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    out
}
