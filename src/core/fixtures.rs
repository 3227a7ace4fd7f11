//! 测试用合成图像

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// 黑底上画一个以画面中心为中心、旋转 `angle_deg` 的白色实心矩形。
/// `rect_w` 所在的边方向与水平方向夹角为 `angle_deg`（y 轴向下）
pub fn rotated_rect_image(w: u32, h: u32, rect_w: f64, rect_h: f64, angle_deg: f64) -> RgbImage {
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (s, c) = angle_deg.to_radians().sin_cos();
    RgbImage::from_fn(w, h, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        // 投影到矩形自身坐标系
        let u = dx * c + dy * s;
        let v = -dx * s + dy * c;
        if u.abs() <= rect_w / 2.0 && v.abs() <= rect_h / 2.0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// 把 PNG 重新编码成 JPEG，模拟相机原图
pub fn jpeg_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}
