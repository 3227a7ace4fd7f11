//! 原始字节 <-> RGB 像素缓冲

use super::error::CropError;
use image::{GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// 解码任意容器格式（JPEG/PNG/BMP/TIFF/WEBP），丢弃 alpha，统一为 3 通道
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, CropError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let r = p[0] as u32;
        let g = p[1] as u32;
        let b = p[2] as u32;
        image::Luma([((r * 299 + g * 587 + b * 114) / 1000) as u8])
    })
}

/// 无损编码为 PNG
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, CropError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(CropError::Encode)?;
    Ok(buffer.into_inner())
}

/// 按扩展名猜测上传时使用的 mime
pub fn guess_mime(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
