use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};
use log::warn;

use super::shape::{self, AxisBox, Contour, Point2, RotatedRect};
use super::warp::{self, Affine2};

/// 连通域标记结果，`areas[label]` 为该标签的像素数，`areas[0]` 为背景
pub struct Components {
    pub labels: ImageBuffer<Luma<u32>, Vec<u32>>,
    pub areas: Vec<u64>,
}

/// 无状态几何算子集合，由调用方显式构造并注入检测引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryOps;

impl GeometryOps {
    pub fn new() -> Self {
        Self
    }

    /// Canny 风格双阈值边缘图，边缘 = 255
    pub fn edge_map(&self, gray: &GrayImage, low: f32, high: f32) -> GrayImage {
        canny(gray, low, high)
    }

    /// 方形结构元膨胀，`kernel_size` 为边长（如 71 表示 71x71）
    pub fn dilate(&self, binary: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
        let radius = kernel_radius(kernel_size);
        let mut out = binary.clone();
        if radius == 0 {
            return out;
        }
        for _ in 0..iterations.max(1) {
            out = morphology::dilate(&out, Norm::LInf, radius);
        }
        out
    }

    /// 与 `dilate` 对称的方形腐蚀
    pub fn erode(&self, binary: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
        let radius = kernel_radius(kernel_size);
        let mut out = binary.clone();
        if radius == 0 {
            return out;
        }
        for _ in 0..iterations.max(1) {
            out = morphology::erode(&out, Norm::LInf, radius);
        }
        out
    }

    /// 8 邻接连通域标记，并统计每个标签的面积
    pub fn connected_components(&self, binary: &GrayImage) -> Components {
        let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
        let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
        let mut areas = vec![0u64; max_label + 1];
        for p in labels.pixels() {
            areas[p[0] as usize] += 1;
        }
        Components { labels, areas }
    }

    /// 只保留面积 >= `min_area` 的连通域，重建二值掩码
    pub fn filter_by_area(&self, components: &Components, min_area: u64) -> GrayImage {
        let keep: Vec<bool> = components
            .areas
            .iter()
            .enumerate()
            .map(|(label, &area)| label != 0 && area >= min_area)
            .collect();
        let (w, h) = components.labels.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            let label = components.labels.get_pixel(x, y)[0] as usize;
            if keep[label] {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    /// 只取最外层边界（不在任何孔洞内部的外轮廓）
    pub fn find_contours(&self, mask: &GrayImage) -> Vec<Contour> {
        find_contours::<i32>(mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                Contour::new(
                    c.points
                        .iter()
                        .map(|p| Point2::new(p.x as f64, p.y as f64))
                        .collect(),
                )
            })
            .collect()
    }

    pub fn largest_by_area<'a>(&self, contours: &'a [Contour]) -> Option<&'a Contour> {
        shape::largest_by_area(contours)
    }

    pub fn min_area_rect(&self, contour: &Contour) -> Option<RotatedRect> {
        contour.min_area_rect()
    }

    pub fn axis_aligned_bounding_box(&self, contour: &Contour) -> Option<AxisBox> {
        contour.bounding_box()
    }

    /// 绕 `center` 旋转并平移到新画布 `(out_w, out_h)`，双三次插值 + 边缘复制
    pub fn affine_rotate(
        &self,
        image: &RgbImage,
        center: Point2,
        angle_deg: f64,
        out_w: u32,
        out_h: u32,
        translate: (f64, f64),
    ) -> RgbImage {
        let matrix = Affine2::rotation(center, angle_deg, 1.0).translate(translate.0, translate.1);
        warp::warp_affine(image, &matrix, out_w, out_h)
    }
}

/// imageproc 的形态学半径是 u8，超过 255 的核按 511 处理
fn kernel_radius(kernel_size: u32) -> u8 {
    let radius = kernel_size / 2;
    if radius > u8::MAX as u32 {
        warn!(
            "⚠️ Kernel {} exceeds the largest supported size {}, capped",
            kernel_size,
            u8::MAX as u32 * 2 + 1
        );
        return u8::MAX;
    }
    radius as u8
}
