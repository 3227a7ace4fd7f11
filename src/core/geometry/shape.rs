//! 轮廓与矩形几何：面积、外接框、最小面积外接矩形

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 正立外接框 (x, y, w, h)，像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisBox {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
}

impl AxisBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 以图像中心为中心、占宽高 `ratio` 的默认框
    pub fn centered(image_width: u32, image_height: u32, ratio: f64) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        let w = image_width as f64 * ratio;
        let h = image_height as f64 * ratio;
        Self::new(
            (image_width as f64 - w) / 2.0,
            (image_height as f64 - h) / 2.0,
            w,
            h,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// 裁剪到图像范围内，返回 (x0, y0, x1, y1)，可能为空区间；含 NaN/∞ 的框一律为空
    pub fn clamped_span(&self, image_width: u32, image_height: u32) -> (f64, f64, f64, f64) {
        if !self.is_finite() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let w = image_width as f64;
        let h = image_height as f64;
        let x0 = self.x.clamp(0.0, w);
        let y0 = self.y.clamp(0.0, h);
        let x1 = (self.x + self.width).clamp(x0, w);
        let y1 = (self.y + self.height).clamp(y0, h);
        (x0, y0, x1, y1)
    }
}

/// 任意角度矩形，`angle` 为 width 边相对水平方向的角度（度，y 轴向下）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    pub center: Point2,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

/// 外边界折线
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<Point2>,
}

impl Contour {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// 鞋带公式求多边形面积
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// 包含所有边界像素的正立外接框（闭区间，宽 = max - min + 1）
    pub fn bounding_box(&self) -> Option<AxisBox> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(AxisBox::new(
            min_x,
            min_y,
            max_x - min_x + 1.0,
            max_y - min_y + 1.0,
        ))
    }

    /// 旋转卡壳求最小面积外接矩形，角度归一化到 [-90, 0)
    pub fn min_area_rect(&self) -> Option<RotatedRect> {
        let hull = convex_hull(&self.points);
        if hull.is_empty() {
            return None;
        }

        if hull.len() < 3 {
            let bbox = Contour::new(hull).bounding_box()?;
            let w = bbox.width - 1.0;
            let h = bbox.height - 1.0;
            let c = Point2::new(bbox.x + w / 2.0, bbox.y + h / 2.0);
            return Some(normalize_rect(c, w, h, 0.0));
        }

        let n = hull.len();
        let mut best: Option<(f64, RotatedRect)> = None;

        for i in 0..n {
            let a = hull[i];
            let b = hull[(i + 1) % n];
            let ex = b.x - a.x;
            let ey = b.y - a.y;
            let len = (ex * ex + ey * ey).sqrt();
            if len < f64::EPSILON {
                continue;
            }
            let (ux, uy) = (ex / len, ey / len);
            let (vx, vy) = (-uy, ux);

            let mut min_u = f64::MAX;
            let mut max_u = f64::MIN;
            let mut min_v = f64::MAX;
            let mut max_v = f64::MIN;
            for p in &hull {
                let du = (p.x - a.x) * ux + (p.y - a.y) * uy;
                let dv = (p.x - a.x) * vx + (p.y - a.y) * vy;
                min_u = min_u.min(du);
                max_u = max_u.max(du);
                min_v = min_v.min(dv);
                max_v = max_v.max(dv);
            }

            let width = max_u - min_u;
            let height = max_v - min_v;
            let area = width * height;
            if best.as_ref().map_or(true, |(best_area, _)| area < *best_area) {
                let mu = (min_u + max_u) / 2.0;
                let mv = (min_v + max_v) / 2.0;
                let center = Point2::new(a.x + mu * ux + mv * vx, a.y + mu * uy + mv * vy);
                let angle = uy.atan2(ux).to_degrees();
                best = Some((area, normalize_rect(center, width, height, angle)));
            }
        }

        best.map(|(_, rect)| rect)
    }
}

/// 把任意方向角折叠到 [-90, 0)，必要时交换宽高
fn normalize_rect(center: Point2, width: f64, height: f64, angle: f64) -> RotatedRect {
    // 先折叠到 [-90, 90)
    let mut angle = (angle + 90.0).rem_euclid(180.0) - 90.0;
    let (mut width, mut height) = (width, height);
    if angle >= 0.0 {
        angle -= 90.0;
        std::mem::swap(&mut width, &mut height);
    }
    RotatedRect {
        center,
        width,
        height,
        angle,
    }
}

/// Andrew 单调链凸包，逆时针（y 轴向下时视觉上为顺时针）
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    let mut pts: Vec<Point2> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: Point2, a: Point2, b: Point2) -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// 面积最大的轮廓胜出；面积相同时保留先找到的那个
pub fn largest_by_area(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<(&Contour, f64)> = None;
    for contour in contours {
        let area = contour.area();
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((contour, area)),
        }
    }
    best.map(|(c, _)| c)
}
