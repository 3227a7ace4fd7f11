//! 几何基础算子：边缘、形态学、连通域、轮廓、最小外接矩形、仿射重采样

pub mod ops;
pub mod shape;
pub mod warp;

pub use ops::{Components, GeometryOps};
pub use shape::{AxisBox, Contour, Point2, RotatedRect};
pub use warp::Affine2;
