//! 纸钞检测：strict（最小外接矩形 + 角度）与 fast（正立框）两档

pub mod engine;
pub mod profile;

pub use engine::{Detection, DetectionEngine, Size2};
pub use profile::{DetectionMode, DetectionProfile};
