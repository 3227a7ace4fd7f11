pub mod archive;
pub mod deskew;
pub mod detection;
pub mod error;
pub mod export;
pub mod geometry;
pub mod image_io;
pub mod label;

#[cfg(test)]
pub mod fixtures;

pub use archive::ArchiveSession;
pub use deskew::{CropConfig, CropResult, DeskewCropEngine};
pub use detection::{Detection, DetectionEngine, DetectionMode, DetectionProfile};
pub use error::CropError;
pub use export::{ExportConfig, ExportJob, ExportPort, ShadowExporter};
pub use label::NormalizedLabel;
