use log::{debug, info, warn};
use std::thread;

use super::item::BatchItem;
use super::ports::{CancelToken, ProgressPort, ReviewPort, ReviewRequest, UserDecision};
use super::source::ImageSource;
use super::state_machine::{ItemEvent, ItemState, SkipReason};
use crate::config::PipelineConfig;
use crate::core::archive::ArchiveSession;
use crate::core::deskew::DeskewCropEngine;
use crate::core::detection::DetectionEngine;
use crate::core::error::CropError;
use crate::core::export::{ExportJob, ExportPort};
use crate::core::geometry::GeometryOps;

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub name: String,
    pub state: ItemState,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// 封存后的压缩包字节
    pub archive: Vec<u8>,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub reports: Vec<ItemReport>,
}

/// 逐张驱动：分析 → (人工复核) → 裁切 → 归档 → 影子上传
pub struct BatchOrchestrator {
    engine: DetectionEngine,
    cropper: DeskewCropEngine,
    class_id: u32,
    yield_between_items: bool,
}

impl BatchOrchestrator {
    pub fn new(config: &PipelineConfig) -> Self {
        let ops = GeometryOps::new();
        Self {
            engine: DetectionEngine::new(ops, config.detection.clone()),
            cropper: DeskewCropEngine::new(ops, config.crop.clone()),
            class_id: config.class_id,
            yield_between_items: config.yield_between_items,
        }
    }

    /// 检测原始字节；解码失败直接跳过
    pub fn analyze(&self, item: &mut BatchItem) -> Result<(), CropError> {
        match self.engine.detect_bytes(&item.bytes) {
            Ok(detection) => {
                item.detection = Some(detection);
                item.advance(ItemEvent::Analyze)
            }
            Err(err) => Self::skip(item, err),
        }
    }

    pub fn review_request(&self, item: &BatchItem) -> Option<ReviewRequest> {
        if item.state != ItemState::Analyzed {
            return None;
        }
        item.detection.as_ref().map(ReviewRequest::from_detection)
    }

    pub fn apply_decision(&self, item: &mut BatchItem, decision: UserDecision) -> Result<(), CropError> {
        match decision {
            UserDecision::Approve => Ok(()),
            UserDecision::Replace(bbox) => {
                debug!("✏️ {} corrected by user: {:?}", item.name, bbox);
                item.correction = Some(bbox);
                item.advance(ItemEvent::Review)
            }
        }
    }

    /// 人工框直接按框切；否则用保存的检测结果对原始字节重新矫正
    pub fn finalize(&self, item: &mut BatchItem) -> Result<(), CropError> {
        if item.state.is_terminal() {
            return Ok(());
        }

        let result = match (item.correction, item.detection.as_ref()) {
            (Some(bbox), _) => self.cropper.crop_box_bytes(&item.bytes, &bbox),
            (None, Some(detection)) if detection.found => {
                self.cropper.crop_bytes(&item.bytes, detection)
            }
            _ => Err(CropError::NotFound),
        };

        match result {
            Ok(crop) if !crop.is_empty() => {
                item.crop = Some(crop);
                item.advance(ItemEvent::Finalize)
            }
            Ok(_) => Self::skip(item, CropError::DegenerateCrop),
            Err(err) => Self::skip(item, err),
        }
    }

    /// 写入归档并提交上传。上传与归档结果无关，只要有可用的框就发
    pub fn commit(
        &self,
        item: &mut BatchItem,
        archive: &mut ArchiveSession,
        exporter: &dyn ExportPort,
    ) -> Result<(), CropError> {
        if item.state == ItemState::Finalized {
            if let Some(crop) = &item.crop {
                match archive.put(&item.entry_name(), &crop.png) {
                    Ok(()) => item.advance(ItemEvent::Archive)?,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => Self::skip(item, err)?,
                }
            }
        }

        match item.label(self.class_id) {
            Some(label) if label.w > 0.0 && label.h > 0.0 => exporter.send(ExportJob {
                image: item.bytes.clone(),
                filename: item.name.clone(),
                label,
            }),
            _ => debug!("   {} has no usable box, nothing to export", item.name),
        }
        Ok(())
    }

    pub fn process_item(
        &self,
        source: &dyn ImageSource,
        archive: &mut ArchiveSession,
        review: &mut dyn ReviewPort,
        exporter: &dyn ExportPort,
    ) -> Result<BatchItem, CropError> {
        let mut item = match source.read() {
            Ok(bytes) => BatchItem::new(source.name(), bytes),
            Err(err) => {
                let mut item = BatchItem::new(source.name(), Vec::new());
                Self::skip(&mut item, err)?;
                return Ok(item);
            }
        };

        self.analyze(&mut item)?;
        if let Some(request) = self.review_request(&item) {
            let decision = review.request(&item.name, &request);
            self.apply_decision(&mut item, decision)?;
        }
        self.finalize(&mut item)?;
        self.commit(&mut item, archive, exporter)?;
        Ok(item)
    }

    /// 串行处理整批；单张失败只计入 skipped，致命错误中止
    pub fn run<S: ImageSource>(
        &self,
        sources: &[S],
        review: &mut dyn ReviewPort,
        progress: &mut dyn ProgressPort,
        exporter: &dyn ExportPort,
        cancel: &CancelToken,
    ) -> Result<BatchOutcome, CropError> {
        let total = sources.len();
        info!("🚀 Batch started: {} images", total);

        let mut archive = ArchiveSession::open();
        let mut reports = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, source) in sources.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("⏹️ Batch cancelled after {}/{}", index, total);
                cancelled = true;
                break;
            }

            let item = self.process_item(source, &mut archive, review, exporter)?;
            reports.push(ItemReport {
                name: item.name,
                state: item.state,
            });
            progress.report(index + 1, total);

            if self.yield_between_items {
                thread::yield_now();
            }
        }

        let archive = archive.finalize()?;
        let succeeded = reports
            .iter()
            .filter(|r| r.state == ItemState::Archived)
            .count();
        let skipped = reports
            .iter()
            .filter(|r| matches!(r.state, ItemState::Skipped(_)))
            .count();
        info!(
            "🏁 Batch finished: {}/{} succeeded, {} skipped",
            succeeded, total, skipped
        );

        Ok(BatchOutcome {
            archive,
            total,
            succeeded,
            skipped,
            cancelled,
            reports,
        })
    }

    fn skip(item: &mut BatchItem, err: CropError) -> Result<(), CropError> {
        match SkipReason::from_error(&err) {
            Some(reason) => {
                warn!("⚠️ Skipping {}: {}", item.name, err);
                item.advance(ItemEvent::Fail(reason))
            }
            None => Err(err),
        }
    }
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
