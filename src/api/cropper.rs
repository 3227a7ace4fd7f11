//! 纸钞裁切器 - 检测 + 人工复核 + 归档

use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;

use crate::batch::{
    scan_dir, AutoApprove, BatchItem, BatchOrchestrator, BatchOutcome, CancelToken, ItemState,
    LogProgress, ReviewRequest, UserDecision,
};
use crate::config::PipelineConfig;
use crate::core::archive::ArchiveSession;
use crate::core::error::CropError;
use crate::core::export::{ExportPort, ExportStats, NullExporter, ShadowExporter};

/// 等待宿主复核的一张图片
#[derive(Debug, Clone)]
pub struct PendingReview {
    pub id: u64,
    pub name: String,
    /// 解码失败时为 None，此时图片已被跳过
    pub request: Option<ReviewRequest>,
    pub state: ItemState,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub archive: Vec<u8>,
    pub archived: usize,
    pub skipped: usize,
    pub export: ExportStats,
}

/// 两阶段接口：先 `detect` 给出检测框，宿主确认后 `commit`，最后 `finish` 拿到压缩包
///
/// ```ignore
/// let mut cropper = BanknoteCropper::create(PipelineConfig::default())?;
/// let pending = cropper.detect("a.jpg", bytes)?;
/// cropper.commit(pending.id, UserDecision::Approve)?;
/// let summary = cropper.finish()?;
/// ```
pub struct BanknoteCropper {
    config: PipelineConfig,
    orchestrator: BatchOrchestrator,
    archive: ArchiveSession,
    exporter: Option<ShadowExporter>,
    pending: HashMap<u64, BatchItem>,
    next_id: u64,
    archived: usize,
    skipped: usize,
}

impl BanknoteCropper {
    /// 上传线程启动失败不影响裁切，只是不再上传
    pub fn create(config: PipelineConfig) -> Result<Self, CropError> {
        crate::init_logging();
        info!(
            "💵 BanknoteCropper: created ({:?}, padding={})",
            config.detection.mode, config.crop.padding
        );

        let exporter = match ShadowExporter::from_config(&config.export) {
            Ok(exporter) => exporter,
            Err(err) => {
                warn!("⚠️ Shadow export unavailable: {}", err);
                None
            }
        };

        Ok(Self {
            orchestrator: BatchOrchestrator::new(&config),
            config,
            archive: ArchiveSession::open(),
            exporter,
            pending: HashMap::new(),
            next_id: 0,
            archived: 0,
            skipped: 0,
        })
    }

    /// 检测一张图片并挂起，等待 `commit`
    pub fn detect(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<PendingReview, CropError> {
        let mut item = BatchItem::new(name, bytes);
        self.orchestrator.analyze(&mut item)?;

        let id = self.next_id;
        self.next_id += 1;
        let pending = PendingReview {
            id,
            name: item.name.clone(),
            request: self.orchestrator.review_request(&item),
            state: item.state,
        };
        if item.state.is_terminal() {
            self.skipped += 1;
        } else {
            self.pending.insert(id, item);
        }
        Ok(pending)
    }

    /// 按复核结论裁切、归档并提交上传
    pub fn commit(&mut self, id: u64, decision: UserDecision) -> Result<ItemState, CropError> {
        let Some(mut item) = self.pending.remove(&id) else {
            return Err(CropError::InvalidTransition(format!(
                "commit of unknown item {}",
                id
            )));
        };

        self.orchestrator.apply_decision(&mut item, decision)?;
        self.orchestrator.finalize(&mut item)?;
        let exporter: &dyn ExportPort = match &self.exporter {
            Some(exporter) => exporter,
            None => &NullExporter,
        };
        self.orchestrator
            .commit(&mut item, &mut self.archive, exporter)?;

        match item.state {
            ItemState::Archived => self.archived += 1,
            _ => self.skipped += 1,
        }
        Ok(item.state)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 封存压缩包并等待上传队列发完；未提交的图片计为跳过
    pub fn finish(&mut self) -> Result<SessionSummary, CropError> {
        let archive = self.archive.finalize()?;
        let abandoned = self.pending.len();
        if abandoned > 0 {
            warn!("⚠️ {} images were never committed", abandoned);
            self.pending.clear();
        }
        let export = self
            .exporter
            .take()
            .map(ShadowExporter::shutdown)
            .unwrap_or_default();

        Ok(SessionSummary {
            archive,
            archived: self.archived,
            skipped: self.skipped + abandoned,
            export,
        })
    }

    /// 无人值守处理整个文件夹，使用独立的压缩包
    pub fn process_folder(
        &self,
        dir: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<BatchOutcome, CropError> {
        let sources = scan_dir(dir)?;
        let exporter: &dyn ExportPort = match &self.exporter {
            Some(exporter) => exporter,
            None => &NullExporter,
        };
        self.orchestrator
            .run(&sources, &mut AutoApprove, &mut LogProgress, exporter, cancel)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for BanknoteCropper {
    fn drop(&mut self) {
        info!("🗑️ BanknoteCropper: released");
    }
}
