//! 批处理编排：逐张状态机 + 归档 + 影子上传

pub mod item;
pub mod pipeline;
pub mod ports;
pub mod source;
pub mod state_machine;

pub use item::BatchItem;
pub use pipeline::{BatchOrchestrator, BatchOutcome, ItemReport};
pub use ports::{
    AutoApprove, CancelToken, LogProgress, ProgressPort, ReviewPort, ReviewRequest,
    ScriptedReview, UserDecision,
};
pub use source::{scan_dir, FileSource, ImageSource, MemorySource};
pub use state_machine::{ItemEvent, ItemState, SkipReason};
