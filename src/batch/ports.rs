//! 编排器与宿主之间的抽象能力：人工复核、进度回报、取消

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::detection::{Detection, DetectionMode, Size2};
use crate::core::geometry::{AxisBox, Point2};

/// 发给复核界面的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewRequest {
    /// strict：旋转矩形
    Rotated {
        found: bool,
        center: Point2,
        size: Size2,
        angle: f64,
    },
    /// fast：正立框
    Upright {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        angle: f64,
    },
}

impl ReviewRequest {
    pub fn from_detection(detection: &Detection) -> Self {
        match (detection.mode, detection.bounding_box) {
            (DetectionMode::Fast, Some(bbox)) if detection.found => ReviewRequest::Upright {
                x: bbox.x,
                y: bbox.y,
                w: bbox.width,
                h: bbox.height,
                angle: 0.0,
            },
            _ => ReviewRequest::Rotated {
                found: detection.found,
                center: detection.center,
                size: detection.size,
                angle: detection.angle,
            },
        }
    }
}

/// 复核结论：采纳检测结果，或换成人工框。
/// 界面回传 `"approve"` 或 `{x, y, w, h}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "DecisionReply", into = "DecisionReply")]
pub enum UserDecision {
    Approve,
    Replace(AxisBox),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApproveSignal {
    Approve,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum DecisionReply {
    Signal(ApproveSignal),
    Replace(AxisBox),
}

impl From<DecisionReply> for UserDecision {
    fn from(reply: DecisionReply) -> Self {
        match reply {
            DecisionReply::Signal(ApproveSignal::Approve) => UserDecision::Approve,
            DecisionReply::Replace(bbox) => UserDecision::Replace(bbox),
        }
    }
}

impl From<UserDecision> for DecisionReply {
    fn from(decision: UserDecision) -> Self {
        match decision {
            UserDecision::Approve => DecisionReply::Signal(ApproveSignal::Approve),
            UserDecision::Replace(bbox) => DecisionReply::Replace(bbox),
        }
    }
}

pub trait ReviewPort {
    fn request(&mut self, name: &str, request: &ReviewRequest) -> UserDecision;
}

/// 无人值守：全部采纳
#[derive(Debug, Default)]
pub struct AutoApprove;

impl ReviewPort for AutoApprove {
    fn request(&mut self, _name: &str, _request: &ReviewRequest) -> UserDecision {
        UserDecision::Approve
    }
}

/// 按顺序回放预设结论，用完后一律采纳
#[derive(Debug, Default)]
pub struct ScriptedReview {
    decisions: VecDeque<UserDecision>,
    seen: Vec<(String, ReviewRequest)>,
}

impl ScriptedReview {
    pub fn new(decisions: Vec<UserDecision>) -> Self {
        Self {
            decisions: decisions.into(),
            seen: Vec::new(),
        }
    }

    pub fn seen(&self) -> &[(String, ReviewRequest)] {
        &self.seen
    }
}

impl ReviewPort for ScriptedReview {
    fn request(&mut self, name: &str, request: &ReviewRequest) -> UserDecision {
        self.seen.push((name.to_string(), request.clone()));
        self.decisions.pop_front().unwrap_or(UserDecision::Approve)
    }
}

pub trait ProgressPort {
    fn report(&mut self, index: usize, total: usize);
}

impl<F> ProgressPort for F
where
    F: FnMut(usize, usize),
{
    fn report(&mut self, index: usize, total: usize) {
        self(index, total)
    }
}

#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressPort for LogProgress {
    fn report(&mut self, index: usize, total: usize) {
        info!("⏳ Progress {}/{}", index, total);
    }
}

/// 协作式取消，只在两张图片之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
