//! 影子上传：原图 + 归一化标注，后台发送，失败只记日志

use log::{debug, info, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::core::image_io;
use crate::core::label::NormalizedLabel;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("采集端返回非 2xx 状态: {0}")]
    Status(u16),
    #[error("上传队列已关闭")]
    QueueClosed,
    #[error("无效的 mime 类型: {0}")]
    Mime(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 采集端地址，None 表示不上传
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
            user_agent: concat!("findcash/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// 一次上传任务，始终携带原始字节而不是裁切结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub image: Vec<u8>,
    pub filename: String,
    pub label: NormalizedLabel,
}

/// 编排器只依赖这个能力；实现不得阻塞调用方
pub trait ExportPort: Send + Sync {
    fn send(&self, job: ExportJob);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub sent: u64,
    pub failed: u64,
}

/// 采集端回执 `{"success": true, "id": "..."}`
#[derive(Debug, Clone, Deserialize)]
struct CollectorReceipt {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
}

/// 无界队列 + 单个后台线程。没有背压，也不重试
pub struct ShadowExporter {
    sender: Option<Sender<ExportJob>>,
    worker: Option<JoinHandle<ExportStats>>,
}

impl ShadowExporter {
    pub fn spawn(endpoint: impl Into<String>, config: &ExportConfig) -> Result<Self, ExportError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let (sender, receiver) = crossbeam_channel::unbounded::<ExportJob>();
        let worker = thread::Builder::new()
            .name("shadow-exporter".to_string())
            .spawn(move || run_worker(client, endpoint, receiver))
            .map_err(|_| ExportError::QueueClosed)?;

        info!("📤 ShadowExporter: started");
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// 配置了 endpoint 才启动上传线程，否则返回 None
    pub fn from_config(config: &ExportConfig) -> Result<Option<Self>, ExportError> {
        match &config.endpoint {
            Some(endpoint) => Self::spawn(endpoint.clone(), config).map(Some),
            None => {
                debug!("📤 No collector endpoint configured, shadow export disabled");
                Ok(None)
            }
        }
    }

    /// 关闭队列并等待剩余任务发完
    pub fn shutdown(mut self) -> ExportStats {
        drop(self.sender.take());
        let stats = match self.worker.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                warn!("⚠️ Export worker panicked");
                ExportStats::default()
            }
            None => ExportStats::default(),
        };
        info!(
            "📤 ShadowExporter: drained, sent={} failed={}",
            stats.sent, stats.failed
        );
        stats
    }
}

impl ExportPort for ShadowExporter {
    fn send(&self, job: ExportJob) {
        let Some(sender) = &self.sender else {
            warn!("⚠️ {}: dropping {}", ExportError::QueueClosed, job.filename);
            return;
        };
        if let Err(err) = sender.send(job) {
            warn!("⚠️ {}: dropping {}", ExportError::QueueClosed, err.0.filename);
        }
    }
}

impl Drop for ShadowExporter {
    fn drop(&mut self) {
        // 未调用 shutdown 时直接分离线程，队列里剩下的任务由它自行发完
        self.sender.take();
        if self.worker.take().is_some() {
            debug!("🗑️ ShadowExporter: worker detached");
        }
    }
}

fn run_worker(client: Client, endpoint: String, receiver: Receiver<ExportJob>) -> ExportStats {
    let mut stats = ExportStats::default();
    for job in receiver {
        let filename = job.filename.clone();
        match upload(&client, &endpoint, job) {
            Ok(Some(receipt)) => {
                stats.sent += 1;
                debug!(
                    "📤 {} uploaded (success={}, id={:?})",
                    filename, receipt.success, receipt.id
                );
            }
            Ok(None) => {
                stats.sent += 1;
                debug!("📤 {} uploaded", filename);
            }
            Err(err) => {
                stats.failed += 1;
                warn!("⚠️ Shadow export of {} failed: {}", filename, err);
            }
        }
    }
    stats
}

fn upload(
    client: &Client,
    endpoint: &str,
    job: ExportJob,
) -> Result<Option<CollectorReceipt>, ExportError> {
    let form = build_form(job)?;
    let response = client.post(endpoint).multipart(form).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExportError::Status(status.as_u16()));
    }
    let body = response.text()?;
    Ok(serde_json::from_str(&body).ok())
}

/// 三个字段：`image`（二进制）、`label`（文本）、`filename`（文本）
fn build_form(job: ExportJob) -> Result<Form, ExportError> {
    let mime = image_io::guess_mime(&job.filename);
    let image = Part::bytes(job.image)
        .file_name(job.filename.clone())
        .mime_str(mime)
        .map_err(|e| ExportError::Mime(e.to_string()))?;
    Ok(Form::new()
        .part("image", image)
        .text("label", job.label.to_string())
        .text("filename", job.filename))
}

/// 什么也不发，只记日志；没有配置采集端时使用
#[derive(Debug, Default)]
pub struct NullExporter;

impl ExportPort for NullExporter {
    fn send(&self, job: ExportJob) {
        debug!("📤 Shadow export disabled, skipping {}", job.filename);
    }
}

/// 记录所有任务的测试替身
#[derive(Debug, Default)]
pub struct RecordingExporter {
    jobs: Mutex<Vec<ExportJob>>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<ExportJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }
}

impl ExportPort for RecordingExporter {
    fn send(&self, job: ExportJob) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job);
        }
    }
}
