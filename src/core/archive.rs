//! 单批次内存压缩归档

use log::{debug, error, info};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::error::CropError;

/// 一次批处理只持有一个；`finalize` 之后不可再写
pub struct ArchiveSession {
    writer: Option<ZipWriter<Cursor<Vec<u8>>>>,
    entries: Vec<String>,
}

impl ArchiveSession {
    pub fn open() -> Self {
        debug!("📦 ArchiveSession: opened");
        Self {
            writer: Some(ZipWriter::new(Cursor::new(Vec::new()))),
            entries: Vec::new(),
        }
    }

    /// 追加一个条目，不重写已有条目。重名由调用方负责避免
    pub fn put(&mut self, name: &str, bytes: &[u8]) -> Result<(), CropError> {
        let Some(writer) = self.writer.as_mut() else {
            error!("❌ put({}) after finalize", name);
            return Err(CropError::ArchiveMisuse(name.to_string()));
        };

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
        self.entries.push(name.to_string());
        debug!("📦 + {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    /// 写入目录并返回完整字节，只能调用一次
    pub fn finalize(&mut self) -> Result<Vec<u8>, CropError> {
        let Some(writer) = self.writer.take() else {
            return Err(CropError::ArchiveMisuse("finalize".to_string()));
        };
        let blob = writer.finish()?.into_inner();
        info!(
            "📦 Archive finalized: {} entries, {} bytes",
            self.entries.len(),
            blob.len()
        );
        Ok(blob)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_finalized(&self) -> bool {
        self.writer.is_none()
    }
}

impl Default for ArchiveSession {
    fn default() -> Self {
        Self::open()
    }
}
