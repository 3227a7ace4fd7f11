use thiserror::Error;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("图像解码失败: {0}")]
    Decode(#[from] image::ImageError),
    #[error("PNG 编码失败: {0}")]
    Encode(image::ImageError),
    #[error("未找到纸钞轮廓")]
    NotFound,
    #[error("裁切窗口面积为零")]
    DegenerateCrop,
    #[error("归档已封存，禁止写入: {0}")]
    ArchiveMisuse(String),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置解析失败: {0}")]
    Config(#[from] serde_json::Error),
    #[error("非法状态转换: {0}")]
    InvalidTransition(String),
}

impl CropError {
    /// 只有流水线顺序错误才会中止整个批次，单张图片的失败一律跳过
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CropError::ArchiveMisuse(_) | CropError::InvalidTransition(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ordering_bugs_are_fatal() {
        assert!(CropError::ArchiveMisuse("a.png".into()).is_fatal());
        assert!(CropError::InvalidTransition("Pending -> Archived".into()).is_fatal());
        assert!(!CropError::NotFound.is_fatal());
        assert!(!CropError::DegenerateCrop.is_fatal());
    }
}
