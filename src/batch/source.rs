//! 批处理输入：文件夹中的图片或内存中的字节

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::CropError;

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png|bmp|tiff?|webp)$").expect("static regex"));

pub trait ImageSource {
    fn name(&self) -> &str;
    /// 读取原始字节，每次调用都重新读
    fn read(&self) -> Result<Vec<u8>, CropError>;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

impl ImageSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Vec<u8>, CropError> {
        Ok(fs::read(&self.path)?)
    }
}

#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl ImageSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Vec<u8>, CropError> {
        Ok(self.bytes.clone())
    }
}

pub fn is_image_file(name: &str) -> bool {
    IMAGE_EXTENSION.is_match(name)
}

/// 列出目录下（不递归）所有图片文件，按文件名排序
pub fn scan_dir(dir: impl AsRef<Path>) -> Result<Vec<FileSource>, CropError> {
    let dir = dir.as_ref();
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let source = FileSource::new(entry.path());
        if is_image_file(source.name()) {
            sources.push(source);
        } else {
            debug!("   skip non-image {}", source.name());
        }
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    info!("📂 Found {} images in {}", sources.len(), dir.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        for name in ["a.jpg", "b.JPEG", "c.png", "d.bmp", "e.tif", "f.TIFF", "g.webp"] {
            assert!(is_image_file(name), "{}", name);
        }
        for name in ["a.gif", "notes.txt", "jpg", "archive.png.zip"] {
            assert!(!is_image_file(name), "{}", name);
        }
    }

    #[test]
    fn test_scan_dir_sorted_and_filtered() {
        let dir = std::env::temp_dir().join(format!("findcash_scan_{}", std::process::id()));
        fs::create_dir_all(dir.join("nested.png")).unwrap();
        for name in ["b.png", "a.JPG", "readme.md"] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        let names: Vec<String> = scan_dir(&dir)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(names, ["a.JPG", "b.png"]);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let result = scan_dir("/definitely/not/here");
        assert!(matches!(result, Err(CropError::Io(_))));
    }

    #[test]
    fn test_memory_source_reads_bytes() {
        let source = MemorySource::new("x.png", vec![1, 2, 3]);
        assert_eq!(source.name(), "x.png");
        assert_eq!(source.read().unwrap(), [1, 2, 3]);
    }
}
