//! 上传校验服务 - 业务能力层
//!
//! 只负责判断"这个文件能不能上传"，不做任何网络调用

use std::path::Path;

use tracing::debug;

use crate::error::ValidationError;

/// PDF 文件头
const PDF_SIGNATURE: &[u8] = b"%PDF-";
const PDF_MIME: &str = "application/pdf";

/// 可接受的文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
}

impl DocumentKind {
    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => PDF_MIME,
        }
    }
}

/// 上传校验器
pub struct UploadValidator {
    max_bytes: u64,
}

impl UploadValidator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// 依次检查格式、大小、文件头
    ///
    /// # 参数
    /// - `file_name`: 用户选择的文件名
    /// - `mime`: 浏览器 / 调用方声明的 MIME，可为空
    /// - `bytes`: 文件内容
    pub fn validate(
        &self,
        file_name: &str,
        mime: Option<&str>,
        bytes: &[u8],
    ) -> Result<DocumentKind, ValidationError> {
        let kind = detect_kind(file_name, mime).ok_or_else(|| ValidationError::UnsupportedFormat {
            file_name: file_name.to_string(),
            mime: mime.unwrap_or("unknown").to_string(),
        })?;

        if bytes.is_empty() {
            return Err(ValidationError::Empty {
                file_name: file_name.to_string(),
            });
        }

        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(ValidationError::SignatureMismatch {
                file_name: file_name.to_string(),
            });
        }

        debug!("文件校验通过: {} ({} 字节)", file_name, size);
        Ok(kind)
    }
}

/// 扩展名与 MIME 都必须指向 PDF（MIME 缺失时只看扩展名）
fn detect_kind(file_name: &str, mime: Option<&str>) -> Option<DocumentKind> {
    let ext_ok = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let mime_ok = match mime {
        Some(m) if !m.trim().is_empty() => m.trim().eq_ignore_ascii_case(PDF_MIME),
        _ => true,
    };

    (ext_ok && mime_ok).then_some(DocumentKind::Pdf)
}
