//! 图片数据 URL 编码

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::Path;

const IMAGE_PREFIX: &str = "data:image/";

/// 是否为 `data:image/...` 形式的数据 URL
pub fn is_image_data_url(value: &str) -> bool {
    value.starts_with(IMAGE_PREFIX) && value.contains(";base64,")
}

pub fn data_url_from_bytes(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// 按扩展名推断 MIME 类型
pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// 读取图片文件并编码为数据 URL（不做压缩）
pub fn data_url_from_file(path: &Path) -> Result<String> {
    let mime = image_mime_for(path).ok_or_else(|| {
        Error::Validation(format!("Unsupported image type: {}", path.display()))
    })?;
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(Error::Validation(format!("Image file is empty: {}", path.display())));
    }
    Ok(data_url_from_bytes(&bytes, mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_and_detect() {
        let url = data_url_from_bytes(&[0x89, 0x50, 0x4e, 0x47], "image/png");
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(is_image_data_url(&url));
        assert!(url.ends_with(";base64,iVBORw=="));
        assert!(!is_image_data_url("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(image_mime_for(Path::new("icon.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for(Path::new("notes.txt")), None);
        assert!(data_url_from_file(Path::new("notes.txt")).is_err());
    }
}
