//! Image MIME detection by file extension.

use std::path::Path;

/// MIME type for a receipt image, or `None` if the extension isn't an image
/// format vision endpoints accept.
pub fn detect_image_mime(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png"          => Some("image/png"),
        "gif"          => Some("image/gif"),
        "webp"         => Some("image/webp"),
        "bmp"          => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "heic"         => Some("image/heic"),
        _              => None,
    }
}
