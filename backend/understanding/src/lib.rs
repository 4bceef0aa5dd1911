pub mod extract;
pub mod mime;
pub mod ocr;
pub mod vision;

pub use extract::{read_api_key, strip_code_fences, LlmFieldExtractor};
pub use mime::detect_image_mime;
pub use ocr::VisionOcr;
pub use vision::{complete_text, describe_image, ProviderKind, VisionProvider};
