use base64::{ engine::general_purpose::STANDARD, Engine as _ };

use super::chat::{ ContentBlock, MediaSource };

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// A file uploaded alongside one chat submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachedFile {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), media_type: media_type.into(), data }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Inline base64 block; images become `image`, everything else `document`.
    pub fn to_content_block(&self) -> ContentBlock {
        let source = MediaSource::Base64 {
            media_type: self.media_type.clone(),
            data: STANDARD.encode(&self.data),
        };
        if self.is_image() {
            ContentBlock::Image { source }
        } else {
            let title = Some(self.name.clone()).filter(|n| !n.is_empty());
            ContentBlock::Document { source, title }
        }
    }
}
