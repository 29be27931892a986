pub mod dispositions;
pub mod files;
pub mod links;
pub mod notifications;
pub mod reports;

use serde::Deserialize;
use surat_core::disposition::Attachment;
use validator::Validate;

/// An external link supplied as an attachment or report.
#[derive(Debug, Deserialize, Validate)]
pub struct LinkAttachmentInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
}

impl From<LinkAttachmentInput> for Attachment {
    fn from(input: LinkAttachmentInput) -> Self {
        Attachment::link(input.name, input.url)
    }
}
