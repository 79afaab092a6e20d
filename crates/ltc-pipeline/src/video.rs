//! Video stage seam.

use async_trait::async_trait;

use ltc_media::{AssemblyOutput, AssemblyRequest, MediaResult, VideoAssembler};
use ltc_storage::AssetUploader;

/// Turns narration plus images into one video reference.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(&self, request: &AssemblyRequest<'_>, uploader: &dyn AssetUploader) -> MediaResult<AssemblyOutput>;
}

#[async_trait]
impl VideoRenderer for VideoAssembler {
    async fn render(&self, request: &AssemblyRequest<'_>, uploader: &dyn AssetUploader) -> MediaResult<AssemblyOutput> {
        self.assemble(request, uploader).await
    }
}
