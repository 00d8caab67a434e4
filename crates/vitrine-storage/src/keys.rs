//! Shared key generation for rendition storage.
//!
//! Key format: `products/{product_id}/{image_id}/{tier}.{ext}`.

use uuid::Uuid;
use vitrine_core::{RenditionFormat, RenditionTier};

/// Generate the storage key for one rendition of a product image.
///
/// All writers must use this format so the delete path can reconstruct the
/// full artifact set from the recorded renditions alone.
pub fn rendition_storage_key(
    product_id: &str,
    image_id: Uuid,
    tier: RenditionTier,
    format: RenditionFormat,
) -> String {
    format!(
        "products/{}/{}/{}.{}",
        product_id,
        image_id,
        tier.as_str(),
        format.extension()
    )
}
