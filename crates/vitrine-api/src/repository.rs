//! Per-product image collections.
//!
//! The collection is the ordered list of a product's images; order drives
//! display. [`CollectionRepository`] is the persistence seam: handlers and
//! the upload service only see the trait, and every mutation is an atomic
//! read-modify-write so concurrent requests against one product cannot
//! interleave partial updates. The bundled implementation keeps collections
//! in process memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;
use vitrine_core::{AppError, ProductImage};

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Images of one product in display order. Unknown products have an
    /// empty collection.
    async fn list(&self, product_id: &str) -> Result<Vec<ProductImage>, AppError>;

    /// Number of images currently in the product's collection.
    async fn collection_len(&self, product_id: &str) -> Result<usize, AppError>;

    /// Append a batch of freshly optimized images. Display order is
    /// finalized here, under the repository lock, from the collection
    /// length at append time; the returned images carry the final order.
    async fn append(
        &self,
        product_id: &str,
        images: Vec<ProductImage>,
    ) -> Result<Vec<ProductImage>, AppError>;

    /// Replace the collection order. `order` must be exactly a permutation
    /// of the current image ids; missing, extra, duplicate, or unknown ids
    /// are rejected with `AppError::InvalidInput`.
    async fn reorder(&self, product_id: &str, order: &[Uuid]) -> Result<(), AppError>;

    /// Remove one image, returning it so the caller can delete its stored
    /// renditions. Unknown ids fail with `AppError::NotFound`.
    async fn remove(&self, product_id: &str, image_id: Uuid) -> Result<ProductImage, AppError>;
}

/// In-process collection store.
///
/// One mutex over the whole map serializes every mutation, which satisfies
/// the per-product atomicity requirement at the collection sizes this
/// service handles (tens of images per product).
#[derive(Clone, Default)]
pub struct InMemoryCollectionRepository {
    collections: Arc<Mutex<HashMap<String, Vec<ProductImage>>>>,
}

impl InMemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionRepository for InMemoryCollectionRepository {
    async fn list(&self, product_id: &str) -> Result<Vec<ProductImage>, AppError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(product_id).cloned().unwrap_or_default())
    }

    async fn collection_len(&self, product_id: &str) -> Result<usize, AppError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(product_id).map_or(0, Vec::len))
    }

    async fn append(
        &self,
        product_id: &str,
        mut images: Vec<ProductImage>,
    ) -> Result<Vec<ProductImage>, AppError> {
        let mut collections = self.collections.lock().await;
        let collection = collections.entry(product_id.to_string()).or_default();

        let offset = collection.len() as u32;
        for (i, image) in images.iter_mut().enumerate() {
            image.display_order = offset + i as u32;
        }
        collection.extend(images.iter().cloned());

        Ok(images)
    }

    async fn reorder(&self, product_id: &str, order: &[Uuid]) -> Result<(), AppError> {
        let mut collections = self.collections.lock().await;
        let collection = collections.entry(product_id.to_string()).or_default();

        if order.len() != collection.len() {
            return Err(AppError::InvalidInput(format!(
                "Image order must contain exactly {} ids, got {}",
                collection.len(),
                order.len()
            )));
        }

        // Validate the full permutation before touching the collection so a
        // rejected reorder leaves it untouched.
        let mut seen = std::collections::HashSet::with_capacity(order.len());
        for id in order {
            if !collection.iter().any(|img| img.id == *id) {
                return Err(AppError::InvalidInput(format!(
                    "Image order contains an id not in the collection: {}",
                    id
                )));
            }
            if !seen.insert(*id) {
                return Err(AppError::InvalidInput(format!(
                    "Image order contains a duplicate id: {}",
                    id
                )));
            }
        }

        let mut by_id: HashMap<Uuid, ProductImage> =
            collection.drain(..).map(|img| (img.id, img)).collect();
        for (i, id) in order.iter().enumerate() {
            // Permutation was checked above, every id resolves.
            if let Some(mut image) = by_id.remove(id) {
                image.display_order = i as u32;
                collection.push(image);
            }
        }

        Ok(())
    }

    async fn remove(&self, product_id: &str, image_id: Uuid) -> Result<ProductImage, AppError> {
        let mut collections = self.collections.lock().await;
        let collection = collections.entry(product_id.to_string()).or_default();

        let position = collection
            .iter()
            .position(|img| img.id == image_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Image {} not found for product {}",
                    image_id, product_id
                ))
            })?;

        let removed = collection.remove(position);
        for (i, image) in collection.iter_mut().enumerate() {
            image.display_order = i as u32;
        }

        Ok(removed)
    }
}
