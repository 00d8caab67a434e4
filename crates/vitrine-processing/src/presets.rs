use vitrine_core::RenditionTier;

/// Quality presets for rendition encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    Normal, // Default quality, balanced size and quality
    Better, // Higher quality, ≈125% file size
    Best,   // Near pristine quality, ≈170% file size
}

impl QualityPreset {
    /// Preset used when encoding a given tier.
    ///
    /// Small tiers are viewed small; spending bytes on them buys nothing.
    /// The normalized original is the zoom/lightbox asset and gets the
    /// highest quality.
    pub fn for_tier(tier: RenditionTier) -> Self {
        match tier {
            RenditionTier::Thumbnail => QualityPreset::Normal,
            RenditionTier::Medium => QualityPreset::Normal,
            RenditionTier::Large => QualityPreset::Better,
            RenditionTier::Original => QualityPreset::Best,
        }
    }

    /// Get quality value for JPEG (0-100)
    pub fn jpeg_quality(self) -> u8 {
        match self {
            QualityPreset::Normal => 75,
            QualityPreset::Better => 85,
            QualityPreset::Best => 95,
        }
    }

    /// Get quality value for WebP (0-100)
    pub fn webp_quality(self) -> f32 {
        match self {
            QualityPreset::Normal => 80.0,
            QualityPreset::Better => 90.0,
            QualityPreset::Best => 98.0,
        }
    }
}
