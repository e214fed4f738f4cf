//! Dispatch registry mapping type codes to chunk decoders.
//!
//! The registry is assembled once through a [`RegistryBuilder`] and is
//! immutable afterwards, so it can be shared freely between threads.
//! [`Registry::standard`] registers every decoder this crate ships.
//!
//! # Fallback Policy
//!
//! [`Registry::dispatch`] is the single place where decoder failures are
//! handled:
//! - No decoder for the code: `Raw` plus one diagnostic
//! - Decoder returns a recoverable error: `Raw` plus one diagnostic
//! - Decoder returns a fatal error: propagated to the caller
//!
//! The `Raw` payload is always a clone of the chunk's original `Bytes`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::BlockError;
use crate::format::{BlockKey, TypeCode};

use super::adjustments::{
    BrightnessContrastDecoder, ChannelMixerDecoder, ColorBalanceDecoder, CurvesDecoder,
    ExposureDecoder, HueSaturationDecoder, LevelsDecoder, PhotoFilterDecoder, PosterizeDecoder,
    SelectiveColorDecoder, ThresholdDecoder,
};
use super::divider::SectionDividerDecoder;
use super::gradient::GradientMapDecoder;
use super::misc::{
    BooleanDecoder, ChannelBlendRestrictionsDecoder, FillOpacityDecoder, FilterMaskDecoder,
    LayerIdDecoder, ProtectedDecoder, ReferencePointDecoder, SheetColorDecoder,
    UnicodeLayerNameDecoder,
};
use super::nested::NestedLayersDecoder;
use super::patterns::PatternsDecoder;
use super::settings::{
    ColorLookupDecoder, DescriptorBlockDecoder, LegacyEffectsDecoder, LinkedLayersDecoder,
    MetadataDecoder, ObjectEffectsDecoder, PlacedLayerDecoder, TextEngineDataDecoder,
    TypeToolDecoder, VectorOriginationDecoder,
};
use super::vector_mask::VectorMaskDecoder;
use super::{Chunk, DecodeContext, Decoded};

// =============================================================================
// ChunkDecoder Trait
// =============================================================================

/// Decoder for one tagged-block sub-format.
///
/// Implementations read from `payload` and either produce a structured
/// record or return an error. They never fall back to `Raw` themselves;
/// the registry does that for every recoverable error.
pub trait ChunkDecoder: Send + Sync {
    fn decode(&self, payload: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError>;
}

// =============================================================================
// Registry
// =============================================================================

/// Builder for a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    decoders: HashMap<TypeCode, Arc<dyn ChunkDecoder>>,
}

impl RegistryBuilder {
    /// Register a decoder for one code, replacing any earlier one.
    pub fn register(self, code: impl Into<TypeCode>, decoder: impl ChunkDecoder + 'static) -> Self {
        self.register_shared(&[code.into()], Arc::new(decoder))
    }

    /// Register one decoder instance for several codes.
    pub fn register_all(self, keys: &[BlockKey], decoder: impl ChunkDecoder + 'static) -> Self {
        let codes: Vec<TypeCode> = keys.iter().map(|key| key.code()).collect();
        self.register_shared(&codes, Arc::new(decoder))
    }

    fn register_shared(mut self, codes: &[TypeCode], decoder: Arc<dyn ChunkDecoder>) -> Self {
        for &code in codes {
            self.decoders.insert(code, Arc::clone(&decoder));
        }
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            decoders: self.decoders,
        }
    }
}

/// Immutable mapping from type code to decoder.
pub struct Registry {
    decoders: HashMap<TypeCode, Arc<dyn ChunkDecoder>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.decoders.keys().collect();
        codes.sort();
        f.debug_struct("Registry").field("codes", &codes).finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry with no decoders: every chunk passes through as `Raw`.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// The registry with every decoder this crate provides.
    pub fn standard() -> Self {
        use crate::format::BlockKey as K;

        Self::builder()
            // Adjustment layers
            .register(K::BrightnessAndContrast.code(), BrightnessContrastDecoder)
            .register(K::Levels.code(), LevelsDecoder)
            .register(K::Curves.code(), CurvesDecoder)
            .register(K::Exposure.code(), ExposureDecoder)
            .register_all(&[K::HueSaturationV4, K::HueSaturation], HueSaturationDecoder)
            .register(K::ColorBalance.code(), ColorBalanceDecoder)
            .register(K::PhotoFilter.code(), PhotoFilterDecoder)
            .register(K::ChannelMixer.code(), ChannelMixerDecoder)
            .register(K::SelectiveColor.code(), SelectiveColorDecoder)
            .register(K::Posterize.code(), PosterizeDecoder)
            .register(K::Threshold.code(), ThresholdDecoder)
            .register(K::GradientMapSetting.code(), GradientMapDecoder)
            // Descriptor-backed settings
            .register(
                K::SolidColorSheetSetting.code(),
                DescriptorBlockDecoder::new(Decoded::SolidColor),
            )
            .register(K::Vibrance.code(), DescriptorBlockDecoder::new(Decoded::Vibrance))
            .register(K::BlackAndWhite.code(), DescriptorBlockDecoder::new(Decoded::BlackAndWhite))
            .register(K::ExportSetting1.code(), DescriptorBlockDecoder::new(Decoded::ExportData))
            .register(
                K::ContentGeneratorExtraData.code(),
                DescriptorBlockDecoder::new(Decoded::ContentGeneratorExtraData),
            )
            .register(
                K::UnicodePathName.code(),
                DescriptorBlockDecoder::new(Decoded::UnicodePathName),
            )
            .register(
                K::AnimationEffects.code(),
                DescriptorBlockDecoder::new(Decoded::AnimationEffects),
            )
            .register(K::ColorLookup.code(), ColorLookupDecoder)
            .register(K::VectorOriginationData.code(), VectorOriginationDecoder)
            .register_all(
                &[K::PlacedLayerData, K::SmartObjectPlacedLayerData],
                PlacedLayerDecoder,
            )
            .register(K::MetadataSetting.code(), MetadataDecoder)
            .register(K::TypeToolObjectSetting.code(), TypeToolDecoder)
            // Layer settings
            .register(K::ProtectedSetting.code(), ProtectedDecoder)
            .register(K::ReferencePoint.code(), ReferencePointDecoder)
            .register(K::SheetColorSetting.code(), SheetColorDecoder)
            .register(K::FilterMask.code(), FilterMaskDecoder)
            .register(
                K::ChannelBlendingRestrictionsSetting.code(),
                ChannelBlendRestrictionsDecoder,
            )
            .register_all(
                &[
                    K::BlendClippingElements,
                    K::BlendInteriorElements,
                    K::KnockoutSetting,
                ],
                BooleanDecoder,
            )
            .register(K::BlendFillOpacity.code(), FillOpacityDecoder)
            .register(K::UnicodeLayerName.code(), UnicodeLayerNameDecoder)
            .register(K::LayerId.code(), LayerIdDecoder)
            .register(
                K::SectionDividerSetting.code(),
                SectionDividerDecoder::new(K::SectionDividerSetting),
            )
            .register(
                K::NestedSectionDividerSetting.code(),
                SectionDividerDecoder::new(K::NestedSectionDividerSetting),
            )
            .register_all(&[K::VectorMaskSetting1, K::VectorMaskSetting2], VectorMaskDecoder)
            // Effects, text and embedded data
            .register(K::EffectsLayer.code(), LegacyEffectsDecoder)
            .register_all(
                &[
                    K::ObjectBasedEffectsLayerInfo,
                    K::ObjectBasedEffectsLayerInfoV0,
                    K::ObjectBasedEffectsLayerInfoV1,
                ],
                ObjectEffectsDecoder,
            )
            .register_all(
                &[
                    K::LinkedLayer1,
                    K::LinkedLayer2,
                    K::LinkedLayer3,
                    K::LinkedLayerExternal,
                ],
                LinkedLayersDecoder,
            )
            .register(K::TextEngineData.code(), TextEngineDataDecoder)
            .register_all(&[K::Patterns1, K::Patterns2, K::Patterns3], PatternsDecoder)
            // Nested layer containers
            .register(K::Layer16.code(), NestedLayersDecoder::new(16))
            .register(K::Layer32.code(), NestedLayersDecoder::new(32))
            .build()
    }

    pub fn get(&self, code: TypeCode) -> Option<&dyn ChunkDecoder> {
        self.decoders.get(&code).map(|d| d.as_ref())
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.decoders.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode one chunk, applying the fallback policy.
    ///
    /// # Errors
    /// Only errors for which [`BlockError::is_fatal`] holds.
    pub fn dispatch(&self, chunk: &Chunk, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let Some(decoder) = self.get(chunk.code) else {
            ctx.diagnostics().unrecognized_chunk(chunk.code);
            return Ok(Decoded::Raw(chunk.payload.clone()));
        };

        debug!(
            code = %chunk.code,
            len = chunk.payload.len(),
            depth = ctx.depth(),
            "Decoding tagged block"
        );
        match decoder.decode(&chunk.payload, ctx) {
            Ok(decoded) => Ok(decoded),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                ctx.diagnostics().fallback(chunk.code, &err);
                Ok(Decoded::Raw(chunk.payload.clone()))
            }
        }
    }
}
