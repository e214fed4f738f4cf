//! Tagged-block decoding.
//!
//! A [`BlockDecoder`] turns the raw chunks attached to a layer record into
//! [`DecodedChunk`]s. Every chunk is decoded independently: a chunk that
//! cannot be decoded keeps its original payload as [`Decoded::Raw`] and a
//! diagnostic is recorded, while its siblings decode normally.
//!
//! # Example
//!
//! ```ignore
//! use psd_tagged_blocks::{BlockDecoder, Chunk, DecodeOptions, FormatVersion};
//!
//! let decoder = BlockDecoder::new(DecodeOptions::default());
//! let decoded = decoder.decode(&chunks, FormatVersion::Psd)?;
//! for diagnostic in decoder.diagnostics().take() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

pub mod adjustments;
pub mod diagnostics;
pub mod divider;
pub mod gradient;
pub mod misc;
pub mod nested;
pub mod patterns;
pub mod registry;
pub mod settings;
pub mod vector_mask;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::config::DecodeOptions;
use crate::error::BlockError;
use crate::format::effects::{LegacyEffects, ObjectEffects};
use crate::format::linked::LinkedLayer;
use crate::format::{Document, EngineData, FormatVersion, Header, LayerRecord, TypeCode};
use crate::io::{hex_bytes, StringEncoding};

pub use adjustments::{
    BrightnessContrast, ChannelMixer, ColorBalance, CurveData, Curves, CurvesExtraMarker,
    Exposure, HueSaturation, HueSaturationRange, LevelRecord, Levels, PhotoFilter,
    SelectiveColor,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use divider::Divider;
pub use gradient::{ColorStop, GradientSettings, TransparencyStop};
pub use misc::{FilterMask, ProtectedSetting, ReferencePoint};
pub use nested::NestedLayers;
pub use patterns::{Pattern, VirtualMemoryArray, VirtualMemoryArrayList};
pub use registry::{ChunkDecoder, Registry, RegistryBuilder};
pub use settings::{
    DescriptorBlock, MetadataItem, PlacedLayer, TypeToolObjectSetting, VersionedDescriptor,
};
pub use vector_mask::{fixed_to_f64, BezierKnot, PathRecord, VectorMaskSetting};

// =============================================================================
// Chunks
// =============================================================================

/// A raw tagged block as split out of a layer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub code: TypeCode,

    /// Payload without the block header or trailing padding
    #[serde(serialize_with = "hex_bytes")]
    pub payload: Bytes,
}

impl Chunk {
    pub fn new(code: impl Into<TypeCode>, payload: impl Into<Bytes>) -> Self {
        Self {
            code: code.into(),
            payload: payload.into(),
        }
    }
}

/// A tagged block after decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedChunk {
    pub code: TypeCode,
    pub payload: Decoded,
}

impl DecodedChunk {
    /// Whether the block was passed through undecoded.
    pub fn is_raw(&self) -> bool {
        matches!(self.payload, Decoded::Raw(_))
    }
}

/// A layer record whose blocks have been decoded.
pub type DecodedLayer = LayerRecord<DecodedChunk>;

/// Decoded payload of a tagged block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum Decoded {
    /// The unmodified original payload
    Raw(#[serde(serialize_with = "hex_bytes")] Bytes),

    // -------------------------------------------------------------------------
    // Adjustment layers
    // -------------------------------------------------------------------------
    BrightnessContrast(BrightnessContrast),
    Levels(Levels),
    Curves(Curves),
    Exposure(Exposure),
    HueSaturation(HueSaturation),
    ColorBalance(ColorBalance),
    PhotoFilter(PhotoFilter),
    ChannelMixer(ChannelMixer),
    SelectiveColor(SelectiveColor),
    Posterize(u16),
    Threshold(u16),
    GradientMap(Box<GradientSettings>),

    // -------------------------------------------------------------------------
    // Descriptor-backed settings
    // -------------------------------------------------------------------------
    SolidColor(DescriptorBlock),
    Vibrance(DescriptorBlock),
    BlackAndWhite(DescriptorBlock),
    ExportData(DescriptorBlock),
    ContentGeneratorExtraData(DescriptorBlock),
    UnicodePathName(DescriptorBlock),
    AnimationEffects(DescriptorBlock),
    ColorLookup(VersionedDescriptor),
    VectorOriginationData(VersionedDescriptor),
    PlacedLayer(PlacedLayer),
    Metadata(Vec<MetadataItem>),
    TypeToolObjectSetting(Box<TypeToolObjectSetting>),

    // -------------------------------------------------------------------------
    // Layer settings
    // -------------------------------------------------------------------------
    Protected(ProtectedSetting),
    ReferencePoint(ReferencePoint),
    SheetColor([u16; 4]),
    FilterMask(FilterMask),
    ChannelBlendRestrictions(Vec<u32>),
    /// Blend clipping, blend interior and knockout flags
    Boolean(bool),
    FillOpacity(u8),
    UnicodeLayerName(String),
    LayerId(u32),
    Divider(Divider),
    VectorMask(VectorMaskSetting),

    // -------------------------------------------------------------------------
    // Effects, text and embedded data
    // -------------------------------------------------------------------------
    LegacyEffects(LegacyEffects),
    ObjectEffects(ObjectEffects),
    LinkedLayers(Vec<LinkedLayer>),
    TextEngineData(EngineData),
    Patterns(Vec<Pattern>),
    NestedLayers(NestedLayers),
}

impl Decoded {
    /// Name of the variant, as used for the `kind` tag in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Decoded::Raw(_) => "Raw",
            Decoded::BrightnessContrast(_) => "BrightnessContrast",
            Decoded::Levels(_) => "Levels",
            Decoded::Curves(_) => "Curves",
            Decoded::Exposure(_) => "Exposure",
            Decoded::HueSaturation(_) => "HueSaturation",
            Decoded::ColorBalance(_) => "ColorBalance",
            Decoded::PhotoFilter(_) => "PhotoFilter",
            Decoded::ChannelMixer(_) => "ChannelMixer",
            Decoded::SelectiveColor(_) => "SelectiveColor",
            Decoded::Posterize(_) => "Posterize",
            Decoded::Threshold(_) => "Threshold",
            Decoded::GradientMap(_) => "GradientMap",
            Decoded::SolidColor(_) => "SolidColor",
            Decoded::Vibrance(_) => "Vibrance",
            Decoded::BlackAndWhite(_) => "BlackAndWhite",
            Decoded::ExportData(_) => "ExportData",
            Decoded::ContentGeneratorExtraData(_) => "ContentGeneratorExtraData",
            Decoded::UnicodePathName(_) => "UnicodePathName",
            Decoded::AnimationEffects(_) => "AnimationEffects",
            Decoded::ColorLookup(_) => "ColorLookup",
            Decoded::VectorOriginationData(_) => "VectorOriginationData",
            Decoded::PlacedLayer(_) => "PlacedLayer",
            Decoded::Metadata(_) => "Metadata",
            Decoded::TypeToolObjectSetting(_) => "TypeToolObjectSetting",
            Decoded::Protected(_) => "Protected",
            Decoded::ReferencePoint(_) => "ReferencePoint",
            Decoded::SheetColor(_) => "SheetColor",
            Decoded::FilterMask(_) => "FilterMask",
            Decoded::ChannelBlendRestrictions(_) => "ChannelBlendRestrictions",
            Decoded::Boolean(_) => "Boolean",
            Decoded::FillOpacity(_) => "FillOpacity",
            Decoded::UnicodeLayerName(_) => "UnicodeLayerName",
            Decoded::LayerId(_) => "LayerId",
            Decoded::Divider(_) => "Divider",
            Decoded::VectorMask(_) => "VectorMask",
            Decoded::LegacyEffects(_) => "LegacyEffects",
            Decoded::ObjectEffects(_) => "ObjectEffects",
            Decoded::LinkedLayers(_) => "LinkedLayers",
            Decoded::TextEngineData(_) => "TextEngineData",
            Decoded::Patterns(_) => "Patterns",
            Decoded::NestedLayers(_) => "NestedLayers",
        }
    }
}

// =============================================================================
// Decode Context
// =============================================================================

/// State passed to every chunk decoder.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    version: FormatVersion,
    depth: usize,
    decoder: &'a BlockDecoder,
}

impl<'a> DecodeContext<'a> {
    /// Document format version.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Number of layer containers enclosing the chunk being decoded.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn diagnostics(&self) -> &'a Diagnostics {
        &self.decoder.diagnostics
    }

    /// Encoding of Pascal strings in nested layer containers.
    pub fn encoding(&self) -> StringEncoding {
        self.decoder.options.encoding
    }

    /// Decode the blocks of layers found one container deeper.
    ///
    /// # Errors
    /// `DepthExceeded` when the new depth would pass the configured ceiling.
    pub fn decode_nested(
        &self,
        records: Vec<LayerRecord<Chunk>>,
    ) -> Result<Vec<DecodedLayer>, BlockError> {
        let depth = self.depth + 1;
        let limit = self.decoder.options.max_depth;
        if depth > limit {
            return Err(BlockError::DepthExceeded { limit });
        }
        debug!(depth, layers = records.len(), "Decoding nested layers");
        self.decoder.decode_records(records, self.version, depth)
    }
}

// =============================================================================
// Block Decoder
// =============================================================================

/// A document whose tagged blocks have been decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedDocument {
    pub header: Header,
    pub layers: Vec<DecodedLayer>,
    pub global_blocks: Vec<DecodedChunk>,
}

/// Decodes tagged blocks through a [`Registry`].
///
/// The decoder is `Send + Sync`; one instance can serve many threads.
/// Diagnostics from every pass accumulate until taken.
pub struct BlockDecoder {
    registry: Registry,
    options: DecodeOptions,
    diagnostics: Diagnostics,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl BlockDecoder {
    /// Create a decoder with the standard registry.
    pub fn new(options: DecodeOptions) -> Self {
        Self::with_registry(Registry::standard(), options)
    }

    /// Create a decoder with a custom registry.
    pub fn with_registry(registry: Registry, options: DecodeOptions) -> Self {
        Self {
            registry,
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Decode a chunk list. The output has the same length and order.
    ///
    /// # Errors
    /// Only fatal errors (`DepthExceeded`) are returned; every other failure
    /// degrades the offending chunk to `Raw`.
    pub fn decode(
        &self,
        chunks: &[Chunk],
        version: FormatVersion,
    ) -> Result<Vec<DecodedChunk>, BlockError> {
        chunks
            .iter()
            .map(|chunk| self.parse_at_depth(chunk, version, 0))
            .collect()
    }

    /// Like [`decode`](Self::decode), spreading chunks over scoped worker
    /// threads.
    pub fn decode_parallel(
        &self,
        chunks: &[Chunk],
        version: FormatVersion,
    ) -> Result<Vec<DecodedChunk>, BlockError> {
        map_scoped(chunks.iter().collect(), |chunk| {
            self.parse_at_depth(chunk, version, 0)
        })
    }

    /// Decode a single chunk.
    pub fn parse_tagged_block(
        &self,
        chunk: &Chunk,
        version: FormatVersion,
    ) -> Result<DecodedChunk, BlockError> {
        self.parse_at_depth(chunk, version, 0)
    }

    /// Decode the layers and global blocks of a document.
    pub fn decode_document(&self, document: Document) -> Result<DecodedDocument, BlockError> {
        let version = document.header.version;
        let records = document.layers.map(|l| l.records).unwrap_or_default();

        let layers = if self.options.parallel {
            map_scoped(records, |record| {
                record.try_map_blocks(|chunk| self.parse_at_depth(&chunk, version, 0))
            })?
        } else {
            self.decode_records(records, version, 0)?
        };
        let global_blocks = self.decode(&document.global_blocks, version)?;

        Ok(DecodedDocument {
            header: document.header,
            layers,
            global_blocks,
        })
    }

    fn decode_records(
        &self,
        records: Vec<LayerRecord<Chunk>>,
        version: FormatVersion,
        depth: usize,
    ) -> Result<Vec<DecodedLayer>, BlockError> {
        records
            .into_iter()
            .map(|record| {
                record.try_map_blocks(|chunk| self.parse_at_depth(&chunk, version, depth))
            })
            .collect()
    }

    fn parse_at_depth(
        &self,
        chunk: &Chunk,
        version: FormatVersion,
        depth: usize,
    ) -> Result<DecodedChunk, BlockError> {
        let ctx = DecodeContext {
            version,
            depth,
            decoder: self,
        };
        let payload = self.registry.dispatch(chunk, &ctx)?;
        Ok(DecodedChunk {
            code: chunk.code,
            payload,
        })
    }
}

/// Map `items` on scoped worker threads, one contiguous batch per thread.
///
/// Output order matches input order. A panicking worker re-raises its panic
/// on the calling thread.
fn map_scoped<T, U, F>(items: Vec<T>, f: F) -> Result<Vec<U>, BlockError>
where
    T: Send,
    U: Send,
    F: Fn(T) -> Result<U, BlockError> + Sync,
{
    let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
    let per_worker = items.len().div_ceil(workers).max(1);

    let mut batches = Vec::with_capacity(workers);
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        batches.push(items.by_ref().take(per_worker).collect::<Vec<_>>());
    }
    debug!(batches = batches.len(), per_worker, "Decoding on worker threads");

    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                scope.spawn(move || batch.into_iter().map(f).collect::<Result<Vec<U>, _>>())
            })
            .collect();

        let mut output = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(batch) => output.extend(batch?),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(output)
    })
}

// =============================================================================
// Tests
// =============================================================================
