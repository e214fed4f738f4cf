//! Tagged-block vocabulary.
//!
//! This module defines the constants shared by the decoders:
//! - The 4-byte [`TypeCode`] carried by every chunk and signature
//! - The table of known tagged-block keys
//! - Small enumerants used inside block payloads (color modes, section
//!   divider types, path record selectors)

use std::fmt;

use serde::{Serialize, Serializer};

// =============================================================================
// TypeCode
// =============================================================================

/// A 4-byte code identifying a chunk type, signature or blend mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode([u8; 4]);

impl TypeCode {
    /// `8BIM`, the standard resource and block signature.
    pub const SIGNATURE_8BIM: TypeCode = TypeCode(*b"8BIM");

    /// `8B64`, the block signature used by some PSB writers.
    pub const SIGNATURE_8B64: TypeCode = TypeCode(*b"8B64");

    /// Create a code from its four bytes.
    #[inline]
    pub const fn new(bytes: [u8; 4]) -> Self {
        TypeCode(bytes)
    }

    /// The raw bytes of the code.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Whether this is one of the two tagged-block signatures.
    #[inline]
    pub fn is_block_signature(self) -> bool {
        self == Self::SIGNATURE_8BIM || self == Self::SIGNATURE_8B64
    }
}

impl From<[u8; 4]> for TypeCode {
    fn from(bytes: [u8; 4]) -> Self {
        TypeCode(bytes)
    }
}

impl From<&[u8; 4]> for TypeCode {
    fn from(bytes: &[u8; 4]) -> Self {
        TypeCode(*bytes)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode(\"{}\")", self)
    }
}

impl Serialize for TypeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Format Version
// =============================================================================

/// Document-wide format version from the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum FormatVersion {
    /// Standard document (version 1)
    #[default]
    Psd,

    /// Large document format (version 2), with wider length fields
    Psb,
}

impl FormatVersion {
    /// Create a FormatVersion from the header's version field.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FormatVersion::Psd),
            2 => Some(FormatVersion::Psb),
            _ => None,
        }
    }

    /// The numeric header value.
    pub const fn as_u16(self) -> u16 {
        match self {
            FormatVersion::Psd => 1,
            FormatVersion::Psb => 2,
        }
    }

    /// Whether length fields that grow in the large format are 8 bytes.
    #[inline]
    pub const fn is_large(self) -> bool {
        matches!(self, FormatVersion::Psb)
    }
}

// =============================================================================
// Block Keys
// =============================================================================

macro_rules! block_keys {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, )*) => {
        /// Tagged-block keys known to this crate.
        ///
        /// Knowing a key does not mean it is decoded: several keys are
        /// recognized only so diagnostics can tell "known but opaque" apart
        /// from "never seen".
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BlockKey {
            $( $(#[$doc])* $variant, )*
        }

        impl BlockKey {
            /// Every known key.
            pub const ALL: &'static [BlockKey] = &[$(BlockKey::$variant),*];

            /// The 4-byte code for this key.
            pub const fn code(self) -> TypeCode {
                match self {
                    $( BlockKey::$variant => TypeCode::new(*$code), )*
                }
            }

            /// Look up a key from its code.
            ///
            /// Returns `None` for codes that are not in the table.
            pub fn from_code(code: TypeCode) -> Option<Self> {
                match code.as_bytes() {
                    $( $code => Some(BlockKey::$variant), )*
                    _ => None,
                }
            }

            /// Human-readable name of the key.
            pub const fn name(self) -> &'static str {
                match self {
                    $( BlockKey::$variant => stringify!($variant), )*
                }
            }
        }
    };
}

block_keys! {
    // -------------------------------------------------------------------------
    // Adjustment and fill layers
    // -------------------------------------------------------------------------
    SolidColorSheetSetting = b"SoCo",
    GradientFillSetting = b"GdFl",
    PatternFillSetting = b"PtFl",
    BrightnessAndContrast = b"brit",
    Levels = b"levl",
    Curves = b"curv",
    Exposure = b"expA",
    Vibrance = b"vibA",
    /// Hue/saturation in the Photoshop 4.0 layout
    HueSaturationV4 = b"hue ",
    HueSaturation = b"hue2",
    ColorBalance = b"blnc",
    BlackAndWhite = b"blwh",
    PhotoFilter = b"phfl",
    ChannelMixer = b"mixr",
    ColorLookup = b"clrL",
    Invert = b"nvrt",
    Posterize = b"post",
    Threshold = b"thrs",
    GradientMapSetting = b"grdm",
    SelectiveColor = b"selc",

    // -------------------------------------------------------------------------
    // Effects and text
    // -------------------------------------------------------------------------
    EffectsLayer = b"lrFX",
    TypeToolInfo = b"tySh",
    UnicodeLayerName = b"luni",
    LayerId = b"lyid",
    ObjectBasedEffectsLayerInfoV0 = b"lmfx",
    ObjectBasedEffectsLayerInfoV1 = b"lfxs",
    ObjectBasedEffectsLayerInfo = b"lfx2",

    // -------------------------------------------------------------------------
    // Patterns
    // -------------------------------------------------------------------------
    Patterns1 = b"Patt",
    Patterns2 = b"Pat2",
    Patterns3 = b"Pat3",

    // -------------------------------------------------------------------------
    // Layer settings
    // -------------------------------------------------------------------------
    Annotations = b"Anno",
    BlendClippingElements = b"clbl",
    BlendInteriorElements = b"infx",
    BlendFillOpacity = b"iOpa",
    KnockoutSetting = b"knko",
    ProtectedSetting = b"lspf",
    SheetColorSetting = b"lclr",
    ReferencePoint = b"fxrp",
    SectionDividerSetting = b"lsct",
    NestedSectionDividerSetting = b"lsdk",
    ChannelBlendingRestrictionsSetting = b"brst",
    VectorMaskSetting1 = b"vmsk",
    VectorMaskSetting2 = b"vsms",
    TypeToolObjectSetting = b"TySh",
    ForeignEffectId = b"ffxi",
    LayerNameSourceSetting = b"lnsr",
    PatternData = b"shpa",
    MetadataSetting = b"shmd",
    LayerVersion = b"lyvr",
    TransparencyShapesLayer = b"tsly",
    LayerMaskAsGlobalMask = b"lmgm",
    VectorMaskAsGlobalMask = b"vmgm",
    VectorOriginationData = b"vogk",
    PixelSourceData1 = b"PxSc",
    PixelSourceData2 = b"PxSD",
    ArtboardData1 = b"artb",
    ArtboardData2 = b"artd",
    ArtboardData3 = b"abdd",

    // -------------------------------------------------------------------------
    // Placed and linked layers
    // -------------------------------------------------------------------------
    PlacedLayerObsolete1 = b"plLd",
    PlacedLayerObsolete2 = b"PlLd",
    LinkedLayer1 = b"lnkD",
    LinkedLayer2 = b"lnk2",
    LinkedLayer3 = b"lnk3",
    LinkedLayerExternal = b"lnkE",
    ContentGeneratorExtraData = b"CgEd",
    TextEngineData = b"Txt2",
    UnicodePathName = b"pths",
    AnimationEffects = b"anFX",
    FilterMask = b"FMsk",
    PlacedLayerData = b"SoLd",
    SmartObjectPlacedLayerData = b"SoLE",
    ExportSetting1 = b"extd",
    ExportSetting2 = b"extn",

    // -------------------------------------------------------------------------
    // Document-level blocks
    // -------------------------------------------------------------------------
    VectorStrokeData = b"vstk",
    VectorStrokeContentData = b"vscg",
    UsingAlignedRendering = b"sn2P",
    SavingMergedTransparency = b"Mtrn",
    SavingMergedTransparency16 = b"Mt16",
    SavingMergedTransparency32 = b"Mt32",
    UserMask = b"LMsk",
    FilterEffects1 = b"FXid",
    FilterEffects2 = b"FEid",
    FilterEffects3 = b"FELS",
    Layer16 = b"Lr16",
    Layer32 = b"Lr32",
    Layer = b"Layr",
    Alpha = b"Alph",
}

impl BlockKey {
    /// Whether a block with this code carries an 8-byte length in the
    /// large document format.
    pub fn has_wide_length(code: TypeCode) -> bool {
        matches!(
            BlockKey::from_code(code),
            Some(
                BlockKey::UserMask
                    | BlockKey::Layer16
                    | BlockKey::Layer32
                    | BlockKey::Layer
                    | BlockKey::SavingMergedTransparency
                    | BlockKey::SavingMergedTransparency16
                    | BlockKey::SavingMergedTransparency32
                    | BlockKey::Alpha
                    | BlockKey::FilterMask
                    | BlockKey::LinkedLayer2
                    | BlockKey::FilterEffects1
                    | BlockKey::FilterEffects2
                    | BlockKey::PixelSourceData2
            )
        )
    }
}

// =============================================================================
// Color Mode
// =============================================================================

/// Document and pattern color modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9,
}

impl ColorMode {
    /// Create a ColorMode from its numeric value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ColorMode::Bitmap),
            1 => Some(ColorMode::Grayscale),
            2 => Some(ColorMode::Indexed),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Cmyk),
            7 => Some(ColorMode::Multichannel),
            8 => Some(ColorMode::Duotone),
            9 => Some(ColorMode::Lab),
            _ => None,
        }
    }
}

// =============================================================================
// Section Divider Type
// =============================================================================

/// Group-layer marker carried by section divider blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum SectionDividerType {
    /// Any other layer type
    Other = 0,

    /// Open folder (group start)
    OpenFolder = 1,

    /// Closed folder (group start)
    ClosedFolder = 2,

    /// Hidden bounding layer that closes a group
    BoundingSectionDivider = 3,
}

impl SectionDividerType {
    /// Create a SectionDividerType from its numeric value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(SectionDividerType::Other),
            1 => Some(SectionDividerType::OpenFolder),
            2 => Some(SectionDividerType::ClosedFolder),
            3 => Some(SectionDividerType::BoundingSectionDivider),
            _ => None,
        }
    }
}

// =============================================================================
// Path Record Selectors
// =============================================================================

/// Selector leading every 26-byte path record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PathSelector {
    ClosedSubpathLength = 0,
    ClosedSubpathKnotLinked = 1,
    ClosedSubpathKnotUnlinked = 2,
    OpenSubpathLength = 3,
    OpenSubpathKnotLinked = 4,
    OpenSubpathKnotUnlinked = 5,
    PathFillRule = 6,
    Clipboard = 7,
    InitialFillRule = 8,
}

impl PathSelector {
    /// Create a PathSelector from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(PathSelector::ClosedSubpathLength),
            1 => Some(PathSelector::ClosedSubpathKnotLinked),
            2 => Some(PathSelector::ClosedSubpathKnotUnlinked),
            3 => Some(PathSelector::OpenSubpathLength),
            4 => Some(PathSelector::OpenSubpathKnotLinked),
            5 => Some(PathSelector::OpenSubpathKnotUnlinked),
            6 => Some(PathSelector::PathFillRule),
            7 => Some(PathSelector::Clipboard),
            8 => Some(PathSelector::InitialFillRule),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
