//! File-format vocabulary and the readers that feed the block decoder.
//!
//! - [`keys`]: type codes, known block keys and small enumerants
//! - [`descriptor`]: action descriptor engine
//! - [`engine_data`]: text engine data parser
//! - [`effects`] and [`linked`]: layer effects and embedded files
//! - [`layers`] and [`document`]: container readers that produce chunks

pub mod descriptor;
pub mod document;
pub mod effects;
pub mod engine_data;
pub mod keys;
pub mod layers;
pub mod linked;

pub use descriptor::{decode_descriptor, Descriptor, DescriptorValue, ReferenceItem};
pub use document::{read_document, Document, Header};
pub use engine_data::{EngineData, EngineValue};
pub use keys::{BlockKey, ColorMode, FormatVersion, PathSelector, SectionDividerType, TypeCode};
pub use layers::{read_layers, LayerRecord, Layers};
