//! Nested layer containers (`Lr16`, `Lr32`).
//!
//! Documents with 16 or 32 bits per channel store their layers in one of
//! these blocks instead of the layer info section. The payload is a full
//! layer container whose records carry their own tagged blocks, which are
//! decoded recursively one level deeper.

use bytes::Bytes;
use serde::Serialize;

use crate::error::BlockError;
use crate::format::read_layers;

use super::registry::ChunkDecoder;
use super::{DecodeContext, Decoded, DecodedLayer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedLayers {
    pub channel_depth: u16,
    pub merged_alpha: bool,
    pub layers: Vec<DecodedLayer>,
}

pub struct NestedLayersDecoder {
    channel_depth: u16,
}

impl NestedLayersDecoder {
    pub fn new(channel_depth: u16) -> Self {
        Self { channel_depth }
    }
}

impl ChunkDecoder for NestedLayersDecoder {
    fn decode(&self, payload: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, BlockError> {
        let container = read_layers(payload, ctx.encoding(), self.channel_depth, ctx.version())?;
        let layers = ctx.decode_nested(container.records)?;
        Ok(Decoded::NestedLayers(NestedLayers {
            channel_depth: container.channel_depth,
            merged_alpha: container.merged_alpha,
            layers,
        }))
    }
}
