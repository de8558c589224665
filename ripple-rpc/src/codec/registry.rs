use super::{AnyCodec, BinaryCodec, CodecType, JsonCodec};
use crate::{BoxIo, Error, Result};
use std::{collections::HashMap, sync::Arc};

/// Wraps an accepted stream into a codec.
pub type NewCodecFn = fn(BoxIo) -> AnyCodec;

#[derive(Debug, Default, Clone)]
pub struct CodecRegistryBuilder {
    map: HashMap<CodecType, NewCodecFn>,
}

impl CodecRegistryBuilder {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn register(mut self, codec_type: CodecType, new_codec: NewCodecFn) -> Self {
        self.map.insert(codec_type, new_codec);
        self
    }

    pub fn build(self) -> CodecRegistry {
        CodecRegistry {
            inner: Arc::new(self.map),
        }
    }
}

/// Codec factories keyed by handshake tag. Immutable once built.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    inner: Arc<HashMap<CodecType, NewCodecFn>>,
}

impl CodecRegistry {
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::new()
    }

    /// Factory for one of the codecs this crate ships.
    pub fn builtin(codec_type: &CodecType) -> Option<NewCodecFn> {
        if *codec_type == CodecType::GOB {
            Some(new_binary as NewCodecFn)
        } else if *codec_type == CodecType::JSON {
            Some(new_json as NewCodecFn)
        } else {
            None
        }
    }

    /// Registry enabling only the listed built-in codecs.
    pub fn from_types<'a>(types: impl IntoIterator<Item = &'a CodecType>) -> Result<Self> {
        types
            .into_iter()
            .try_fold(Self::builder(), |builder, codec_type| -> Result<_> {
                let new_codec = Self::builtin(codec_type)
                    .ok_or_else(|| Error::InvalidCodecType(codec_type.clone()))?;
                Ok(builder.register(codec_type.clone(), new_codec))
            })
            .map(CodecRegistryBuilder::build)
    }

    pub fn get(&self, codec_type: &CodecType) -> Option<NewCodecFn> {
        self.inner.get(codec_type).copied()
    }

    pub fn contains(&self, codec_type: &CodecType) -> bool {
        self.inner.contains_key(codec_type)
    }

    pub fn codec_types(&self) -> impl Iterator<Item = &CodecType> {
        self.inner.keys()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builder()
            .register(CodecType::GOB, new_binary)
            .register(CodecType::JSON, new_json)
            .build()
    }
}

fn new_binary(io: BoxIo) -> AnyCodec {
    AnyCodec::Binary(BinaryCodec::new(io))
}

fn new_json(io: BoxIo) -> AnyCodec {
    AnyCodec::Json(JsonCodec::new(io))
}
