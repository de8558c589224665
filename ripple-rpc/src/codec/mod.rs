use crate::{Header, Result};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{borrow::Cow, future::Future, str::FromStr};

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use registry::{CodecRegistry, CodecRegistryBuilder, NewCodecFn};

pub mod binary;
pub mod json;
pub mod registry;

/// Upper bound for a single header or body frame.
pub const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Reads and writes header+body pairs over one connection.
///
/// Reads are only ever issued by the task that owns the connection loop, one
/// `read_body` per successful `read_header`. Writes may come from any task;
/// callers are expected to serialize them.
pub trait Codec: Send + Sync + 'static {
    /// Fails with [`Error::Closed`](crate::Error::Closed) when the peer ended
    /// the stream cleanly.
    fn read_header(&self) -> impl Future<Output = Result<Header>> + Send;

    fn read_body<T>(&self) -> impl Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send;

    /// Encodes both parts before touching the stream, then writes and flushes
    /// them together.
    fn write<T>(&self, header: &Header, body: &T) -> impl Future<Output = Result<()>> + Send
    where
        T: Serialize + Sync + ?Sized;

    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Tag naming a codec variant in the connection handshake.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct CodecType(Cow<'static, str>);

impl CodecType {
    /// Length-delimited bincode frames. The tag is kept for peers of the same
    /// protocol family.
    pub const GOB: CodecType = CodecType(Cow::Borrowed("application/gob"));
    /// Newline-delimited JSON documents.
    pub const JSON: CodecType = CodecType(Cow::Borrowed("application/json"));

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CodecType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for CodecType {
    fn from(value: &'static str) -> Self {
        CodecType(Cow::Borrowed(value))
    }
}

impl From<String> for CodecType {
    fn from(value: String) -> Self {
        CodecType(Cow::Owned(value))
    }
}

impl FromStr for CodecType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CodecType::from(s.to_owned()))
    }
}

/// Body of every reply that carries an error instead of a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoBody;

/// The variants a [`CodecRegistry`] can hand out.
#[derive(From)]
pub enum AnyCodec {
    Binary(BinaryCodec),
    Json(JsonCodec),
}

impl Codec for AnyCodec {
    async fn read_header(&self) -> Result<Header> {
        match self {
            AnyCodec::Binary(codec) => codec.read_header().await,
            AnyCodec::Json(codec) => codec.read_header().await,
        }
    }

    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self {
            AnyCodec::Binary(codec) => codec.read_body().await,
            AnyCodec::Json(codec) => codec.read_body().await,
        }
    }

    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        match self {
            AnyCodec::Binary(codec) => codec.write(header, body).await,
            AnyCodec::Json(codec) => codec.write(header, body).await,
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            AnyCodec::Binary(codec) => codec.close().await,
            AnyCodec::Json(codec) => codec.close().await,
        }
    }
}
