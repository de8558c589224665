//! Connection handshake.
//!
//! Before any codec-framed traffic the initiating peer sends one
//! [`ConnOptions`] record as a single line of JSON:
//!
//! ```text
//! {"MagicNumber":3927900,"CodecType":"application/gob"}\n
//! ```
//!
//! The record is never encoded with the negotiated codec, so a server can
//! learn which codec to use before it parses anything codec specific.

use crate::{
    BoxIo, Error, Result,
    codec::{CodecRegistry, CodecType, NewCodecFn},
    io::Rewind,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec};

/// Identifies this protocol family.
pub const MAGIC_NUMBER: u64 = 0x3bef5c;

/// Longest options line a server accepts.
pub const MAX_OPTIONS_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnOptions {
    pub magic_number: u64,
    pub codec_type: CodecType,
}

impl ConnOptions {
    pub fn new(codec_type: CodecType) -> Self {
        Self {
            magic_number: MAGIC_NUMBER,
            codec_type,
        }
    }

    /// Reads one options line off `io`.
    ///
    /// Whatever the peer sent after the line is handed back in front of the
    /// returned stream.
    pub async fn read_from(io: BoxIo) -> Result<(Self, BoxIo)> {
        let mut framed = FramedRead::new(io, LinesCodec::new_with_max_length(MAX_OPTIONS_LEN));
        let line = match framed.next().await {
            Some(line) => line?,
            None => return Err(Error::Closed),
        };
        let options = serde_json::from_str(&line)?;

        let rest = framed.read_buffer_mut().split().freeze();
        let io: BoxIo = Box::new(Rewind::new(rest, framed.into_inner()));
        Ok((options, io))
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Rejects a foreign protocol, then an unknown codec, in that order, and
    /// returns the factory for the requested codec.
    pub fn validate(&self, registry: &CodecRegistry) -> Result<NewCodecFn> {
        if self.magic_number != MAGIC_NUMBER {
            return Err(Error::InvalidMagicNumber(self.magic_number));
        }
        registry
            .get(&self.codec_type)
            .ok_or_else(|| Error::InvalidCodecType(self.codec_type.clone()))
    }
}

impl Default for ConnOptions {
    fn default() -> Self {
        Self::new(CodecType::GOB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&ConnOptions::default()).unwrap();
        assert_eq!(json, r#"{"MagicNumber":3927900,"CodecType":"application/gob"}"#);
    }

    #[tokio::test]
    async fn test_read_keeps_trailing_bytes() {
        let (mut client, server) = tokio::io::duplex(1024);
        let options = ConnOptions::new(CodecType::JSON);
        options.write_to(&mut client).await.unwrap();
        client.write_all(b"next").await.unwrap();
        drop(client);

        let (read, mut rest) = ConnOptions::read_from(Box::new(server)).await.unwrap();
        assert_eq!(read, options);

        let mut buf = Vec::new();
        rest.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"next");
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_line() {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(&[b' '; MAX_OPTIONS_LEN + 1]).await.unwrap();

        let err = ConnOptions::read_from(Box::new(server))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Lines(_)));
    }

    #[tokio::test]
    async fn test_read_eof() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let err = ConnOptions::read_from(Box::new(server))
            .await
            .err()
            .unwrap();
        assert!(err.is_closed());
    }

    #[test]
    fn test_validate_order() {
        let registry = CodecRegistry::default();
        assert!(ConnOptions::default().validate(&registry).is_ok());

        let options = ConnOptions {
            magic_number: 1,
            codec_type: "text/plain".into(),
        };
        assert!(matches!(
            options.validate(&registry),
            Err(Error::InvalidMagicNumber(1))
        ));

        let options = ConnOptions::new("text/plain".into());
        assert!(matches!(
            options.validate(&registry),
            Err(Error::InvalidCodecType(_))
        ));

        let json_only = CodecRegistry::from_types([&CodecType::JSON]).unwrap();
        assert!(matches!(
            ConnOptions::default().validate(&json_only),
            Err(Error::InvalidCodecType(_))
        ));
        assert!(ConnOptions::new(CodecType::JSON).validate(&json_only).is_ok());
    }
}
