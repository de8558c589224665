use crate::{
    BoxIo, Codec, Error, Header, Io, Result,
    codec::{AnyCodec, CodecRegistry, CodecType, NoBody},
    handshake::ConnOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

/// Issues one call at a time over a negotiated connection.
///
/// ```no_run
/// use ripple_rpc::{Client, codec::{CodecRegistry, CodecType}};
/// use tokio::net::TcpStream;
///
/// #[tokio::main]
/// async fn main() -> ripple_rpc::Result<()> {
///     let conn = TcpStream::connect("127.0.0.1:9999").await?;
///     let mut client = Client::connect(conn, CodecType::GOB, &CodecRegistry::default()).await?;
///     let sum: i64 = client.call("Arith.Add", &(1i64, 2i64)).await?;
///     println!("{sum}");
///     client.close().await
/// }
/// ```
pub struct Client<C = AnyCodec> {
    codec: C,
    seq: u64,
}

impl Client<AnyCodec> {
    /// Sends the handshake for `codec_type`, then frames everything else with
    /// that codec.
    pub async fn connect(
        io: impl Io + 'static,
        codec_type: CodecType,
        registry: &CodecRegistry,
    ) -> Result<Self> {
        let new_codec = registry
            .get(&codec_type)
            .ok_or_else(|| Error::InvalidCodecType(codec_type.clone()))?;

        let mut io: BoxIo = Box::new(io);
        ConnOptions::new(codec_type).write_to(&mut io).await?;

        Ok(Self::new(new_codec(io)))
    }
}

impl<C: Codec> Client<C> {
    /// Wraps a codec whose handshake has already been sent.
    pub fn new(codec: C) -> Self {
        Self { codec, seq: 0 }
    }

    pub async fn call<A, R>(&mut self, service_method: &str, args: &A) -> Result<R>
    where
        A: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        self.seq += 1;
        let header = Header::new(service_method, self.seq);
        self.codec.write(&header, args).await?;

        let reply = self.codec.read_header().await?;
        if reply.seq != header.seq {
            return Err(Error::UnexpectedSeq {
                expected: header.seq,
                actual: reply.seq,
            });
        }
        if reply.is_error() {
            let _: NoBody = self.codec.read_body().await?;
            debug!(seq = reply.seq, "rpc client: remote error: {}", reply.error);
            return Err(Error::Remote(reply.error));
        }
        self.codec.read_body().await
    }

    pub async fn close(self) -> Result<()> {
        self.codec.close().await
    }
}
