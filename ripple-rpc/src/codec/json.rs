use super::{Codec, MAX_FRAME_LENGTH};
use crate::{BoxIo, Error, Header, Result};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use std::io;
use tokio::{
    io::{ReadHalf, WriteHalf},
    sync::Mutex,
};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead, FramedWrite,
};

/// Header and body each travel as one JSON document terminated by `\n`.
pub struct JsonCodec {
    reader: Mutex<FramedRead<ReadHalf<BoxIo>, JsonLines>>,
    writer: Mutex<FramedWrite<WriteHalf<BoxIo>, AnyDelimiterCodec>>,
}

impl JsonCodec {
    pub fn new(io: BoxIo) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        Self {
            reader: Mutex::new(FramedRead::new(read_half, JsonLines::new())),
            writer: Mutex::new(FramedWrite::new(write_half, lines())),
        }
    }

    async fn next_line(&self) -> Result<Bytes> {
        let mut reader = self.reader.lock().await;
        match reader.next().await {
            Some(line) => line?,
            None => Err(Error::Closed),
        }
    }
}

fn lines() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_FRAME_LENGTH)
}

/// Newline framing over raw bytes.
///
/// A line over [`MAX_FRAME_LENGTH`] comes out as an `Err` item and the rest of
/// it is discarded as it arrives, so the stream stays usable. Text encoding is
/// left to `serde_json`.
struct JsonLines {
    inner: AnyDelimiterCodec,
}

impl JsonLines {
    fn new() -> Self {
        Self { inner: lines() }
    }
}

impl Decoder for JsonLines {
    type Item = Result<Bytes>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        skip_long_line(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        skip_long_line(self.inner.decode_eof(src))
    }
}

fn skip_long_line(
    frame: Result<Option<Bytes>, AnyDelimiterCodecError>,
) -> io::Result<Option<Result<Bytes>>> {
    match frame {
        Ok(line) => Ok(line.map(Ok)),
        Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
            Ok(Some(Err(Error::FrameTooLong)))
        }
        Err(e) => Err(io::Error::other(e)),
    }
}

impl Codec for JsonCodec {
    async fn read_header(&self) -> Result<Header> {
        let line = self.next_line().await?;
        Ok(serde_json::from_slice(&line)?)
    }

    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let line = self.next_line().await?;
        Ok(serde_json::from_slice(&line)?)
    }

    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let header = serde_json::to_string(header)?;
        let body = serde_json::to_string(body)?;

        let mut writer = self.writer.lock().await;
        writer.feed(header).await?;
        writer.feed(body).await?;
        SinkExt::<String>::flush(&mut *writer).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        SinkExt::<String>::close(&mut *writer).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NoBody;
    use serde::Deserialize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Args {
        a: i64,
        b: i64,
    }

    #[tokio::test]
    async fn test_wire_format() {
        let (left, mut right) = tokio::io::duplex(1024);
        let codec = JsonCodec::new(Box::new(left));

        codec
            .write(&Header::new("Arith.Add", 3), &Args { a: 1, b: 2 })
            .await
            .unwrap();
        codec.close().await.unwrap();
        drop(codec);

        let mut wire = String::new();
        right.read_to_string(&mut wire).await.unwrap();
        assert_eq!(
            wire,
            "{\"ServiceMethod\":\"Arith.Add\",\"Seq\":3,\"Error\":\"\"}\n{\"a\":1,\"b\":2}\n"
        );
    }

    #[tokio::test]
    async fn test_header_and_body_round_trip() {
        let (left, right) = tokio::io::duplex(1024);
        let (client, server) = (JsonCodec::new(Box::new(left)), JsonCodec::new(Box::new(right)));

        let mut header = Header::new("Arith.Div", 9);
        header.set_error("divide by zero");
        client.write(&header, &NoBody).await.unwrap();

        assert_eq!(server.read_header().await.unwrap(), header);
        assert_eq!(server.read_body::<NoBody>().await.unwrap(), NoBody);
    }

    #[tokio::test]
    async fn test_bad_body_line_is_consumed() {
        let (mut raw, right) = tokio::io::duplex(1024);
        let server = JsonCodec::new(Box::new(right));
        raw.write_all(
            b"{\"ServiceMethod\":\"Arith.Add\",\"Seq\":1,\"Error\":\"\"}\n\"oops\"\n\
              {\"ServiceMethod\":\"Arith.Add\",\"Seq\":2,\"Error\":\"\"}\n{\"a\":3,\"b\":4}\n",
        )
        .await
        .unwrap();

        assert_eq!(server.read_header().await.unwrap().seq, 1);
        assert!(matches!(server.read_body::<Args>().await, Err(Error::Json(_))));
        assert_eq!(server.read_header().await.unwrap().seq, 2);
        assert_eq!(server.read_body::<Args>().await.unwrap(), Args { a: 3, b: 4 });

        drop(raw);
        assert!(server.read_header().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_invalid_utf8_body_is_consumed() {
        let (mut raw, right) = tokio::io::duplex(1024);
        let server = JsonCodec::new(Box::new(right));
        raw.write_all(
            b"{\"ServiceMethod\":\"Arith.Add\",\"Seq\":1,\"Error\":\"\"}\n\xff\xfe\n\
              {\"ServiceMethod\":\"Arith.Add\",\"Seq\":2,\"Error\":\"\"}\n{\"a\":3,\"b\":4}\n",
        )
        .await
        .unwrap();

        assert_eq!(server.read_header().await.unwrap().seq, 1);
        assert!(matches!(server.read_body::<Args>().await, Err(Error::Json(_))));
        assert_eq!(server.read_header().await.unwrap().seq, 2);
        assert_eq!(server.read_body::<Args>().await.unwrap(), Args { a: 3, b: 4 });
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped() {
        let (mut raw, right) = tokio::io::duplex(64 * 1024);
        let server = JsonCodec::new(Box::new(right));

        let peer = tokio::spawn(async move {
            let mut line = vec![b'"'];
            line.resize(MAX_FRAME_LENGTH + 2, b'a');
            line.extend_from_slice(b"\"\n");
            raw.write_all(&line).await.unwrap();
            raw.write_all(b"{\"ServiceMethod\":\"Arith.Add\",\"Seq\":2,\"Error\":\"\"}\n")
                .await
                .unwrap();
            raw
        });

        assert!(matches!(
            server.read_body::<String>().await,
            Err(Error::FrameTooLong)
        ));
        assert_eq!(server.read_header().await.unwrap().seq, 2);

        drop(peer.await.unwrap());
        assert!(server.read_header().await.unwrap_err().is_closed());
    }
}
