use super::{Codec, MAX_FRAME_LENGTH};
use crate::{BoxIo, Error, Header, Result};
use bytes::{Buf, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use std::io;
use tokio::{
    io::{ReadHalf, WriteHalf},
    sync::Mutex,
};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LengthDelimitedCodec};

const LEN_PREFIX: usize = 4;

/// Header and body each travel as one length-delimited frame holding a
/// bincode payload.
///
/// |  len  | header | len  | body |
/// |:-----:|:------:|:----:|:----:|
/// | 4, BE |  len   | 4,BE | len  |
pub struct BinaryCodec {
    reader: Mutex<FramedRead<ReadHalf<BoxIo>, Frames>>,
    writer: Mutex<FramedWrite<WriteHalf<BoxIo>, LengthDelimitedCodec>>,
}

impl BinaryCodec {
    pub fn new(io: BoxIo) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        let framing = LengthDelimitedCodec::builder()
            .length_field_length(LEN_PREFIX)
            .max_frame_length(MAX_FRAME_LENGTH)
            .new_codec();
        Self {
            reader: Mutex::new(FramedRead::new(read_half, Frames::default())),
            writer: Mutex::new(FramedWrite::new(write_half, framing)),
        }
    }

    async fn next_frame(&self) -> Result<BytesMut> {
        let mut reader = self.reader.lock().await;
        match reader.next().await {
            Some(frame) => frame?,
            None => Err(Error::Closed),
        }
    }
}

/// Read side of the length-delimited framing.
///
/// A frame over [`MAX_FRAME_LENGTH`] comes out as an `Err` item and its payload
/// is skipped as it arrives, so the frame after it is read normally.
#[derive(Debug, Default)]
struct Frames {
    skip: usize,
}

impl Decoder for Frames {
    type Item = Result<BytesMut>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        if self.skip > 0 {
            let n = self.skip.min(src.len());
            src.advance(n);
            self.skip -= n;
            if self.skip > 0 {
                return Ok(None);
            }
        }

        if src.len() < LEN_PREFIX {
            return Ok(None);
        }
        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > MAX_FRAME_LENGTH {
            src.advance(LEN_PREFIX);
            self.skip = len;
            return Ok(Some(Err(Error::FrameTooLong)));
        }
        if src.len() < LEN_PREFIX + len {
            src.reserve(LEN_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        Ok(Some(Ok(src.split_to(len))))
    }
}

impl Codec for BinaryCodec {
    async fn read_header(&self) -> Result<Header> {
        let frame = self.next_frame().await?;
        Ok(bincode::deserialize(&frame)?)
    }

    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let frame = self.next_frame().await?;
        Ok(bincode::deserialize(&frame)?)
    }

    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let header = Bytes::from(bincode::serialize(header)?);
        let body = Bytes::from(bincode::serialize(body)?);

        let mut writer = self.writer.lock().await;
        writer.feed(header).await?;
        writer.feed(body).await?;
        SinkExt::<Bytes>::flush(&mut *writer).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        SinkExt::<Bytes>::close(&mut *writer).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NoBody;
    use serde::Deserialize;
    use tokio::io::AsyncWriteExt;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Args {
        a: i64,
        b: i64,
    }

    fn pair() -> (BinaryCodec, BinaryCodec) {
        let (left, right) = tokio::io::duplex(64 * 1024);
        (BinaryCodec::new(Box::new(left)), BinaryCodec::new(Box::new(right)))
    }

    #[tokio::test]
    async fn test_header_and_body_round_trip() {
        let (client, server) = pair();

        let header = Header::new("Arith.Add", 1);
        client.write(&header, &Args { a: 1, b: 2 }).await.unwrap();

        assert_eq!(server.read_header().await.unwrap(), header);
        assert_eq!(server.read_body::<Args>().await.unwrap(), Args { a: 1, b: 2 });

        let mut reply = Header::new("Arith.Add", 1);
        reply.set_error("boom");
        server.write(&reply, &NoBody).await.unwrap();

        assert_eq!(client.read_header().await.unwrap().error, "boom");
        assert_eq!(client.read_body::<NoBody>().await.unwrap(), NoBody);
    }

    #[tokio::test]
    async fn test_bad_body_keeps_stream_in_sync() {
        let (client, server) = pair();

        client.write(&Header::new("Arith.Add", 1), &1u8).await.unwrap();
        client
            .write(&Header::new("Arith.Add", 2), &Args { a: 3, b: 4 })
            .await
            .unwrap();

        assert_eq!(server.read_header().await.unwrap().seq, 1);
        assert!(server.read_body::<Args>().await.is_err());

        assert_eq!(server.read_header().await.unwrap().seq, 2);
        assert_eq!(server.read_body::<Args>().await.unwrap(), Args { a: 3, b: 4 });
    }

    #[tokio::test]
    async fn test_clean_end_of_stream() {
        let (client, server) = pair();
        client.close().await.unwrap();
        drop(client);

        let err = server.read_header().await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_not_clean_end() {
        let (mut raw, right) = tokio::io::duplex(1024);
        let server = BinaryCodec::new(Box::new(right));
        raw.write_all(&[0, 0, 0, 9, 1, 2]).await.unwrap();
        drop(raw);

        let err = server.read_header().await.unwrap_err();
        assert!(!err.is_closed());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_skipped() {
        let (mut raw, right) = tokio::io::duplex(64 * 1024);
        let server = BinaryCodec::new(Box::new(right));

        let peer = tokio::spawn(async move {
            let len = MAX_FRAME_LENGTH + 1;
            raw.write_all(&(len as u32).to_be_bytes()).await.unwrap();
            raw.write_all(&vec![0u8; len]).await.unwrap();

            let header = bincode::serialize(&Header::new("Arith.Add", 2)).unwrap();
            raw.write_all(&(header.len() as u32).to_be_bytes()).await.unwrap();
            raw.write_all(&header).await.unwrap();
            raw
        });

        assert!(matches!(
            server.read_body::<Args>().await,
            Err(Error::FrameTooLong)
        ));
        assert_eq!(server.read_header().await.unwrap().seq, 2);

        drop(peer.await.unwrap());
        assert!(server.read_header().await.unwrap_err().is_closed());
    }
}
