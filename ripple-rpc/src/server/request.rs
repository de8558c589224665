use crate::{Codec, Error, Header};
use serde::de::DeserializeOwned;

/// One decoded call, owned by the task handling it.
#[derive(Debug)]
pub struct Request<A> {
    pub header: Header,
    pub args: A,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReadError {
    /// No header could be read; the connection is done.
    #[error("read header: {0}")]
    Header(#[source] Error),

    /// The header is fine but its body is not; only this call fails.
    #[error("read body of seq {}: {source}", .header.seq)]
    Body { header: Header, source: Error },
}

pub(crate) async fn read_request<C, A>(codec: &C) -> Result<Request<A>, ReadError>
where
    C: Codec,
    A: DeserializeOwned + Send,
{
    let header = codec.read_header().await.map_err(ReadError::Header)?;
    match codec.read_body().await {
        Ok(args) => Ok(Request { header, args }),
        Err(source) => Err(ReadError::Body { header, source }),
    }
}
