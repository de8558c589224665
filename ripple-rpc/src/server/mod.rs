use crate::{
    BoxIo, Codec, Io, Result, Service,
    codec::{AnyCodec, CodecRegistry},
    handshake::ConnOptions,
};
use futures::FutureExt;
use request::{ReadError, read_request};
use response::Responder;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};
use ulid::Ulid;

pub use request::Request;

pub mod request;
pub(crate) mod response;

/// Serves one [`Service`] over any number of connections.
///
/// Each connection starts with a [`ConnOptions`] handshake choosing a codec
/// from the server's [`CodecRegistry`]. After that every decoded request runs
/// in its own task, so a slow call never holds up the ones behind it, and
/// replies are written back in completion order under a per-connection write
/// lock.
pub struct Server<S> {
    service: Arc<S>,
    registry: CodecRegistry,
}

impl<S> Clone for Server<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<S: Service> Server<S> {
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(service),
            registry: CodecRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Serves every connection `listener` accepts, each on its own task.
    pub async fn accept(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, remote) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("rpc server: accept error: {}", e);
                    return Err(e.into());
                }
            };
            debug!(%remote, "rpc server: accepted connection");
            let server = self.clone();
            tokio::spawn(async move { server.serve_conn(stream).await });
        }
    }

    /// Runs the handshake on `io`, then serves it until the peer stops
    /// sending requests. A failed handshake drops the stream without writing
    /// anything back.
    #[tracing::instrument(skip_all, fields(conn_id = Ulid::new().to_string()))]
    pub async fn serve_conn(&self, io: impl Io + 'static) {
        let codec = match self.negotiate(Box::new(io)).await {
            Ok(codec) => codec,
            Err(e) => {
                warn!("rpc server: options error: {}", e);
                return;
            }
        };
        self.serve_codec(codec).await;
    }

    async fn negotiate(&self, io: BoxIo) -> Result<AnyCodec> {
        let (options, io) = ConnOptions::read_from(io).await?;
        let new_codec = options.validate(&self.registry)?;
        debug!(codec_type = %options.codec_type, "rpc server: codec negotiated");
        Ok(new_codec(io))
    }

    /// The per-connection loop.
    ///
    /// Returns once no further header can be read and every request already
    /// dispatched has been answered; the codec is closed exactly once, after
    /// the last reply.
    pub async fn serve_codec<C: Codec>(&self, codec: C) {
        let codec = Arc::new(codec);
        let responder = Arc::new(Responder::new(codec.clone()));
        let tracker = TaskTracker::new();

        loop {
            match read_request::<C, S::Args>(&*codec).await {
                Ok(req) => {
                    tracker.spawn(handle_request(
                        self.service.clone(),
                        responder.clone(),
                        req,
                    ));
                }
                Err(ReadError::Body { mut header, source }) => {
                    warn!(seq = header.seq, "rpc server: read body error: {}", source);
                    responder.send_error(&mut header, source).await;
                }
                Err(ReadError::Header(e)) if e.is_closed() => {
                    debug!("rpc server: connection closed by peer");
                    break;
                }
                Err(ReadError::Header(e)) => {
                    warn!("rpc server: read header error: {}", e);
                    break;
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        if let Err(e) = codec.close().await {
            warn!("rpc server: close codec error: {}", e);
        }
    }
}

async fn handle_request<S, C>(
    service: Arc<S>,
    responder: Arc<Responder<C>>,
    req: Request<S::Args>,
) where
    S: Service,
    C: Codec,
{
    let Request { mut header, args } = req;
    let reply = AssertUnwindSafe(service.call(&header.service_method, args))
        .catch_unwind()
        .await;

    match reply {
        Ok(Ok(reply)) => responder.send(&header, &reply).await,
        Ok(Err(e)) => {
            debug!(seq = header.seq, "rpc server: call failed: {:#}", e);
            responder.send_error(&mut header, format!("{:#}", e)).await;
        }
        Err(_) => {
            error!(
                seq = header.seq,
                service_method = %header.service_method,
                "rpc server: handler panicked"
            );
            responder
                .send_error(&mut header, "rpc server: handler panicked")
                .await;
        }
    }
}
