use crate::{Codec, Header, codec::NoBody};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Body of every reply whose header carries an error.
pub(crate) static INVALID_REQUEST: NoBody = NoBody;

/// Write side of a connection, shared by every in-flight request.
pub(crate) struct Responder<C> {
    codec: Arc<C>,
    sending: Mutex<()>,
}

impl<C: Codec> Responder<C> {
    pub fn new(codec: Arc<C>) -> Self {
        Self {
            codec,
            sending: Mutex::new(()),
        }
    }

    /// Writes one reply. A failed write only loses this reply.
    pub async fn send<T>(&self, header: &Header, body: &T)
    where
        T: Serialize + Sync + ?Sized,
    {
        let _sending = self.sending.lock().await;
        if let Err(e) = self.codec.write(header, body).await {
            error!(
                seq = header.seq,
                service_method = %header.service_method,
                "rpc server: write response error: {}", e
            );
        }
    }

    pub async fn send_error(&self, header: &mut Header, error: impl ToString) {
        header.set_error(error);
        self.send(header, &INVALID_REQUEST).await;
    }
}
