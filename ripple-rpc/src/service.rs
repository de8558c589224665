use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::{future::Future, marker::PhantomData};

/// What a connection routes decoded calls to.
///
/// The server does not look inside `service_method`; routing it is up to the
/// implementation. An `Err` is sent back to the caller as the reply's error
/// text.
pub trait Service: Send + Sync + 'static {
    type Args: DeserializeOwned + Send + 'static;
    type Reply: Serialize + Send + Sync + 'static;

    fn call(
        &self,
        service_method: &str,
        args: Self::Args,
    ) -> impl Future<Output = Result<Self::Reply>> + Send;
}

/// Builds a [`Service`] out of an async closure.
///
/// ```
/// use ripple_rpc::service_fn;
///
/// let echo = service_fn(|_method: String, args: String| async move { Ok(args) });
/// ```
pub fn service_fn<F, Fut, A, R>(f: F) -> ServiceFn<F, A, R>
where
    F: Fn(String, A) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    ServiceFn {
        f,
        _marker: PhantomData,
    }
}

pub struct ServiceFn<F, A, R> {
    f: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<F, Fut, A, R> Service for ServiceFn<F, A, R>
where
    F: Fn(String, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + Sync + 'static,
{
    type Args = A;
    type Reply = R;

    fn call(&self, service_method: &str, args: A) -> impl Future<Output = Result<R>> + Send {
        (self.f)(service_method.to_owned(), args)
    }
}
