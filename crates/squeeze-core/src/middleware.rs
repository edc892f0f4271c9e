//! Seam between a hosting server and response filters
//!
//! A host renders pages through a [`Handler`] and wraps it in a stack of
//! [`Middleware`]. A filter sees the request first, asks [`Next`] for the
//! rendered response, and may replace the body before handing it back. The
//! host keeps ownership of the connection and of headers it sets later.

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Fully buffered response body
///
/// Filters rewrite whole bodies, so streaming bodies are not modelled.
pub type Body = Full<Bytes>;

/// Boxed future returned by a [`Handler`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<Body>>> + Send>>;

/// Renderer producing the unfiltered response at the end of a chain
pub type Handler = Box<dyn Fn(Request<Body>) -> HandlerFuture + Send + Sync>;

/// A layer around the renderer
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Produce the response for `req`, normally by running `next` and
    /// post-processing its result
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>>;
}

/// The part of the chain that has not run yet
///
/// Consumed by [`run`](Self::run); clone it to render more than once.
pub struct Next {
    stack: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    handler: Option<Arc<Handler>>,
}

impl Next {
    /// Chain without a renderer; running past the last layer is an error
    pub fn new(stack: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self {
            stack,
            position: 0,
            handler: None,
        }
    }

    /// Chain of `stack` layers ending in `handler`
    pub fn with_handler(stack: Arc<[Arc<dyn Middleware>]>, handler: Handler) -> Self {
        Self {
            stack,
            position: 0,
            handler: Some(Arc::new(handler)),
        }
    }

    /// Chain that goes straight to `handler`
    pub fn handler(handler: Handler) -> Self {
        Self::with_handler(Arc::from(Vec::<Arc<dyn Middleware>>::new()), handler)
    }

    /// Run the next layer, or the renderer once every layer has run
    pub async fn run(self, req: Request<Body>) -> Result<Response<Body>> {
        match self.stack.get(self.position) {
            Some(middleware) => {
                let middleware = Arc::clone(middleware);
                let next = Self {
                    stack: Arc::clone(&self.stack),
                    position: self.position + 1,
                    handler: self.handler.clone(),
                };
                middleware.call(req, next).await
            }
            None => match self.handler {
                Some(handler) => handler(req).await,
                None => Err(Error::Middleware(
                    "chain exhausted without a handler".to_string(),
                )),
            },
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            stack: Arc::clone(&self.stack),
            position: self.position,
            handler: self.handler.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &(self.stack.len() - self.position))
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
