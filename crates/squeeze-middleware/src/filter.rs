//! Whitespace filter middleware

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderValue, Request, Response};
use http_body_util::BodyExt;
use squeeze_config::FilterConfig;
use squeeze_core::middleware::{Body, Middleware, Next};
use squeeze_core::{Error, Result};
use squeeze_minify::{BufferedFlushWriter, CompressorPipeline, MarkerDetector};
use std::sync::Arc;
use tracing::{debug, warn};

/// Response filter that minifies rendered markup
///
/// Responses are rewritten only when:
/// - the request path matches one of the configured url patterns
/// - the status is 2xx
/// - the content type is listed (a missing content type is accepted)
/// - the body carries no `Content-Encoding`
///
/// Status, headers and extensions are passed through; only the body and its
/// `Content-Length` change. With every stage switched off the response is
/// not buffered at all.
#[derive(Debug, Clone)]
pub struct WhitespaceFilter {
    config: Arc<FilterConfig>,
    pipeline: Arc<CompressorPipeline>,
    detector: MarkerDetector,
}

impl WhitespaceFilter {
    /// Create a filter with the default configuration
    pub fn new() -> Self {
        Self {
            config: Arc::new(FilterConfig::default()),
            pipeline: Arc::new(CompressorPipeline::default()),
            detector: MarkerDetector::default(),
        }
    }

    /// Create a filter from configuration
    pub fn with_config(config: FilterConfig) -> Result<Self> {
        let detector = MarkerDetector::new(config.markers.iter().cloned())?;
        let pipeline = CompressorPipeline::new(config.options);
        debug!(
            options = %config.options,
            markers = detector.markers().len(),
            "Whitespace filter configured"
        );
        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            detector,
        })
    }

    /// Replace the compression pipeline, e.g. to plug in other compressors
    pub fn with_pipeline(mut self, pipeline: CompressorPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Filter configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Rewrite the body through a buffering writer
    fn minify_body(&self, body: &Bytes) -> Result<Vec<u8>> {
        let writer = BufferedFlushWriter::new(Vec::with_capacity(body.len()))
            .with_pipeline(Arc::clone(&self.pipeline))
            .with_detector(self.detector.clone());
        writer.write_bytes(body)?;
        let out = writer.close()?;

        let stats = writer.stats();
        debug!(
            units = stats.units,
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            "Response minified"
        );
        Ok(out)
    }
}

impl Default for WhitespaceFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for WhitespaceFilter {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        if !self.config.enabled
            || self.pipeline.options().is_passthrough()
            || !self.config.matches_path(req.uri().path())
        {
            return next.run(req).await;
        }

        let response = next.run(req).await?;

        if !should_filter_response(&response, &self.config) {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read body: {e}")))?
            .to_bytes();

        let final_body = match self.minify_body(&body_bytes) {
            Ok(minified) => Bytes::from(minified),
            Err(e) => {
                warn!(error = %e, "Failed to minify response, returning it unchanged");
                body_bytes
            }
        };

        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(final_body.len()));
        parts.headers.remove(header::TRANSFER_ENCODING);

        Ok(Response::from_parts(parts, Body::new(final_body)))
    }
}

/// Check if a response should be rewritten
fn should_filter_response(response: &Response<Body>, config: &FilterConfig) -> bool {
    if response.headers().contains_key(header::CONTENT_ENCODING) {
        return false;
    }

    if !response.status().is_success() {
        return false;
    }

    match response.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => content_type
            .to_str()
            .is_ok_and(|ct| config.is_filtered_content_type(ct)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
    use http::StatusCode;
    use squeeze_core::CompressionOptions;

    const PAGE: &str = "<html>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>\n";

    fn renderer(response: Response<Body>) -> Next {
        let response = Arc::new(response);
        Next::handler(Box::new(move |_req| {
            let response = Arc::clone(&response);
            Box::pin(async move {
                let mut builder = Response::builder().status(response.status());
                for (name, value) in response.headers() {
                    builder = builder.header(name, value);
                }
                builder.body(response.body().clone()).map_err(Error::from)
            })
        }))
    }

    fn html_response(status: u16, content_type: Option<&str>) -> Response<Body> {
        let mut builder = Response::builder().status(status);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::from(PAGE)).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::from("")).unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_minifies_html() {
        let filter = WhitespaceFilter::new();
        let next = renderer(html_response(200, Some("text/html; charset=UTF-8")));

        let response = filter.call(get("/index.html"), next).await.unwrap();
        assert_eq!(response.headers()[CONTENT_LENGTH], "39");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/html; charset=UTF-8"
        );
        assert_eq!(
            body_string(response).await,
            "<html><body><p>Hello</p></body></html>\n"
        );
    }

    #[tokio::test]
    async fn test_missing_content_type_is_filtered() {
        let filter = WhitespaceFilter::new();
        let response = filter
            .call(get("/"), renderer(html_response(200, None)))
            .await
            .unwrap();
        assert_eq!(
            body_string(response).await,
            "<html><body><p>Hello</p></body></html>\n"
        );
    }

    #[tokio::test]
    async fn test_ineligible_responses_pass_through() {
        let filter = WhitespaceFilter::new();

        let response = filter
            .call(get("/"), renderer(html_response(404, Some("text/html"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, PAGE);

        let response = filter
            .call(get("/"), renderer(html_response(200, Some("application/json"))))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, PAGE);

        let mut encoded = html_response(200, Some("text/html"));
        encoded
            .headers_mut()
            .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let response = filter.call(get("/"), renderer(encoded)).await.unwrap();
        assert_eq!(body_string(response).await, PAGE);
    }

    #[tokio::test]
    async fn test_url_patterns() {
        let config = FilterConfig {
            url_patterns: vec!["/faces/*".to_string()],
            ..FilterConfig::default()
        };
        let filter = WhitespaceFilter::with_config(config).unwrap();

        let response = filter
            .call(get("/static/page.html"), renderer(html_response(200, None)))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, PAGE);

        let response = filter
            .call(get("/faces/page.xhtml"), renderer(html_response(200, None)))
            .await
            .unwrap();
        assert_ne!(body_string(response).await, PAGE);
    }

    #[tokio::test]
    async fn test_disabled_filter() {
        let config = FilterConfig {
            enabled: false,
            ..FilterConfig::default()
        };
        let filter = WhitespaceFilter::with_config(config).unwrap();
        let response = filter
            .call(get("/"), renderer(html_response(200, None)))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, PAGE);
    }

    #[tokio::test]
    async fn test_invalid_utf8_passes_through() {
        let filter = WhitespaceFilter::new();
        let response = Response::builder()
            .header(CONTENT_TYPE, "text/html")
            .body(Body::from(&b"<p>\xff</p>\n  <p>x</p>"[..]))
            .unwrap();
        let response = filter.call(get("/"), renderer(response)).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &b"<p>\xff</p>\n  <p>x</p>"[..]);
    }

    #[tokio::test]
    async fn test_disabled_stages_skip_buffering() {
        let config = FilterConfig {
            options: CompressionOptions::disabled(),
            ..FilterConfig::default()
        };
        let filter = WhitespaceFilter::with_config(config).unwrap();
        let response = filter
            .call(get("/"), renderer(html_response(200, None)))
            .await
            .unwrap();
        // body is not collected at all
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(body_string(response).await, PAGE);
    }

    #[test]
    fn test_with_config_rejects_empty_marker() {
        let config = FilterConfig {
            markers: vec![String::new()],
            ..FilterConfig::default()
        };
        assert!(WhitespaceFilter::with_config(config).is_err());
    }
}
