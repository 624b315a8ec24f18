//! Streaming relay between an MCP client and the upstream server.
//!
//! # States
//! ```text
//! RECEIVING_REQUEST → FORWARDING_REQUEST → AWAITING_UPSTREAM
//!     → STREAMING_RESPONSE → { COMPLETE, FAILED }
//! ```
//!
//! The request body is small and buffered whole. The response body is never
//! buffered: each upstream line is logged (C→B, truncated for display) and
//! handed to the client as soon as the client pulls it, so the upstream is
//! read no faster than the client reads. Bytes without a newline are
//! released once the upstream goes idle or the framer's cap is reached. The C→B record stands for the B→A
//! hop as well since the bytes are identical.

use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{stream, FutureExt, Stream, StreamExt};
use thiserror::Error;
use tracing::Instrument;

use crate::config::UpstreamConfig;
use crate::http::framing::LineFramer;
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, Direction, PacketLogger};
use crate::security::headers::{client_response_headers, upstream_request_headers};

/// Body returned to the client when the upstream cannot be reached.
pub const UPSTREAM_ERROR_BODY: &str = "Upstream connection error";

/// Body returned when shutdown wins the race against upstream headers.
pub const SHUTTING_DOWN_BODY: &str = "Proxy shutting down";

/// Relay failures.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No response head from the upstream: refused, DNS, TLS, connect timeout.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    /// The upstream body broke after the response head was sent to the client.
    #[error("upstream stream interrupted: {0}")]
    UpstreamStreamInterrupted(String),

    /// Shutdown was requested before the upstream answered.
    #[error("shutdown requested")]
    ShutdownRequested,

    /// The upstream HTTP client could not be built.
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::UpstreamUnreachable(_) | RelayError::UpstreamStreamInterrupted(_) => {
                (StatusCode::BAD_GATEWAY, UPSTREAM_ERROR_BODY).into_response()
            }
            RelayError::ShutdownRequested => {
                (StatusCode::SERVICE_UNAVAILABLE, SHUTTING_DOWN_BODY).into_response()
            }
            RelayError::Client(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Proxy misconfigured").into_response()
            }
        }
    }
}

/// Forwards requests to the one configured upstream.
#[derive(Debug, Clone)]
pub struct Relay {
    client: reqwest::Client,
    upstream_url: String,
    logger: PacketLogger,
    shutdown: Shutdown,
}

impl Relay {
    /// Build a relay for `config`.
    ///
    /// Only connection establishment is time-bounded; the response body may
    /// stay open for as long as the upstream keeps streaming. `HTTP_PROXY`,
    /// `HTTPS_PROXY` and `NO_PROXY` from the environment are honoured unless
    /// `use_env_proxy` is off.
    pub fn new(
        config: &UpstreamConfig,
        logger: PacketLogger,
        shutdown: Shutdown,
    ) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(RelayError::Client)?;

        Ok(Self {
            client,
            upstream_url: config.url.clone(),
            logger,
            shutdown,
        })
    }

    /// The fixed upstream endpoint.
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Relay one request and return the (streaming) client response.
    ///
    /// Every failure is handled here and turned into a response; nothing
    /// escapes to affect other requests.
    pub async fn handle(&self, request_id: &str, headers: &HeaderMap, body: Bytes) -> Response {
        let start = Instant::now();

        // RECEIVING_REQUEST
        self.logger.log_body(Direction::ClientToProxy, &body);

        // FORWARDING_REQUEST
        let outbound_headers = upstream_request_headers(headers);
        self.logger.log_body(Direction::ProxyToUpstream, &body);

        tracing::debug!(
            request_id,
            upstream = %self.upstream_url,
            body_len = body.len(),
            "Forwarding request upstream"
        );

        let send = self
            .client
            .post(&self.upstream_url)
            .headers(outbound_headers)
            .body(body)
            .send();

        // AWAITING_UPSTREAM
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(RelayError::ShutdownRequested),
            result = send => result.map_err(RelayError::UpstreamUnreachable),
        };

        let upstream = match result {
            Ok(response) => response,
            Err(err) => return self.fail(request_id, err, start),
        };

        // STREAMING_RESPONSE
        let status = upstream.status();
        let response_headers = client_response_headers(upstream.headers());

        tracing::debug!(request_id, status = %status, "Upstream responded, streaming");

        let chunks = relay_stream(
            upstream.bytes_stream(),
            self.logger.clone(),
            self.shutdown.clone(),
            start,
            tracing::info_span!("relay_stream", request_id = %request_id),
        );

        let mut response = Response::new(Body::from_stream(chunks));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        response
    }

    fn fail(&self, request_id: &str, err: RelayError, start: Instant) -> Response {
        match &err {
            RelayError::UpstreamUnreachable(source) => {
                tracing::error!(request_id, error = %err, "Upstream request failed");
                self.logger
                    .log_error(&format!("Proxy error contacting upstream:\n{source:?}"));
                self.logger
                    .emit(Direction::ProxyToClient, UPSTREAM_ERROR_BODY);
                metrics::record_upstream_error("unreachable");
                metrics::record_request("failed", start);
            }
            RelayError::ShutdownRequested => {
                tracing::info!(request_id, "Shutdown requested while awaiting upstream");
                metrics::record_request("aborted", start);
            }
            _ => {
                tracing::error!(request_id, error = %err, "Relay failed");
                metrics::record_request("failed", start);
            }
        }
        err.into_response()
    }
}

type UpstreamBody<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

struct StreamState<E> {
    upstream: UpstreamBody<E>,
    framer: LineFramer,
    logger: PacketLogger,
    shutdown: Shutdown,
    start: Instant,
    span: tracing::Span,
    chunks: u64,
    done: bool,
}

/// Turn an upstream body into the line stream sent to the client.
///
/// Each line is logged as C→B before it is yielded, exactly once. The
/// shutdown flag is checked between lines; once it is set no further line
/// is forwarded and the body ends. A transport error mid-stream is logged
/// and surfaces as a body error, which aborts the client connection.
pub fn relay_stream<S, E>(
    upstream: S,
    logger: PacketLogger,
    shutdown: Shutdown,
    start: Instant,
    span: tracing::Span,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = StreamState {
        upstream: Box::pin(upstream),
        framer: LineFramer::new(),
        logger,
        shutdown,
        start,
        span,
        chunks: 0,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        let span = state.span.clone();
        let item = state.next_chunk().instrument(span).await?;
        Some((item, state))
    })
}

impl<E: fmt::Display> StreamState<E> {
    async fn next_chunk(&mut self) -> Option<Result<Bytes, RelayError>> {
        if self.done {
            return None;
        }

        loop {
            if self.shutdown.is_triggered() {
                return self.abort();
            }

            if let Some(line) = self.framer.next_line() {
                return Some(Ok(self.forward(line)));
            }

            // A partial line waits only while the upstream has more ready.
            let ready = if self.framer.pending() > 0 {
                self.upstream.next().now_or_never()
            } else {
                None
            };

            let next = match ready {
                Some(next) => next,
                None => {
                    if let Some(partial) = self.framer.take_partial() {
                        return Some(Ok(self.forward(partial)));
                    }
                    let next = tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => None,
                        next = self.upstream.next() => Some(next),
                    };
                    match next {
                        Some(next) => next,
                        None => return self.abort(),
                    }
                }
            };

            match next {
                Some(Ok(data)) => self.framer.push(&data),
                Some(Err(e)) => return Some(Err(self.interrupted(e))),
                None => {
                    self.complete();
                    return self.framer.finish().map(|line| Ok(self.forward(line)));
                }
            }
        }
    }

    fn forward(&mut self, line: Bytes) -> Bytes {
        self.logger.log_chunk(Direction::UpstreamToProxy, &line);
        metrics::record_chunk();
        self.chunks += 1;
        line
    }

    fn complete(&mut self) {
        self.done = true;
        tracing::debug!(chunks = self.chunks, "Upstream stream complete");
        metrics::record_request("complete", self.start);
    }

    fn abort(&mut self) -> Option<Result<Bytes, RelayError>> {
        self.done = true;
        tracing::info!(
            chunks = self.chunks,
            discarded = self.framer.pending(),
            "Relay aborted: shutdown requested"
        );
        self.logger.log_error("Relay aborted: shutdown requested");
        metrics::record_request("aborted", self.start);
        None
    }

    fn interrupted(&mut self, e: E) -> RelayError {
        self.done = true;
        let err = RelayError::UpstreamStreamInterrupted(e.to_string());
        tracing::error!(chunks = self.chunks, error = %err, "Upstream stream interrupted");
        self.logger.log_error(&format!("Upstream stream interrupted:\n{e}"));
        metrics::record_upstream_error("stream_interrupted");
        metrics::record_request("failed", self.start);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::framing::MAX_PENDING;
    use crate::observability::{SharedBuffer, TRUNCATION_MARKER};

    fn logger() -> (PacketLogger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (PacketLogger::new(buffer.clone()).with_color(false), buffer)
    }

    fn ok_chunks(chunks: &[&'static str]) -> Vec<Result<Bytes, String>> {
        chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect()
    }

    async fn collect(
        upstream: Vec<Result<Bytes, String>>,
        logger: PacketLogger,
        shutdown: Shutdown,
    ) -> Vec<Result<Bytes, RelayError>> {
        relay_stream(stream::iter(upstream), logger, shutdown, Instant::now(), tracing::Span::none())
            .collect()
            .await
    }

    #[tokio::test]
    async fn forwards_chunks_verbatim_and_logs_each_once() {
        let (logger, buffer) = logger();
        let chunks = ["{\"a\":1}\n", "data: hello\n", "data: world\n"];

        let out = collect(ok_chunks(&chunks), logger, Shutdown::new()).await;

        let bytes: Vec<u8> = out
            .into_iter()
            .flat_map(|r| r.unwrap().to_vec())
            .collect();
        assert_eq!(bytes, chunks.concat().as_bytes());
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 3);
        assert_eq!(buffer.count_records(Direction::ProxyToClient), 0);
        assert_eq!(buffer.count_records(Direction::Error), 0);
    }

    #[tokio::test]
    async fn reframes_arbitrary_transport_chunks() {
        let (logger, buffer) = logger();
        let out = collect(ok_chunks(&["data: a", "b\ndata:", " c\n\n"]), logger, Shutdown::new()).await;

        let lines: Vec<Bytes> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            lines,
            vec![
                Bytes::from_static(b"data: ab\n"),
                Bytes::from_static(b"data: c\n"),
                Bytes::from_static(b"\n"),
            ]
        );
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 3);
    }

    #[tokio::test]
    async fn appends_newline_to_unterminated_tail() {
        let (logger, _buffer) = logger();
        let out = collect(ok_chunks(&["{\"id\":1}"]), logger, Shutdown::new()).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from_static(b"{\"id\":1}\n"));
    }

    #[tokio::test]
    async fn long_lines_truncated_in_log_only() {
        let (logger, buffer) = logger();
        let line = format!("data: {}\n", "x".repeat(1_000));
        let upstream = vec![Ok(Bytes::from(line.clone()))];

        let out = collect(upstream, logger, Shutdown::new()).await;

        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from(line));
        assert!(buffer.contents().contains(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn mid_stream_error_stops_forwarding() {
        let (logger, buffer) = logger();
        let upstream = vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"data: never\n")),
        ];

        let out = collect(upstream, logger, Shutdown::new()).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from_static(b"data: one\n"));
        assert!(matches!(out[1], Err(RelayError::UpstreamStreamInterrupted(ref m)) if m == "connection reset"));
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 1);
        assert_eq!(buffer.count_records(Direction::Error), 1);
        assert!(!buffer.contents().contains("never"));
    }

    #[tokio::test]
    async fn shutdown_before_first_chunk_ends_stream() {
        let (logger, buffer) = logger();
        let shutdown = Shutdown::new();
        shutdown.trigger("test");

        let out = collect(ok_chunks(&["data: a\n"]), logger, shutdown).await;

        assert!(out.is_empty());
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 0);
        assert!(buffer.contents().contains("Relay aborted: shutdown requested"));
    }

    #[tokio::test]
    async fn shutdown_between_chunks_stops_forwarding() {
        let (logger, buffer) = logger();
        let shutdown = Shutdown::new();
        let mut chunks = Box::pin(relay_stream(
            stream::iter(ok_chunks(&["data: 1\ndata: 2\n", "data: 3\n"])),
            logger,
            shutdown.clone(),
            Instant::now(),
            tracing::Span::none(),
        ));

        let first = chunks.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from_static(b"data: 1\n"));

        shutdown.trigger("test");
        assert!(chunks.next().await.is_none());
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 1);
        assert_eq!(buffer.count_records(Direction::Error), 1);
    }

    #[tokio::test]
    async fn shutdown_wakes_idle_stream() {
        let (logger, _buffer) = logger();
        let shutdown = Shutdown::new();
        let upstream = stream::pending::<Result<Bytes, String>>();
        let mut chunks = Box::pin(relay_stream(
            upstream,
            logger,
            shutdown.clone(),
            Instant::now(),
            tracing::Span::none(),
        ));

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger("test");
        });

        let next = tokio::time::timeout(Duration::from_secs(1), chunks.next())
            .await
            .expect("idle stream should observe shutdown");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn partial_line_forwarded_while_upstream_idle() {
        let (logger, buffer) = logger();
        let reply = "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}";
        let upstream = stream::iter(vec![Ok::<_, String>(Bytes::from_static(reply.as_bytes()))])
            .chain(stream::pending());
        let mut chunks = Box::pin(relay_stream(
            upstream,
            logger,
            Shutdown::new(),
            Instant::now(),
            tracing::Span::none(),
        ));

        let first = tokio::time::timeout(Duration::from_millis(500), chunks.next())
            .await
            .expect("partial line should not wait for a newline")
            .unwrap()
            .unwrap();
        assert_eq!(first, Bytes::from_static(reply.as_bytes()));
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), 1);
        assert!(buffer.contents().contains(reply));
    }

    #[tokio::test]
    async fn partial_line_closed_with_newline_at_end() {
        let (logger, _buffer) = logger();
        let upstream = stream::iter(vec![Ok::<_, String>(Bytes::from_static(b"{\"id\":1}"))])
            .chain(stream::once(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Bytes::new())
            }));

        let out: Vec<Bytes> = relay_stream(
            upstream,
            logger,
            Shutdown::new(),
            Instant::now(),
            tracing::Span::none(),
        )
        .map(Result::unwrap)
        .collect()
        .await;

        assert_eq!(
            out,
            vec![Bytes::from_static(b"{\"id\":1}"), Bytes::from_static(b"\n")]
        );
    }

    #[tokio::test]
    async fn newline_free_body_released_in_bounded_pieces() {
        let (logger, buffer) = logger();
        let piece = Bytes::from(vec![b'x'; 1024]);
        let total = 200 * piece.len();
        let upstream = stream::iter((0..200).map(move |_| Ok::<_, String>(piece.clone())))
            .chain(stream::pending());
        let mut chunks = Box::pin(relay_stream(
            upstream,
            logger,
            Shutdown::new(),
            Instant::now(),
            tracing::Span::none(),
        ));

        let mut received = Vec::new();
        while received.iter().map(Bytes::len).sum::<usize>() < total {
            let chunk = tokio::time::timeout(Duration::from_secs(1), chunks.next())
                .await
                .expect("bytes should flow without a newline")
                .unwrap()
                .unwrap();
            assert!(chunk.len() <= MAX_PENDING);
            received.push(chunk);
        }

        assert_eq!(received[0].len(), MAX_PENDING);
        assert_eq!(received.iter().map(Bytes::len).sum::<usize>(), total);
        assert!(received.iter().all(|c| c.iter().all(|&b| b == b'x')));
        assert_eq!(buffer.count_records(Direction::UpstreamToProxy), received.len());
        assert!(buffer.contents().contains(TRUNCATION_MARKER));
    }

    #[test]
    fn builds_with_and_without_env_proxy() {
        let (logger, _buffer) = logger();
        let mut config = UpstreamConfig::default();
        assert!(Relay::new(&config, logger.clone(), Shutdown::new()).is_ok());
        config.use_env_proxy = false;
        let relay = Relay::new(&config, logger, Shutdown::new()).unwrap();
        assert_eq!(relay.upstream_url(), "http://127.0.0.1:8030/mcp");
    }

    #[test]
    fn error_responses() {
        assert_eq!(
            RelayError::ShutdownRequested.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RelayError::UpstreamStreamInterrupted("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
