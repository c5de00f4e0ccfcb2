//! HTTP shell
//!
//! Thin hyper front end over `TrendingService`. Every envelope is returned
//! with HTTP 200; only unknown routes get a 404.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{server::conn::http1, service::service_fn, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::metrics;
use crate::schemas::Envelope;
use crate::service::TrendingService;
use crate::sources::FetchParams;

const JSON: &str = "application/json; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// Routes one request
pub async fn route<B>(
    req: Request<B>,
    service: Arc<TrendingService>,
    metrics_enabled: bool,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    drop(req);

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %path
    );

    Ok(dispatch(method, path, query, &service, metrics_enabled)
        .instrument(span)
        .await)
}

async fn dispatch(
    method: Method,
    path: String,
    query: Option<String>,
    service: &TrendingService,
    metrics_enabled: bool,
) -> Response<Full<Bytes>> {
    let start = Instant::now();

    let response = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => respond(StatusCode::NO_CONTENT, TEXT, Bytes::new()),
        (&Method::GET, "/") => {
            let (target, params) = parse_query(query.as_deref());
            envelope(StatusCode::OK, &service.handle(target.as_deref(), &params).await)
        }
        (&Method::GET, "/refresh") => {
            let (target, params) = parse_query(query.as_deref());
            envelope(StatusCode::OK, &service.refresh(target.as_deref(), &params).await)
        }
        (&Method::GET, "/health") => respond(StatusCode::OK, TEXT, Bytes::from_static(b"ok")),
        (&Method::GET, "/metrics") if metrics_enabled => {
            respond(StatusCode::OK, TEXT, Bytes::from(metrics::gather_metrics()))
        }
        _ => envelope(StatusCode::NOT_FOUND, &Envelope::failure("not found")),
    };

    debug!(
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request served"
    );
    response
}

/// Splits a query string into the target name and the remaining parameters
pub fn parse_query(query: Option<&str>) -> (Option<String>, FetchParams) {
    let mut target = None;
    let mut params = FetchParams::new();

    for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if name == "target" {
            target = Some(value.into_owned());
        } else {
            params.insert(name.into_owned(), value.into_owned());
        }
    }

    (target, params)
}

fn envelope(status: StatusCode, body: &Envelope) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode envelope");
        br#"{"code":1,"msg":"internal error"}"#.to_vec()
    });
    respond(status, JSON, Bytes::from(bytes))
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Accepts connections until the shutdown signal fires
pub async fn serve(
    listener: TcpListener,
    service: Arc<TrendingService>,
    metrics_enabled: bool,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    info!(address = %listener.local_addr()?, "HTTP server listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = service.clone();

                tokio::spawn(async move {
                    let handler = service_fn(move |req| route(req, service.clone(), metrics_enabled));
                    if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                        debug!(error = %e, peer = %peer, "Error serving connection");
                    }
                });
            }
            _ = shutdown.recv() => {
                info!("HTTP server stopped accepting connections");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::orchestrator::FetchOrchestrator;
    use crate::registry::SourceRegistry;
    use http_body_util::BodyExt;

    fn service() -> Arc<TrendingService> {
        let orchestrator = FetchOrchestrator::new(Arc::new(SourceRegistry::new()));
        Arc::new(TrendingService::new(
            Arc::new(orchestrator),
            Arc::new(ResponseCache::default()),
        ))
    }

    async fn call(method: Method, uri: &str, metrics_enabled: bool) -> (StatusCode, String, Response<Full<Bytes>>) {
        let req = Request::builder().method(method).uri(uri).body(()).unwrap();
        let response = route(req, service(), metrics_enabled).await.unwrap();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (
            status,
            String::from_utf8(bytes.to_vec()).unwrap(),
            Response::from_parts(parts, Full::new(Bytes::new())),
        )
    }

    #[test]
    fn test_parse_query() {
        let (target, params) = parse_query(Some("target=hackernews&range=3&q=a%20b"));
        assert_eq!(target.as_deref(), Some("hackernews"));
        assert_eq!(params.get("range"), Some("3"));
        assert_eq!(params.get("q"), Some("a b"));
        assert!(params.get("target").is_none());

        let (_, params) = parse_query(Some("target=weibo&a=1&a=2"));
        assert_eq!(params.get("a"), Some("2"));
        assert_eq!(params, FetchParams::new().with("a", "2"));

        let (target, params) = parse_query(None);
        assert!(target.is_none());
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body, response) = call(Method::GET, "/health", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_failure_envelope_is_still_200() {
        let (status, body, _) = call(Method::GET, "/?target=myspace", false).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({"code": 1, "msg": "target myspace is not supported"}));
    }

    #[tokio::test]
    async fn test_preflight() {
        let (status, body, response) = call(Method::OPTIONS, "/anything", false).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body, _) = call(Method::GET, "/nope", true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"code":1,"msg":"not found"}"#);
    }

    #[tokio::test]
    async fn test_metrics_route_follows_flag() {
        let (status, _, _) = call(Method::GET, "/metrics", false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        metrics::record_request(metrics::OUTCOME_SUCCESS);
        let (status, body, _) = call(Method::GET, "/metrics", true).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("trending_requests_total"));
    }
}
