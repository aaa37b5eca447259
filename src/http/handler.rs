//! Request handling for the demo time service.
//!
//! The service exposes a single page at `/` that shows the current date
//! and time. Admission is decided per request: over-limit clients get
//! `429 Too Many Requests` with the advised wait, clients whose address
//! cannot be reduced to an identity get `503 Service Unavailable`.

use std::net::SocketAddr;

use chrono::Local;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Response, StatusCode};
use tracing::info;

use crate::ratelimit::{client_id, RateLimiter, UNIDENTIFIED_CLIENT};

const PAGE_TITLE: &str = "Turnstile time service";

/// Decide admission for one request and build the response.
pub fn handle(limiter: &RateLimiter, peer: SocketAddr, path: &str) -> Response<Full<Bytes>> {
    if path != "/" {
        return not_found();
    }

    let client = client_id(&peer.to_string());
    if client == UNIDENTIFIED_CLIENT {
        info!(%peer, "Cannot limit rate for client");
        return service_unavailable();
    }

    let wait_secs = limiter.admit(client);
    if wait_secs > 0 {
        info!(%peer, wait_secs, "Request ignored");
        return rate_limit_exceeded(wait_secs);
    }

    info!(%peer, "Request admitted");
    time_page()
}

/// `200 OK` with the current date and time.
fn time_page() -> Response<Full<Bytes>> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    let body = format!(
        "<html><head><title>{}</title></head><body>\
         <p style=\"text-align: center; font-size: 48px;\">{}</p>\
         </body></html>",
        PAGE_TITLE, now
    );
    html_response(StatusCode::OK, body)
}

/// `429 Too Many Requests` advising the client how long to back off.
fn rate_limit_exceeded(wait_secs: u64) -> Response<Full<Bytes>> {
    let reason = format!("Rate limit exceeded. Try again in {} seconds.", wait_secs);
    let body = format!(
        "<html><head><title>{}</title></head><body>\
         <p style=\"text-align: center;\">{}</p>\
         </body></html>",
        PAGE_TITLE, reason
    );
    let mut response = html_response(StatusCode::TOO_MANY_REQUESTS, body);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(wait_secs));
    response
}

/// `503 Service Unavailable` with an empty body, for clients whose
/// identity cannot be established.
fn service_unavailable() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    response
}

fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from("Not Found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}
