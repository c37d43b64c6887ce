//! Fault boundary around the downstream pipeline.
//!
//! A panic raised while producing the response becomes a single 500 JSON
//! response and the connection is not reused. A panic raised while the body
//! is streaming (headers already on the wire) cannot be converted; it is
//! logged and the body is cut short.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderValue, Request, Version},
    middleware::Next,
    response::Response,
};
use futures_util::{FutureExt, StreamExt};

use crate::http::request::request_id;
use crate::http::response;
use crate::observability::metrics;

/// Error yielded in place of the remaining body after a streaming fault.
#[derive(Debug, thiserror::Error)]
#[error("response body aborted by a fault after headers were sent")]
pub struct ResidualFault;

pub async fn panic_guard_middleware(request: Request<Body>, next: Next) -> Response {
    let version = request.version();
    let request_id = request_id(&request).to_string();
    let path = request.uri().path().to_string();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, guard_body(body, request_id))
        }
        Err(panic) => {
            tracing::error!(
                request_id = %request_id,
                path = %path,
                panic = %panic_message(panic.as_ref()),
                "Recovered from panic in request handler"
            );
            metrics::record_panic("handler");

            let mut response = response::server_error();
            // Connection-specific headers are illegal in HTTP/2 and later.
            if version != Version::HTTP_2 && version != Version::HTTP_3 {
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("close"));
            }
            response
        }
    }
}

/// Wrap streaming bodies so a fault mid-stream is logged instead of escaping.
///
/// Bodies with an exact size are already buffered and pass through untouched.
fn guard_body(body: Body, request_id: String) -> Body {
    if body.size_hint().exact().is_some() {
        return body;
    }

    let stream = AssertUnwindSafe(body.into_data_stream())
        .catch_unwind()
        .map(move |chunk| match chunk {
            Ok(chunk) => chunk,
            Err(panic) => {
                tracing::warn!(
                    request_id = %request_id,
                    panic = %panic_message(panic.as_ref()),
                    "Fault after response headers were sent; connection will be dropped"
                );
                metrics::record_panic("body");
                Err(axum::Error::new(ResidualFault))
            }
        });

    Body::from_stream(stream)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
