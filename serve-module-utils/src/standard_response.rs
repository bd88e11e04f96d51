// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Standard responses for various conditions

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::status::StatusCode;
use maud::{html, DOCTYPE};
use serde_json::json;
use std::io;

use crate::response::ResponseSink;

/// Content type of HTML responses
pub const HTML_TYPE: &str = "text/html; charset=utf-8";

/// Content type of JSON responses
pub const JSON_TYPE: &str = "application/json; charset=utf-8";

/// Describes an error page: status code plus the machine-readable code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage {
    /// Response status
    pub status: StatusCode,
    /// Machine-readable error code, e.g. `not_found`
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

impl ErrorPage {
    /// 400 Bad Request
    pub const BAD_REQUEST: Self = Self {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: "Bad Request",
    };

    /// 404 Not Found
    pub const NOT_FOUND: Self = Self {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: "The requested path could not be found",
    };

    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: Self = Self {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal_server_error",
        message: "A server error has occurred",
    };
}

/// Produces the text of an HTML error page.
pub fn html_error(page: &ErrorPage) -> String {
    let status_str = page.status.as_str();
    let reason = page.status.canonical_reason().unwrap_or("");
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title {
                    (status_str) " " (reason)
                }
            }

            body {
                main {
                    h1 {
                        (status_str) " " (reason)
                    }
                    p {
                        (page.message)
                    }
                }
            }
        }
    }
    .into()
}

/// Produces the JSON document describing an error.
pub fn json_error(page: &ErrorPage) -> String {
    json!({
        "error": {
            "code": page.code,
            "message": page.message,
        }
    })
    .to_string()
}

/// Completes the response with a text body, setting `Content-Type` and `Content-Length`.
pub async fn send_text(
    sink: &mut (impl ResponseSink + ?Sized),
    content_type: &'static str,
    text: String,
    send_body: bool,
) -> io::Result<()> {
    sink.set_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    sink.set_header(header::CONTENT_LENGTH, HeaderValue::from(text.len()));

    if send_body {
        sink.end(Some(Bytes::from(text))).await
    } else {
        sink.end(None).await
    }
}

/// Responds with a standard error page, JSON if the client accepts it and HTML otherwise.
pub async fn error_response(
    sink: &mut (impl ResponseSink + ?Sized),
    page: &ErrorPage,
    accepts_json: bool,
    send_body: bool,
) -> io::Result<()> {
    sink.set_status(page.status);
    if accepts_json {
        send_text(sink, JSON_TYPE, json_error(page), send_body).await
    } else {
        send_text(sink, HTML_TYPE, html_error(page), send_body).await
    }
}

/// Responds with a redirect to the given location. Redirects have no body.
pub async fn redirect_response(
    sink: &mut (impl ResponseSink + ?Sized),
    status: StatusCode,
    location: HeaderValue,
) -> io::Result<()> {
    sink.set_status(status);
    sink.set_header(header::LOCATION, location);
    sink.end(None).await
}
