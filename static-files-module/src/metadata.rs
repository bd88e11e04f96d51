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

//! File metadata handling: default response headers, ETag computation and conditional requests

use bytes::BytesMut;
use http::header::{self, HeaderMap, HeaderValue};
use httpdate::fmt_http_date;
use mime_guess::Mime;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serve_module_utils::response::BUFFER_SIZE;
use serve_module_utils::ByteStream;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::fs::Stats;

// RFC 5987 attr-char
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

fn is_textual(mime: &Mime) -> bool {
    if mime.type_() == mime_guess::mime::TEXT {
        return true;
    }

    let subtype = mime.subtype().as_str();
    let suffix = mime.suffix().map(|suffix| suffix.as_str());
    mime.type_() == mime_guess::mime::APPLICATION
        && (matches!(subtype, "json" | "javascript" | "xml")
            || matches!(suffix, Some("json" | "xml")))
}

/// Determines the `Content-Type` header for a file. The request path is used if the file path
/// doesn’t produce a MIME type.
pub fn content_type(path: &Path, request_path: &str) -> HeaderValue {
    let mime = mime_guess::from_path(path)
        .first()
        .or_else(|| mime_guess::from_path(request_path).first())
        .unwrap_or(mime_guess::mime::APPLICATION_OCTET_STREAM);

    let value = if is_textual(&mime) && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    };
    HeaderValue::try_from(value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// Produces the `Content-Disposition` header value for a file name.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect::<String>();

    let value = if fallback == file_name {
        format!("inline; filename=\"{fallback}\"")
    } else {
        format!(
            "inline; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(file_name, ATTR_CHAR)
        )
    };
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

/// Produces the default headers for a file response: `Content-Type`, `Content-Length`,
/// `Content-Disposition`, `Accept-Ranges`, `Last-Modified` and optionally `ETag`.
pub fn default_headers(
    path: &Path,
    request_path: &str,
    stats: &Stats,
    etag: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type(path, request_path));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stats.size));
    if let Some(file_name) = path.file_name() {
        headers.insert(
            header::CONTENT_DISPOSITION,
            content_disposition(&file_name.to_string_lossy()),
        );
    }
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(modified) = stats.modified {
        if let Ok(value) = HeaderValue::try_from(fmt_http_date(modified)) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
    if let Some(etag) = etag.and_then(|etag| HeaderValue::try_from(etag).ok()) {
        headers.insert(header::ETAG, etag);
    }
    headers
}

/// Computes a strong ETag from the contents of a stream, e.g. `"3a6eb0790f39ac87…"`.
pub async fn compute_etag(mut stream: ByteStream) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = BytesMut::zeroed(BUFFER_SIZE);
    loop {
        let len = stream.read(buf.as_mut()).await?;
        if len == 0 {
            break;
        }
        hasher.update(&buf[..len]);
    }

    let digest = hasher.finalize();
    let mut result = String::with_capacity(digest.len() * 2 + 2);
    result.push('"');
    for byte in digest {
        result.push_str(&format!("{byte:02x}"));
    }
    result.push('"');
    Ok(result)
}

/// Checks the `If-None-Match` request header against the `ETag` response header to determine
/// whether a `304 Not Modified` response should be produced.
pub fn is_not_modified(request: &HeaderMap, response: &HeaderMap) -> bool {
    let Some(value) = request
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let Some(etag) = response
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    value.trim() == "*"
        || value
            .split(',')
            .map(str::trim)
            .map(|value| value.strip_prefix("W/").unwrap_or(value))
            .any(|value| value == etag)
}
