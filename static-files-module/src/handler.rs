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

//! Request handling: resolving request paths and producing responses.

use headers_module::compose_headers;
use http::header::{self, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use log::{debug, error, info, warn};
use rewrite_module::{apply_rewrites, resolve_redirect};
use serve_module_utils::standard_response::{
    error_response, redirect_response, send_text, HTML_TYPE, JSON_TYPE,
};
use serve_module_utils::{ByteStream, ResponseSink};
use std::io;
use std::path::{Path, PathBuf};

use crate::clean_url::{find_related, Found};
use crate::configuration::ServeConf;
use crate::error::{is_not_found, ServeError};
use crate::fs::{stat_entry, FileSystem, LocalFileSystem, Stats};
use crate::listing::{read_directory, DirectoryContents};
use crate::metadata::{compute_etag, default_headers, is_not_modified};
use crate::path::{decode_uri_path, resolve_path};
use crate::range::{extract_range, Range};

/// Name of the custom error page for 404 Not Found responses
const NOT_FOUND_PAGE: &str = "/404.html";

/// The parts of the request relevant to the handler
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    /// Request method
    pub method: &'a Method,
    /// Request URI, only the path is considered
    pub uri: &'a Uri,
    /// Request headers
    pub headers: &'a HeaderMap,
}

impl<'a, B> From<&'a Request<B>> for RequestHead<'a> {
    fn from(request: &'a Request<B>) -> Self {
        Self {
            method: request.method(),
            uri: request.uri(),
            headers: request.headers(),
        }
    }
}

impl<'a> From<&'a Parts> for RequestHead<'a> {
    fn from(parts: &'a Parts) -> Self {
        Self {
            method: &parts.method,
            uri: &parts.uri,
            headers: &parts.headers,
        }
    }
}

/// Request properties affecting the response format
#[derive(Debug)]
struct Context<'a> {
    headers: &'a HeaderMap,
    accepts_json: bool,
    send_body: bool,
}

impl<'a> Context<'a> {
    fn new(head: &RequestHead<'a>) -> Self {
        let accepts_json = head
            .headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.contains("application/json"));
        Self {
            headers: head.headers,
            accepts_json,
            send_body: head.method != Method::HEAD,
        }
    }
}

/// Handler serving files from a directory
///
/// The configuration is cloned for each request, so that file system implementations can modify
/// it for the duration of a request without affecting other requests.
#[derive(Debug)]
pub struct ServeHandler<F = LocalFileSystem> {
    conf: ServeConf,
    fs: F,
}

impl ServeHandler {
    /// Creates a new handler accessing the local file system.
    pub fn new(conf: ServeConf) -> Self {
        Self::with_file_system(conf, LocalFileSystem)
    }
}

impl<F: FileSystem> ServeHandler<F> {
    /// Creates a new handler with custom file system access.
    pub fn with_file_system(conf: ServeConf, fs: F) -> Self {
        debug!("Initialized serve handler, settings: {conf:#?}");
        Self { conf, fs }
    }

    /// Provides read-only access to the handler’s configuration.
    pub fn conf(&self) -> &ServeConf {
        &self.conf
    }

    /// Provides read-write access to the handler’s configuration.
    pub fn conf_mut(&mut self) -> &mut ServeConf {
        &mut self.conf
    }

    /// Handles a request, writing the response into `sink`.
    ///
    /// An error is only returned if writing the response fails.
    pub async fn handle<S>(&self, head: RequestHead<'_>, sink: &mut S) -> Result<(), ServeError>
    where
        S: ResponseSink + ?Sized,
    {
        let mut conf = self.conf.clone();
        serve(head, sink, &mut conf, &self.fs).await
    }
}

/// Handles a request with the given per-request configuration and file system access.
///
/// File system operations receive `conf` and may modify it, changes apply to the remaining
/// processing of this request. An error is only returned if writing the response fails.
pub async fn serve<F, S>(
    head: RequestHead<'_>,
    sink: &mut S,
    conf: &mut ServeConf,
    fs: &F,
) -> Result<(), ServeError>
where
    F: FileSystem + ?Sized,
    S: ResponseSink + ?Sized,
{
    let ctx = Context::new(&head);
    let raw_path = head.uri.path();
    debug!("received URI path {raw_path}");

    let decoded = match decode_uri_path(raw_path) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("rejecting request path {raw_path}: {err}");
            return send_error(&ctx, sink, conf, fs, None, raw_path, err).await;
        }
    };

    let root = match conf.static_files.root() {
        Ok(root) => root,
        Err(err) => {
            error!("failed determining root directory: {err}");
            return send_error(&ctx, sink, conf, fs, None, &decoded, err.into()).await;
        }
    };

    if let Err(err) = resolve_path(&root, &decoded) {
        warn!("rejecting request path {decoded}: {err}");
        return send_error(&ctx, sink, conf, fs, None, &decoded, err).await;
    }

    let clean_url = conf.rewrite.clean_urls.applies(&decoded);
    if let Some(redirect) = resolve_redirect(&decoded, &conf.rewrite, clean_url) {
        let location = redirect.location();
        return match HeaderValue::try_from(location.as_str()) {
            Ok(value) => {
                info!("redirecting {decoded} to {location} ({})", redirect.status);
                redirect_response(sink, redirect.status, value).await?;
                Ok(())
            }
            Err(_) => {
                let err = io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid redirect target {location}"),
                );
                error!("{err}");
                send_error(&ctx, sink, conf, fs, None, &decoded, err.into()).await
            }
        };
    }

    let relative = apply_rewrites(&decoded, &conf.rewrite.rewrites);
    let absolute = match resolve_path(&root, &relative) {
        Ok(absolute) => absolute,
        Err(err) => {
            warn!("rewritten path {relative} rejected: {err}");
            return send_error(&ctx, sink, conf, fs, None, &decoded, err).await;
        }
    };
    debug!("resolved {relative} to {absolute:?}");

    let result = stat_entry(fs, &root, &absolute, conf).await;
    let mut found = match result {
        Ok(stats) => Some(Found {
            absolute,
            relative: relative.clone(),
            stats,
        }),
        Err(err) if is_not_found(&err) => None,
        Err(err) => {
            error!("failed retrieving metadata for {absolute:?}: {err}");
            return send_error(&ctx, sink, conf, fs, None, &decoded, err.into()).await;
        }
    };

    if clean_url && found.as_ref().map_or(true, |found| found.stats.is_dir()) {
        match find_related(fs, conf, &root, &relative).await {
            Ok(Some(related)) => found = Some(related),
            Ok(None) => {}
            Err(err) => {
                error!("failed resolving clean URL {relative}: {err}");
                return send_error(&ctx, sink, conf, fs, None, &decoded, err.into()).await;
            }
        }
    }

    let file = match found {
        Some(found) if found.stats.is_dir() => {
            match read_directory(fs, conf, &root, &found.relative, &found.absolute).await {
                Ok(Some(DirectoryContents::Single(file))) => file,
                Ok(Some(DirectoryContents::Listing(listing))) => {
                    info!("sending directory listing for {}", found.relative);
                    sink.set_status(StatusCode::OK);
                    if ctx.accepts_json {
                        send_text(sink, JSON_TYPE, listing.to_json(), ctx.send_body).await?;
                    } else {
                        send_text(sink, HTML_TYPE, listing.to_html(), ctx.send_body).await?;
                    }
                    return Ok(());
                }
                Ok(None) => {
                    return send_error(
                        &ctx,
                        sink,
                        conf,
                        fs,
                        Some(&root),
                        &decoded,
                        ServeError::NotFound,
                    )
                    .await
                }
                Err(err) => {
                    let err = ServeError::from_io(err);
                    if let ServeError::Upstream(err) = &err {
                        error!("failed listing directory {:?}: {err}", found.absolute);
                    }
                    return send_error(&ctx, sink, conf, fs, Some(&root), &decoded, err).await;
                }
            }
        }
        Some(found) if found.stats.is_file() => found,
        _ => {
            debug!("no file found for {relative}");
            return send_error(
                &ctx,
                sink,
                conf,
                fs,
                Some(&root),
                &decoded,
                ServeError::NotFound,
            )
            .await;
        }
    };

    serve_file(&ctx, sink, conf, fs, &decoded, file).await
}

async fn serve_file<F, S>(
    ctx: &Context<'_>,
    sink: &mut S,
    conf: &mut ServeConf,
    fs: &F,
    request_path: &str,
    file: Found,
) -> Result<(), ServeError>
where
    F: FileSystem + ?Sized,
    S: ResponseSink + ?Sized,
{
    let size = file.stats.size;
    let range = extract_range(ctx.headers, size);
    let (status, byte_range) = match range {
        Some(Range::Valid(start, end)) => {
            debug!("bytes range requested: {start}-{end}");
            (StatusCode::PARTIAL_CONTENT, Some((start, end)))
        }
        Some(Range::OutOfBounds) => {
            debug!("requested bytes range is out of bounds");
            (StatusCode::RANGE_NOT_SATISFIABLE, None)
        }
        None => (StatusCode::OK, None),
    };

    let etag = if conf.headers.etag {
        let result = match fs.open(&file.absolute, None, conf).await {
            Ok(stream) => compute_etag(stream).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(etag) => Some(etag),
            Err(err) => {
                error!("failed computing ETag for {:?}: {err}", file.absolute);
                return send_error(ctx, sink, conf, fs, None, request_path, err.into()).await;
            }
        }
    } else {
        None
    };

    if status == StatusCode::OK && !ctx.headers.contains_key(header::RANGE) {
        let mut headers = file_headers(conf, &file, request_path, etag.as_deref(), range);
        if is_not_modified(ctx.headers, &headers) {
            debug!("If-None-Match check resulted in Not Modified");
            headers.remove(header::CONTENT_LENGTH);
            sink.set_status(StatusCode::NOT_MODIFIED);
            sink.headers_mut().extend(headers);
            sink.end(None).await?;
            return Ok(());
        }
    }

    let stream = match fs.open(&file.absolute, byte_range, conf).await {
        Ok(stream) => stream,
        Err(err) => {
            error!("failed opening {:?}: {err}", file.absolute);
            return send_error(ctx, sink, conf, fs, None, request_path, err.into()).await;
        }
    };

    // Opening might have changed the configuration
    let headers = file_headers(conf, &file, request_path, etag.as_deref(), range);

    info!("serving {:?} with status {status}", file.absolute);
    sink.set_status(status);
    sink.headers_mut().extend(headers);
    if ctx.send_body {
        sink.pipe(stream).await?;
    } else {
        sink.end(None).await?;
    }
    Ok(())
}

/// Default headers of a file combined with the configured header rules and range information.
fn file_headers(
    conf: &ServeConf,
    file: &Found,
    request_path: &str,
    etag: Option<&str>,
    range: Option<Range>,
) -> HeaderMap {
    let size = file.stats.size;
    let defaults = default_headers(&file.absolute, request_path, &file.stats, etag);
    let mut headers = compose_headers(&conf.headers.headers, &file.relative, defaults);

    match range {
        Some(range @ Range::Valid(start, end)) => {
            if let Ok(value) = HeaderValue::try_from(format!("bytes {start}-{end}/{size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.byte_count()));
        }
        Some(Range::OutOfBounds) => {
            if let Ok(value) = HeaderValue::try_from(format!("bytes */{size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
        }
        None => {}
    }
    headers
}

/// Produces an error response. For "not found" errors the custom error page is used if `root` is
/// given and the client doesn’t prefer JSON.
async fn send_error<F, S>(
    ctx: &Context<'_>,
    sink: &mut S,
    conf: &mut ServeConf,
    fs: &F,
    root: Option<&Path>,
    request_path: &str,
    mut err: ServeError,
) -> Result<(), ServeError>
where
    F: FileSystem + ?Sized,
    S: ResponseSink + ?Sized,
{
    if let (ServeError::NotFound, Some(root), false) = (&err, root, ctx.accepts_json) {
        match custom_page(conf, fs, root).await {
            Ok(Some((path, stats, stream))) => {
                let defaults = default_headers(&path, NOT_FOUND_PAGE, &stats, None);
                let headers = compose_headers(&conf.headers.headers, NOT_FOUND_PAGE, defaults);

                debug!("sending custom error page {path:?}");
                sink.set_status(StatusCode::NOT_FOUND);
                sink.headers_mut().extend(headers);
                if ctx.send_body {
                    sink.pipe(stream).await?;
                } else {
                    sink.end(None).await?;
                }
                return Ok(());
            }
            Ok(None) => {}
            Err(custom_err) => {
                error!("failed accessing custom error page: {custom_err}");
                err = custom_err.into();
            }
        }
    }

    let headers = compose_headers(&conf.headers.headers, request_path, HeaderMap::new());
    sink.headers_mut().extend(headers);
    error_response(sink, err.page(), ctx.accepts_json, ctx.send_body).await?;
    Ok(())
}

/// Looks up and opens the custom 404 page. An error is only returned if retrieving the page’s
/// metadata fails with anything other than "not found". Failure to open the page is logged and
/// results in `None`.
async fn custom_page<F>(
    conf: &mut ServeConf,
    fs: &F,
    root: &Path,
) -> io::Result<Option<(PathBuf, Stats, ByteStream)>>
where
    F: FileSystem + ?Sized,
{
    let Ok(path) = resolve_path(root, NOT_FOUND_PAGE) else {
        return Ok(None);
    };

    let stats = match stat_entry(fs, root, &path, conf).await {
        Ok(stats) if stats.is_file() => stats,
        Ok(_) => return Ok(None),
        Err(err) if is_not_found(&err) => return Ok(None),
        Err(err) => return Err(err),
    };

    match fs.open(&path, None, conf).await {
        Ok(stream) => Ok(Some((path, stats, stream))),
        Err(err) => {
            warn!("failed opening custom error page {path:?}: {err}");
            Ok(None)
        }
    }
}
