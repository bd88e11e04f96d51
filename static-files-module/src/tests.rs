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

use crate::configuration::ServeConf;
use crate::fs::{FileSystem, LocalFileSystem, Stats};
use crate::handler::ServeHandler;

use async_trait::async_trait;
use headers_module::{HeaderPatch, HeaderRule};
use http::{Method, Request};
use serve_module_utils::standard_response::{html_error, ErrorPage, HTML_TYPE, JSON_TYPE};
use serve_module_utils::{ByteStream, FromYaml, TestResponse};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_log::test;

fn root_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push("root");
    if !filename.is_empty() {
        path.push(filename);
    }
    path
}

fn make_conf(conf_str: &str) -> ServeConf {
    let conf_str = if conf_str.is_empty() { "{}" } else { conf_str };
    let mut conf = ServeConf::from_yaml(conf_str).unwrap();
    conf.static_files.public_root = Some(root_path(""));
    conf
}

fn make_handler(conf_str: &str) -> ServeHandler {
    ServeHandler::new(make_conf(conf_str))
}

async fn request<F: FileSystem>(
    handler: &ServeHandler<F>,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::from_bytes(method.as_bytes()).unwrap())
        .uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(()).unwrap();

    let mut response = TestResponse::new();
    handler.handle((&request).into(), &mut response).await.unwrap();
    assert!(response.ended);
    response
}

async fn get<F: FileSystem>(handler: &ServeHandler<F>, path: &str) -> TestResponse {
    request(handler, "GET", path, &[]).await
}

fn assert_status(response: &TestResponse, expected: u16) {
    assert_eq!(response.status.as_u16(), expected);
}

fn assert_headers(response: &TestResponse, expected: Vec<(&str, &str)>) {
    let mut headers: Vec<_> = response
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_ascii_lowercase(),
                value.to_str().unwrap().to_owned(),
            )
        })
        .collect();
    headers.sort();

    let mut expected: Vec<_> = expected
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.to_owned()))
        .collect();
    expected.sort();

    assert_eq!(headers, expected);
}

fn assert_body(response: &TestResponse, expected: &str) {
    assert_eq!(response.body_str(), expected);
}

fn assert_redirect(response: &TestResponse, status: u16, location: &str) {
    assert_status(response, status);
    assert_headers(response, vec![("location", location)]);
    assert_body(response, "");
}

fn last_modified(filename: &str) -> String {
    let modified = std::fs::metadata(root_path(filename))
        .unwrap()
        .modified()
        .unwrap();
    httpdate::fmt_http_date(modified)
}

fn file_contents(filename: &str) -> String {
    std::fs::read_to_string(root_path(filename)).unwrap()
}

fn json_body(response: &TestResponse) -> serde_json::Value {
    assert_eq!(response.header_str("content-type"), Some(JSON_TYPE));
    serde_json::from_str(&response.body_str()).unwrap()
}

/// Wraps local file system access, failing operations on a particular file name.
#[derive(Debug)]
struct FailingFs {
    file_name: &'static str,
}

impl FailingFs {
    fn check(&self, path: &Path) -> io::Result<()> {
        if path.ends_with(self.file_name) {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access denied",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FileSystem for FailingFs {
    async fn lstat(&self, path: &Path, listing: bool, conf: &mut ServeConf) -> io::Result<Stats> {
        self.check(path)?;
        LocalFileSystem.lstat(path, listing, conf).await
    }

    async fn open(
        &self,
        path: &Path,
        range: Option<(u64, u64)>,
        conf: &mut ServeConf,
    ) -> io::Result<ByteStream> {
        if path.ends_with(self.file_name) {
            return Err(io::Error::new(io::ErrorKind::Other, "read failure"));
        }
        LocalFileSystem.open(path, range, conf).await
    }
}

/// Counts file system operations.
#[derive(Debug, Default)]
struct RecordingFs {
    calls: Arc<AtomicUsize>,
}

impl RecordingFs {
    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileSystem for RecordingFs {
    async fn stat(&self, path: &Path, conf: &mut ServeConf) -> io::Result<Stats> {
        self.record();
        LocalFileSystem.stat(path, conf).await
    }

    async fn lstat(&self, path: &Path, listing: bool, conf: &mut ServeConf) -> io::Result<Stats> {
        self.record();
        LocalFileSystem.lstat(path, listing, conf).await
    }

    async fn readdir(&self, path: &Path, conf: &mut ServeConf) -> io::Result<Vec<String>> {
        self.record();
        LocalFileSystem.readdir(path, conf).await
    }

    async fn open(
        &self,
        path: &Path,
        range: Option<(u64, u64)>,
        conf: &mut ServeConf,
    ) -> io::Result<ByteStream> {
        self.record();
        LocalFileSystem.open(path, range, conf).await
    }
}

/// Adds a header rule to the request configuration whenever a file is opened.
#[derive(Debug)]
struct MutatingFs;

#[async_trait]
impl FileSystem for MutatingFs {
    async fn open(
        &self,
        path: &Path,
        range: Option<(u64, u64)>,
        conf: &mut ServeConf,
    ) -> io::Result<ByteStream> {
        conf.headers.headers.push(
            HeaderRule::new(
                "**",
                vec![HeaderPatch::new("X-Opened", Some("yes")).unwrap()],
            )
            .unwrap(),
        );
        LocalFileSystem.open(path, range, conf).await
    }
}

#[test(tokio::test)]
async fn text_file() {
    let handler = make_handler("");

    let response = get(&handler, "/file.txt").await;
    assert_status(&response, 200);
    assert_headers(
        &response,
        vec![
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Length", "4"),
            ("Content-Disposition", "inline; filename=\"file.txt\""),
            ("Accept-Ranges", "bytes"),
            ("Last-Modified", &last_modified("file.txt")),
        ],
    );
    assert_body(&response, "Hi!\n");

    let response = get(&handler, "/object.json").await;
    assert_status(&response, 200);
    assert_eq!(
        response.header_str("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert_body(&response, &file_contents("object.json"));
}

#[test(tokio::test)]
async fn head_request() {
    let handler = make_handler("");

    let response = request(&handler, "HEAD", "/file.txt", &[]).await;
    assert_status(&response, 200);
    assert_eq!(response.header_str("content-length"), Some("4"));
    assert_body(&response, "");

    let response = request(&handler, "HEAD", "/missing", &[("Accept", "application/json")]).await;
    assert_status(&response, 404);
    assert_eq!(response.header_str("content-type"), Some(JSON_TYPE));
    assert_body(&response, "");
}

#[test(tokio::test)]
async fn trailing_slash() {
    let handler = make_handler("trailingSlash: true");
    assert_redirect(&get(&handler, "/test").await, 301, "/test/");
    assert_redirect(&get(&handler, "/a//b").await, 301, "/a/b/");

    // Files are left alone
    assert_status(&get(&handler, "/file.txt").await, 200);

    let handler = make_handler("trailingSlash: false");
    assert_redirect(&get(&handler, "/test/").await, 301, "/test");
    assert_redirect(&get(&handler, "//evil.com/").await, 301, "/evil.com");

    // The redirect target doesn't redirect again
    assert_status(&get(&handler, "/special-directory").await, 200);
}

#[test(tokio::test)]
async fn rewrites() {
    let handler = make_handler(
        r#"
        rewrites:
        - source: face/**
          destination: .dotfile
        "#,
    );

    let response = get(&handler, "/face/delete").await;
    assert_status(&response, 200);
    assert_eq!(
        response.header_str("content-type"),
        Some("application/octet-stream")
    );
    assert_body(&response, &file_contents(".dotfile"));
}

#[test(tokio::test)]
async fn rewrite_chain() {
    let handler = make_handler(
        r#"
        rewrites:
        - source: /first
          destination: /second
        - source: /second
          destination: /file.txt
        - source: /loop-a
          destination: /loop-b
        - source: /loop-b
          destination: /loop-a
        "#,
    );

    let response = get(&handler, "/first").await;
    assert_status(&response, 200);
    assert_body(&response, "Hi!\n");

    // Cyclic rules terminate
    assert_status(&get(&handler, "/loop-a").await, 404);
}

#[test(tokio::test)]
async fn redirects() {
    let handler = make_handler(
        r#"
        redirects:
        - source: face/:segment
          destination: mask/:segment
        - source: /old
          destination: https://example.com/new
          statusCode: 302
        - source: /encoded
          destination: /a b
        - source: /raw
          destination: /a%20b
          raw: true
        "#,
    );

    assert_redirect(&get(&handler, "/face/me").await, 301, "/mask/me");
    assert_redirect(&get(&handler, "/old").await, 302, "https://example.com/new");
    assert_redirect(&get(&handler, "/encoded").await, 301, "/a%20b");
    assert_redirect(&get(&handler, "/raw").await, 301, "/a%20b");
    assert_status(&get(&handler, "/face/me/too").await, 404);
}

#[test(tokio::test)]
async fn clean_urls() {
    let handler = make_handler("cleanUrls: true");

    let response = get(&handler, "/directory").await;
    assert_status(&response, 200);
    assert_body(&response, &file_contents("directory/index.html"));

    assert_redirect(
        &get(&handler, "/directory/clean-file.html").await,
        301,
        "/directory/clean-file",
    );
    assert_redirect(&get(&handler, "/directory/index").await, 301, "/directory");
    assert_redirect(&get(&handler, "/index.html").await, 301, "/index");
    assert_redirect(&get(&handler, "/index").await, 301, "/");

    let response = get(&handler, "/directory/clean-file").await;
    assert_status(&response, 200);
    assert_eq!(
        response.header_str("content-type"),
        Some("text/html; charset=utf-8")
    );
    assert_body(&response, &file_contents("directory/clean-file.html"));

    let response = get(&handler, "/legacy").await;
    assert_status(&response, 200);
    assert_body(&response, &file_contents("legacy.htm"));
}

#[test(tokio::test)]
async fn clean_urls_precedence() {
    // Clean URL redirect wins over explicit rules
    let handler = make_handler(
        r#"
        redirects:
        - source: /page.html
          destination: /elsewhere
        "#,
    );
    assert_redirect(&get(&handler, "/page.html").await, 301, "/page");

    let handler = make_handler(
        r#"
        cleanUrls: false
        redirects:
        - source: /page.html
          destination: /elsewhere
        "#,
    );
    assert_redirect(&get(&handler, "/page.html").await, 301, "/elsewhere");
}

#[test(tokio::test)]
async fn clean_urls_disabled() {
    let handler = make_handler("cleanUrls: false");

    let response = get(&handler, "/clean-file.html").await;
    assert_status(&response, 200);
    assert_body(&response, &file_contents("clean-file.html"));

    assert_status(&get(&handler, "/clean-file").await, 404);

    // Directory with an index file is listed
    let response = request(&handler, "GET", "/directory", &[("Accept", "application/json")]).await;
    assert_status(&response, 200);
    let json = json_body(&response);
    assert_eq!(json["files"][0]["base"], "..");
    assert_eq!(json["files"][1]["base"], "clean-file.html");
    assert_eq!(json["files"][2]["base"], "index.html");

    let handler = make_handler("cleanUrls: ['/directory/**']");
    assert_status(&get(&handler, "/clean-file").await, 404);
    assert_status(&get(&handler, "/directory/clean-file").await, 200);
}

#[test(tokio::test)]
async fn not_found() {
    let mut conf = make_conf("");
    conf.static_files.public_root = Some(root_path("special-directory"));
    let handler = ServeHandler::new(conf);

    let response = request(&handler, "GET", "/not-existing", &[("Accept", "application/json")]).await;
    assert_status(&response, 404);
    assert_eq!(
        json_body(&response),
        serde_json::json!({
            "error": {
                "code": "not_found",
                "message": "The requested path could not be found",
            }
        })
    );

    let response = get(&handler, "/not-existing").await;
    let text = html_error(&ErrorPage::NOT_FOUND);
    assert_status(&response, 404);
    assert_headers(
        &response,
        vec![
            ("Content-Type", HTML_TYPE),
            ("Content-Length", &text.len().to_string()),
        ],
    );
    assert_body(&response, &text);
}

#[test(tokio::test)]
async fn custom_not_found_page() {
    let handler = make_handler(
        r#"
        headers:
        - source: /404.html
          headers:
          - key: Cache-Control
            value: no-cache
        "#,
    );

    let response = get(&handler, "/not-existing").await;
    assert_status(&response, 404);
    assert_eq!(
        response.header_str("content-type"),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(response.header_str("cache-control"), Some("no-cache"));
    assert!(response.body_str().contains("<span>Not Found</span>"));

    // JSON clients get the JSON error
    let response = request(&handler, "GET", "/not-existing", &[("Accept", "application/json")]).await;
    assert_status(&response, 404);
    assert_eq!(json_body(&response)["error"]["code"], "not_found");
}

#[test(tokio::test)]
async fn custom_not_found_page_failures() {
    // With symbolic links followed `lstat` isn't used, only opening the page fails. This falls
    // back to the default page.
    let handler = ServeHandler::with_file_system(
        make_conf("symlinks: true"),
        FailingFs {
            file_name: "404.html",
        },
    );
    let response = get(&handler, "/missing").await;
    assert_status(&response, 404);
    assert_body(&response, &html_error(&ErrorPage::NOT_FOUND));

    // Metadata failure escalates
    let handler = ServeHandler::with_file_system(
        make_conf(""),
        FailingFs {
            file_name: "404.html",
        },
    );
    let response = get(&handler, "/missing").await;
    assert_status(&response, 500);
    assert_body(&response, &html_error(&ErrorPage::INTERNAL_SERVER_ERROR));
}

#[test(tokio::test)]
async fn upstream_errors() {
    let handler = ServeHandler::with_file_system(
        make_conf(""),
        FailingFs {
            file_name: "docs.md",
        },
    );

    let response = request(&handler, "GET", "/docs.md", &[("Accept", "application/json")]).await;
    assert_status(&response, 500);
    assert_eq!(
        json_body(&response),
        serde_json::json!({
            "error": {
                "code": "internal_server_error",
                "message": "A server error has occurred",
            }
        })
    );

    // Failure while listing a directory
    let response = request(&handler, "GET", "/", &[("Accept", "application/json")]).await;
    assert_status(&response, 500);

    // Failure while opening
    let handler = ServeHandler::with_file_system(
        make_conf("symlinks: true"),
        FailingFs {
            file_name: "docs.md",
        },
    );
    let response = get(&handler, "/docs.md").await;
    assert_status(&response, 500);
}

#[test(tokio::test)]
async fn malformed_paths() {
    let fs = RecordingFs::default();
    let calls = fs.calls.clone();
    let handler = ServeHandler::with_file_system(make_conf(""), fs);

    for path in [
        "/../etc/passwd",
        "/%2e%2e/%2e%2e/etc/passwd",
        "/directory/../../file.txt",
        "/%E0%A4%A",
        "/%zz",
    ] {
        let response = request(&handler, "GET", path, &[("Accept", "application/json")]).await;
        assert_status(&response, 400);
        assert_eq!(json_body(&response)["error"]["code"], "bad_request");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Leaving and re-entering the root is fine
    let response = get(&handler, "/directory/../file.txt").await;
    assert_status(&response, 200);
    assert!(calls.load(Ordering::SeqCst) > 0);
}

#[test(tokio::test)]
async fn directory_listing() {
    let handler = make_handler("");

    let response = request(
        &handler,
        "GET",
        "/special-directory/",
        &[("Accept", "application/json")],
    )
    .await;
    assert_status(&response, 200);
    let json = json_body(&response);
    assert_eq!(
        json,
        serde_json::json!({
            "files": [
                {
                    "base": "..",
                    "relative": "/",
                    "title": "/",
                    "is-directory": true,
                },
                {
                    "base": "nested/",
                    "relative": "/special-directory/nested/",
                    "title": "nested/",
                    "is-directory": true,
                },
                {
                    "base": "data.json",
                    "relative": "/special-directory/data.json",
                    "title": "data.json",
                    "ext": "json",
                    "size": "3 B",
                },
                {
                    "base": "notes.txt",
                    "relative": "/special-directory/notes.txt",
                    "title": "notes.txt",
                    "ext": "txt",
                    "size": "6 B",
                },
            ],
            "directory": "root/special-directory/",
            "paths": [
                {
                    "name": "root/",
                    "url": "",
                },
                {
                    "name": "special-directory/",
                    "url": "special-directory/",
                },
            ],
        })
    );

    let response = get(&handler, "/special-directory/").await;
    assert_status(&response, 200);
    assert_eq!(response.header_str("content-type"), Some(HTML_TYPE));
    assert_eq!(
        response.header_str("content-length"),
        Some(response.body.len().to_string().as_str())
    );
    let html = response.body_str();
    for file in json["files"].as_array().unwrap() {
        let relative = file["relative"].as_str().unwrap();
        assert!(html.contains(&format!("href=\"{relative}\"")));
    }

    // Fixed exclusions
    let response = request(&handler, "GET", "/", &[("Accept", "application/json")]).await;
    assert_status(&response, 200);
    let json = json_body(&response);
    let names = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|file| file["base"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert!(!names.contains(&".DS_Store"));
    assert!(!names.contains(&".."));
    assert!(names.contains(&"404.html"));
}

#[test(tokio::test)]
async fn directory_listing_disabled() {
    let handler = make_handler("directoryListing: false");

    let response = get(&handler, "/special-directory/").await;
    assert_status(&response, 404);
    assert!(response.body_str().contains("<span>Not Found</span>"));

    // Index files are still served
    assert_status(&get(&handler, "/directory").await, 200);

    let handler = make_handler("directoryListing: ['/special-directory/**']");
    assert_status(&get(&handler, "/special-directory/nested/").await, 200);
    assert_status(&get(&handler, "/single-directory/").await, 404);
}

#[test(tokio::test)]
async fn render_single() {
    let handler = make_handler("renderSingle: true");

    let response = get(&handler, "/single-directory").await;
    assert_status(&response, 200);
    assert_eq!(
        response.header_str("content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert_body(&response, "single\n");

    // Not with listing disabled
    let handler = make_handler("renderSingle: true\ndirectoryListing: false");
    assert_status(&get(&handler, "/single-directory").await, 404);
}

#[test(tokio::test)]
async fn ranges() {
    let handler = make_handler("");

    let response = request(&handler, "GET", "/docs.md", &[("Range", "bytes=2-5")]).await;
    assert_status(&response, 206);
    assert_eq!(response.header_str("content-range"), Some("bytes 2-5/16"));
    assert_eq!(response.header_str("content-length"), Some("4"));
    assert_body(&response, "Docu");

    let response = request(&handler, "GET", "/docs.md", &[("Range", "bytes=-4")]).await;
    assert_status(&response, 206);
    assert_eq!(response.header_str("content-range"), Some("bytes 12-15/16"));
    assert_body(&response, "ion\n");

    let response = request(&handler, "GET", "/docs.md", &[("Range", "bytes=100-200")]).await;
    assert_status(&response, 416);
    assert_eq!(response.header_str("content-range"), Some("bytes */16"));
    assert_eq!(response.header_str("content-length"), Some("16"));
    assert_body(&response, "# Documentation\n");

    let response = request(&handler, "GET", "/docs.md", &[("Range", "bytes=5-2")]).await;
    assert_status(&response, 416);

    // Multiple ranges are ignored
    let response = request(&handler, "GET", "/docs.md", &[("Range", "bytes=0-1,4-5")]).await;
    assert_status(&response, 200);
    assert_body(&response, "# Documentation\n");
}

#[test(tokio::test)]
async fn etag() {
    let handler = make_handler("etag: true");

    let response = get(&handler, "/file.txt").await;
    assert_status(&response, 200);
    let etag = response.header_str("etag").unwrap().to_owned();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert!(response.header_str("last-modified").is_some());

    let response = request(&handler, "GET", "/file.txt", &[("If-None-Match", &etag)]).await;
    assert_status(&response, 304);
    assert_eq!(response.header_str("etag"), Some(etag.as_str()));
    assert_body(&response, "");

    let list = format!("\"other\", {etag}");
    let response = request(&handler, "GET", "/file.txt", &[("If-None-Match", &list)]).await;
    assert_status(&response, 304);

    let response = request(&handler, "GET", "/file.txt", &[("If-None-Match", "\"other\"")]).await;
    assert_status(&response, 200);
    assert_body(&response, "Hi!\n");

    // Range requests aren't answered with 304
    let response = request(
        &handler,
        "GET",
        "/file.txt",
        &[("If-None-Match", &etag), ("Range", "bytes=0-1")],
    )
    .await;
    assert_status(&response, 206);
    assert_body(&response, "Hi");

    // The file isn't opened for the body if the response is 304
    let fs = RecordingFs::default();
    let calls = fs.calls.clone();
    let handler = ServeHandler::with_file_system(make_conf("etag: true"), fs);
    let response = get(&handler, "/file.txt").await;
    assert_status(&response, 200);
    let full = calls.swap(0, Ordering::SeqCst);
    let response = request(&handler, "GET", "/file.txt", &[("If-None-Match", &etag)]).await;
    assert_status(&response, 304);
    assert_eq!(calls.load(Ordering::SeqCst), full - 1);

    // Disabled by default
    let handler = make_handler("");
    let response = request(&handler, "GET", "/file.txt", &[("If-None-Match", "*")]).await;
    assert_status(&response, 200);
    assert!(response.header_str("etag").is_none());
}

#[test(tokio::test)]
async fn custom_headers() {
    let handler = make_handler(
        r#"
        etag: true
        headers:
        - source: "**/*.md"
          headers:
          - key: X-Markdown
            value: "yes"
          - key: Content-Disposition
            value: null
        - source: "*.md"
          headers:
          - key: X-Markdown
            value: "overridden"
          - key: ETag
            value: '"custom"'
        - source: "*.txt"
          headers:
          - key: X-Text
            value: 1
        "#,
    );

    let response = get(&handler, "/docs.md").await;
    assert_status(&response, 200);
    assert_eq!(response.header_str("x-markdown"), Some("overridden"));
    assert_eq!(response.header_str("etag"), Some("\"custom\""));
    assert!(response.header_str("content-disposition").is_none());
    assert!(response.header_str("x-text").is_none());

    let response = request(&handler, "GET", "/docs.md", &[("If-None-Match", "\"custom\"")]).await;
    assert_status(&response, 304);

    let response = get(&handler, "/file.txt").await;
    assert_eq!(response.header_str("x-text"), Some("1"));
    assert!(response.header_str("x-markdown").is_none());

    // Rules apply to error responses as well
    let response = request(&handler, "GET", "/missing.md", &[("Accept", "application/json")]).await;
    assert_status(&response, 404);
    assert_eq!(response.header_str("x-markdown"), Some("overridden"));
}

#[test(tokio::test)]
async fn configuration_mutation() {
    let handler = ServeHandler::with_file_system(make_conf(""), MutatingFs);

    let response = get(&handler, "/file.txt").await;
    assert_status(&response, 200);
    assert_eq!(response.header_str("x-opened"), Some("yes"));

    // Changes are limited to the request
    assert!(handler.conf().headers.headers.is_empty());
    let response = get(&handler, "/file.txt").await;
    assert_eq!(response.header_str("x-opened"), Some("yes"));
}

#[test(tokio::test)]
async fn fixed_exclusions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git").join("HEAD"), "ref: refs/heads/main\n").unwrap();
    std::fs::write(dir.path().join(".DS_Store"), "x").unwrap();
    std::fs::write(dir.path().join("page.txt"), "page").unwrap();

    let mut conf = ServeConf::default();
    conf.static_files.public_root = Some(dir.path().to_path_buf());
    let handler = ServeHandler::new(conf);

    let response = request(&handler, "GET", "/", &[("Accept", "application/json")]).await;
    assert_status(&response, 200);
    let json = json_body(&response);
    let names = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|file| file["base"].as_str().unwrap().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["page.txt"]);

    let response = get(&handler, "/").await;
    assert_status(&response, 200);
    let html = response.body_str();
    assert!(html.contains("page.txt"));
    assert!(!html.contains(".git"));
    assert!(!html.contains(".DS_Store"));
}

#[cfg(unix)]
#[test(tokio::test)]
async fn symlinks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("target.txt"), "target").unwrap();
    std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
        .unwrap();

    let mut conf = ServeConf::default();
    conf.static_files.public_root = Some(dir.path().to_path_buf());
    let handler = ServeHandler::new(conf.clone());

    assert_status(&get(&handler, "/link.txt").await, 404);
    assert_status(&get(&handler, "/target.txt").await, 200);

    // Links aren't listed
    let response = request(&handler, "GET", "/", &[("Accept", "application/json")]).await;
    let json = json_body(&response);
    assert_eq!(json["files"].as_array().unwrap().len(), 1);
    assert_eq!(json["files"][0]["base"], "target.txt");

    conf.static_files.symlinks = true;
    let handler = ServeHandler::new(conf);
    let response = get(&handler, "/link.txt").await;
    assert_status(&response, 200);
    assert_body(&response, "target");

    let response = request(&handler, "GET", "/", &[("Accept", "application/json")]).await;
    let json = json_body(&response);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
}

#[cfg(unix)]
#[test(tokio::test)]
async fn symlinked_directories() {
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();

    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("linkdir")).unwrap();

    let mut conf = ServeConf::default();
    conf.static_files.public_root = Some(dir.path().to_path_buf());
    let handler = ServeHandler::new(conf.clone());

    assert_status(&get(&handler, "/linkdir").await, 404);
    assert_status(&get(&handler, "/linkdir/").await, 404);
    assert_status(&get(&handler, "/linkdir/secret.txt").await, 404);

    conf.static_files.symlinks = true;
    let handler = ServeHandler::new(conf);
    let response = get(&handler, "/linkdir/secret.txt").await;
    assert_status(&response, 200);
    assert_body(&response, "secret");
}
