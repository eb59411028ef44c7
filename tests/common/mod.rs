// tests/common/mod.rs

// A small autoindex server built on tiny_http. Every request is recorded so
// tests can assert which files were actually fetched.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tiny_http::{Header, Response, Server, StatusCode};

#[derive(Clone)]
enum Body {
    /// Sent with a `Content-Length` header.
    Sized(Vec<u8>),
    /// Sent chunked, so neither HEAD nor GET carries a length.
    Unsized(Vec<u8>),
    /// Announces `declared` bytes, sends `head`, then goes quiet for `stall`
    /// and drops the connection.
    Stalling {
        head: Vec<u8>,
        declared: usize,
        stall: Duration,
    },
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: Body,
    last_modified: Option<String>,
}

struct StallingReader {
    head: Cursor<Vec<u8>>,
    stall: Duration,
}

impl Read for StallingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.head.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        std::thread::sleep(self.stall);
        Err(io::Error::new(io::ErrorKind::Other, "stalled body"))
    }
}

fn build_response(route: Route) -> Response<Box<dyn Read + Send>> {
    let mut headers = Vec::new();
    if let Some(lm) = route.last_modified {
        headers.push(Header::from_bytes(&b"Last-Modified"[..], lm.as_bytes()).unwrap());
    }
    let (reader, length): (Box<dyn Read + Send>, Option<usize>) = match route.body {
        Body::Sized(data) => {
            let len = data.len();
            (Box::new(Cursor::new(data)), Some(len))
        }
        Body::Unsized(data) => (Box::new(Cursor::new(data)), None),
        Body::Stalling {
            head,
            declared,
            stall,
        } => (
            Box::new(StallingReader {
                head: Cursor::new(head),
                stall,
            }),
            Some(declared),
        ),
    };
    Response::new(StatusCode(route.status), headers, reader, length, None)
}

pub struct TestServer {
    pub base_url: String,
    server: Arc<Server>,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind test server"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<(String, String)>>> = Arc::default();

        let handle = {
            let (server, routes, requests) = (server.clone(), routes.clone(), requests.clone());
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    let path = request.url().to_string();
                    requests
                        .lock()
                        .unwrap()
                        .push((request.method().to_string(), path.clone()));

                    let route = routes.lock().unwrap().get(&path).cloned().unwrap_or(Route {
                        status: 404,
                        body: Body::Sized(b"not found".to_vec()),
                        last_modified: None,
                    });
                    let _ = request.respond(build_response(route));
                }
            })
        };

        TestServer {
            base_url: format!("http://{}", addr),
            server,
            routes,
            requests,
            handle: Some(handle),
        }
    }

    /// Serve an autoindex page for `dir` listing `files` as `(name, size cell)`.
    pub fn listing(&self, dir: &str, files: &[(&str, &str)]) {
        let mut html = String::from("<html><body><table id=\"list\"><tbody>\n");
        html.push_str(
            "<tr><td class=\"link\"><a href=\"../\">Parent directory/</a></td><td class=\"size\">-</td></tr>\n",
        );
        for (name, size) in files {
            html.push_str(&format!(
                "<tr><td class=\"link\"><a href=\"{}\" title=\"{}\">{}</a></td><td class=\"size\">{}</td></tr>\n",
                urlencoding::encode(name),
                name,
                name,
                size
            ));
        }
        html.push_str("</tbody></table></body></html>\n");
        self.route(&format!("/{}/", dir), 200, Body::Sized(html.into_bytes()), None);
    }

    pub fn file(&self, dir: &str, name: &str, body: &[u8], last_modified: Option<&str>) {
        self.route(&file_path(dir, name), 200, Body::Sized(body.to_vec()), last_modified);
    }

    /// A file served without any `Content-Length`.
    pub fn unsized_file(&self, dir: &str, name: &str, body: &[u8]) {
        self.route(&file_path(dir, name), 200, Body::Unsized(body.to_vec()), None);
    }

    /// A file whose body stops after `head` while `declared` bytes were promised.
    pub fn stalling_file(&self, dir: &str, name: &str, head: &[u8], declared: usize, stall: Duration) {
        let body = Body::Stalling {
            head: head.to_vec(),
            declared,
            stall,
        };
        self.route(&file_path(dir, name), 200, body, None);
    }

    pub fn url(&self, dir: &str, name: &str) -> String {
        format!("{}{}", self.base_url, file_path(dir, name))
    }

    fn route(&self, path: &str, status: u16, body: Body, last_modified: Option<&str>) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body,
                last_modified: last_modified.map(str::to_string),
            },
        );
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }
}

fn file_path(dir: &str, name: &str) -> String {
    format!("/{}/{}", dir, urlencoding::encode(name))
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
