//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/fast`: 200 with body `fast`
//! - `/delay/<ms>`: sleeps `ms`, then 200 with body `delayed <ms>`
//! - `/hang`: reads the request and never answers
//! - `/status/<code>`: responds with `code`
//! - `/redirect`: 302 to `/fast`
//! - `/echo-header/<name>`: body is the value of request header `name`

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Starts the server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = match read_head(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let (method, path, headers) = parse_request(&request);

    if path == "/hang" {
        thread::sleep(Duration::from_secs(10));
        return;
    }

    let (status, extra, body) = if path == "/fast" {
        ("200 OK".to_string(), String::new(), "fast".to_string())
    } else if let Some(ms) = path.strip_prefix("/delay/") {
        let ms: u64 = ms.parse().unwrap_or(0);
        thread::sleep(Duration::from_millis(ms));
        ("200 OK".to_string(), String::new(), format!("delayed {}", ms))
    } else if let Some(code) = path.strip_prefix("/status/") {
        (format!("{} Status", code), String::new(), format!("status {}", code))
    } else if path == "/redirect" {
        (
            "302 Found".to_string(),
            "Location: /fast\r\n".to_string(),
            String::new(),
        )
    } else if let Some(name) = path.strip_prefix("/echo-header/") {
        let value = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        ("200 OK".to_string(), String::new(), value)
    } else {
        ("404 Not Found".to_string(), String::new(), "not found".to_string())
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra
    );
    let _ = stream.write_all(response.as_bytes());
    if !method.eq_ignore_ascii_case("HEAD") {
        let _ = stream.write_all(body.as_bytes());
    }
    let _ = stream.flush();
}

/// Reads until the end of the request head.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 64 * 1024 {
            break;
        }
    }
    String::from_utf8(buf).ok()
}

/// Returns (method, path, headers).
fn parse_request(request: &str) -> (String, String, Vec<(String, String)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_string();
    let path = first.next().unwrap_or("/").to_string();
    let headers = lines
        .map(str::trim)
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    (method, path, headers)
}
