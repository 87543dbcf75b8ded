use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;

use lol_match_analyzer::analyze_fetch::fetch_analysis;
use lol_match_analyzer::error::AnalyzeError;
use lol_match_analyzer::state::AnalyzeRequest;

const TIMEOUT_SECS: u64 = 5;

fn read_fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn request() -> AnalyzeRequest {
    AnalyzeRequest {
        id: 1,
        name: "Faker".to_string(),
        tag: "KR1".to_string(),
    }
}

/// Answers a single request with a canned response; the join handle yields the raw request.
fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind should work");
    let addr = listener.local_addr().expect("bound socket has an address");
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("client should connect");
        let raw = read_request(&mut stream);
        stream
            .write_all(response.as_bytes())
            .expect("response should be writable");
        raw
    });
    (format!("http://{addr}"), handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).expect("request should be readable");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn success_body_is_normalized() {
    let (base, server) = serve_once("200 OK", &read_fixture("analyze_response.json"));
    let payload = fetch_analysis(&base, TIMEOUT_SECS, &request()).expect("fixture is valid");
    assert_eq!(payload.matches.len(), 3);
    assert_eq!(payload.predictions.len(), 2);

    let raw = server.join().expect("server thread should finish");
    assert!(raw.starts_with("POST /api/analyze-matches "));
    assert!(raw.contains(r#""name":"Faker""#));
    assert!(raw.contains(r#""tag":"KR1""#));
}

#[test]
fn not_found_carries_backend_message() {
    let (base, server) = serve_once("404 Not Found", &read_fixture("analyze_error.json"));
    let err = fetch_analysis(&base, TIMEOUT_SECS, &request()).expect_err("404 must fail");
    assert_eq!(
        err,
        AnalyzeError::Backend {
            status: 404,
            message: Some("Summoner not found".to_string()),
        }
    );
    assert_eq!(err.user_message(), "Summoner not found");
    server.join().expect("server thread should finish");
}

#[test]
fn server_error_without_json_body_has_no_message() {
    let (base, server) = serve_once("500 Internal Server Error", "<html>boom</html>");
    let err = fetch_analysis(&base, TIMEOUT_SECS, &request()).expect_err("500 must fail");
    assert_eq!(
        err,
        AnalyzeError::Backend {
            status: 500,
            message: None,
        }
    );
    assert_eq!(err.user_message(), "Request failed with status code 500");
    server.join().expect("server thread should finish");
}

#[test]
fn undecodable_success_body_is_malformed() {
    let (base, server) = serve_once("200 OK", "not json at all");
    let err = fetch_analysis(&base, TIMEOUT_SECS, &request()).expect_err("garbage must fail");
    assert!(matches!(err, AnalyzeError::Malformed(_)));
    server.join().expect("server thread should finish");
}

#[test]
fn refused_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind should work");
    let addr = listener.local_addr().expect("bound socket has an address");
    drop(listener);

    let err = fetch_analysis(&format!("http://{addr}"), TIMEOUT_SECS, &request())
        .expect_err("nothing is listening");
    assert!(matches!(err, AnalyzeError::Transport(ref msg) if !msg.is_empty()));
}
