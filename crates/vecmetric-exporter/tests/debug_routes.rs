//! Debug routes on the shared mux, served by a running exporter.

#![cfg(feature = "pprof")]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use vecmetric_core::Registry;
use vecmetric_exporter::debug::{register_debug_routes, register_pprof, PROFILE_PATH};
use vecmetric_exporter::{Exporter, ExporterOptions, Mux};

/// Status line, header block and raw body of a `Connection: close` GET.
async fn http_get(addr: SocketAddr, path: &str) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).to_ascii_lowercase();
    let body = raw[split + 4..].to_vec();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status line");
    (status, head, body)
}

fn local_opts(share: bool) -> ExporterOptions {
    ExporterOptions::new("/metric", 0, share).bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[test]
fn register_debug_routes_is_repeatable() {
    let mux = Mux::new();
    register_debug_routes(&mux).unwrap();
    register_debug_routes(&mux).unwrap();
    assert_eq!(mux.paths(), vec![PROFILE_PATH.to_string()]);

    let err = register_pprof(&mux).unwrap_err();
    assert_eq!(err.kind().as_str(), "HANDLER_BUILD_FAILURE");
}

#[tokio::test]
async fn shared_mux_serves_cpu_profile() {
    let debug = Mux::new();
    register_pprof(&debug).unwrap();

    let exporter = Exporter::new(Registry::new()).with_debug_mux(debug.clone());
    let mut handle = exporter.start(local_opts(true)).unwrap();
    let addr = handle.listening().await.unwrap();

    let (status, head, _) = http_get(addr, "/debug/pprof/profile?seconds=1&frequency=99").await;
    assert_eq!(status, 200);
    assert!(head.contains("content-type: application/protobuf"), "{head}");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn profile_rejects_out_of_range_params() {
    let debug = Mux::new();
    register_pprof(&debug).unwrap();

    let exporter = Exporter::new(Registry::new()).with_debug_mux(debug);
    let mut handle = exporter.start(local_opts(true)).unwrap();
    let addr = handle.listening().await.unwrap();

    for query in ["seconds=0", "seconds=301", "frequency=0", "seconds=abc"] {
        let (status, _, _) = http_get(addr, &format!("{PROFILE_PATH}?{query}")).await;
        assert_eq!(status, 400, "{query}");
    }

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn private_mux_does_not_serve_profile() {
    let debug = Mux::new();
    register_pprof(&debug).unwrap();

    let exporter = Exporter::new(Registry::new()).with_debug_mux(debug);
    let mut handle = exporter.start(local_opts(false)).unwrap();
    let addr = handle.listening().await.unwrap();

    let (status, _, _) = http_get(addr, "/debug/pprof/profile?seconds=1").await;
    assert_eq!(status, 404);

    handle.stop().await.unwrap();
}
