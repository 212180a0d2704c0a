//! Shared TCP accept helper for the printer-role and emitter-role engines.
//!
//! Both roles need the same thing on every service tick: "take a pending
//! connection if one exists, otherwise move on" — never block waiting for
//! a client to show up. `TcpListener::accept` is itself a future, so a
//! single non-blocking poll via `now_or_never` gives us exactly that
//! without hand-rolling the polling loop tokio already does internally.

use futures::FutureExt;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Bind to all interfaces on `port`. The platform default backlog (128 on
/// Linux) comfortably covers any device line's connection volume.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port)).await
}

/// Try to accept one pending connection without blocking. Returns `None`
/// immediately if none is pending.
pub fn try_accept(listener: &TcpListener) -> Option<(TcpStream, SocketAddr)> {
    listener.accept().now_or_never().and_then(Result::ok)
}
