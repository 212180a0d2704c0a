//! The printer-role TCP listener: accepts label-printer clients, extracts
//! DM codes from their command streams, and hands off at most one code
//! per client per service tick into the shared serialization/
//! verification/pallet queue.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use dm_core::parser::{self, ControlRequest};
use rand::rngs::ThreadRng;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::net::{bind, try_accept};
use crate::queue::CodeSender;

const SERVICE_TICK_IDLE: Duration = Duration::from_millis(1);

struct PrinterClient {
    stream: TcpStream,
    addr: SocketAddr,
    buffer: VecDeque<String>,
}

/// A printer-role listener: bind once, then run forever, servicing every
/// connected client each tick.
pub struct PrinterListener {
    listener: TcpListener,
    role: &'static str,
    out_queue: CodeSender,
    clients: Vec<PrinterClient>,
    print_counter: u64,
}

impl PrinterListener {
    pub async fn bind(port: u16, role: &'static str, out_queue: CodeSender) -> std::io::Result<Self> {
        let listener = bind(port).await?;
        info!(role, port, "printer listener bound");
        Ok(PrinterListener {
            listener,
            role,
            out_queue,
            clients: Vec::new(),
            // Starts at 1: `OUT @LABEL` reports the counter's value at
            // reply time, one ahead of the print count (5 successful
            // prints -> reply "6").
            print_counter: 1,
        })
    }

    /// Run the accept + service-tick loop. Never returns.
    pub async fn run(mut self) {
        let mut rng = rand::thread_rng();
        loop {
            self.accept_pending();
            self.service_all(&mut rng).await;
            sleep(SERVICE_TICK_IDLE).await;
        }
    }

    fn accept_pending(&mut self) {
        if let Some((stream, addr)) = try_accept(&self.listener) {
            info!(role = self.role, %addr, "printer client connected");
            self.clients.push(PrinterClient {
                stream,
                addr,
                buffer: VecDeque::new(),
            });
        }
    }

    async fn service_all(&mut self, rng: &mut ThreadRng) {
        let mut idx = 0;
        while idx < self.clients.len() {
            match self.service_client(idx, rng).await {
                true => idx += 1,
                false => {
                    let client = self.clients.remove(idx);
                    info!(role = self.role, addr = %client.addr, "printer client removed");
                }
            }
        }
    }

    /// Service one client's tick. Returns `false` if the client should be
    /// removed from the connection set.
    async fn service_client(&mut self, idx: usize, rng: &mut ThreadRng) -> bool {
        let payload = match Self::read_payload(&mut self.clients[idx].stream).await {
            ReadOutcome::Closed => return false,
            ReadOutcome::Error => return false,
            ReadOutcome::Empty => {
                // No data this tick; still drain at most one buffered code.
                self.drain_one(idx).await;
                return true;
            }
            ReadOutcome::Data(payload) => payload,
        };

        let trimmed = payload.trim();
        if let Some(control) = parser::match_control_request(trimmed) {
            if !self.reply_to_control(idx, control).await {
                return false;
            }
        } else if let Some(code) = parser::extract_code(trimmed, rng) {
            info!(role = self.role, code, "printed");
            self.clients[idx].buffer.push_back(code);
            self.print_counter += 1;
        } else {
            debug!(role = self.role, payload = trimmed, "unrecognized print payload");
        }

        self.drain_one(idx).await;
        true
    }

    /// Move at most one buffered code into the shared queue.
    async fn drain_one(&mut self, idx: usize) {
        if let Some(code) = self.clients[idx].buffer.pop_front() {
            let _ = self.out_queue.send(code);
        }
    }

    async fn reply_to_control(&mut self, idx: usize, control: ControlRequest) -> bool {
        let reply: Vec<u8> = match control.fixed_reply() {
            Some(bytes) => bytes.to_vec(),
            None => match control {
                ControlRequest::Counter => self.print_counter.to_string().into_bytes(),
                ControlRequest::BufferLength => {
                    self.clients[idx].buffer.len().to_string().into_bytes()
                }
                _ => unreachable!("fixed_reply covers EscQuery and Check"),
            },
        };
        match self.clients[idx].stream.write_all(&reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!(role = self.role, error = %e, "control reply send failed");
                false
            }
        }
    }

    /// Non-blocking chunked read of everything currently pending on the
    /// socket: reads are 4096-byte chunks; a short read ends the tick's
    /// receive; a zero-length read means the peer closed.
    async fn read_payload(stream: &mut TcpStream) -> ReadOutcome {
        let mut combined = Vec::new();
        loop {
            let mut buf = [0u8; parser::READ_CHUNK_SIZE];
            match stream.try_read(&mut buf) {
                Ok(0) => {
                    if combined.is_empty() {
                        return ReadOutcome::Closed;
                    }
                    break;
                }
                Ok(n) => {
                    combined.extend_from_slice(&buf[..n]);
                    if n < parser::READ_CHUNK_SIZE {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if combined.is_empty() {
                        return ReadOutcome::Empty;
                    }
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionAborted => {
                    // Peer aborted mid-read: silently skip this tick.
                    return ReadOutcome::Empty;
                }
                Err(_) => return ReadOutcome::Error,
            }
        }
        match String::from_utf8(combined) {
            Ok(s) => ReadOutcome::Data(s),
            Err(_) => ReadOutcome::Error,
        }
    }
}

enum ReadOutcome {
    Data(String),
    Empty,
    Closed,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::code_queue;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream as ClientStream;

    async fn connect(port: u16) -> ClientStream {
        ClientStream::connect(("127.0.0.1", port)).await.unwrap()
    }

    #[tokio::test]
    async fn barcode_print_is_enqueued() {
        let (tx, mut rx) = code_queue();
        let listener = PrinterListener::bind(0, "test", tx).await.unwrap();
        let port = listener.listener.local_addr().unwrap().port();
        let handle = tokio::spawn(listener.run());

        let mut client = connect(port).await;
        client.write_all(b"BARCODE=ABC123").await.unwrap();

        let code = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("should receive a code")
            .unwrap();
        assert_eq!(code, "ABC123");

        handle.abort();
    }

    #[tokio::test]
    async fn esc_query_replies_with_single_nul() {
        let (tx, _rx) = code_queue();
        let listener = PrinterListener::bind(0, "test", tx).await.unwrap();
        let port = listener.listener.local_addr().unwrap().port();
        let handle = tokio::spawn(listener.run());

        let mut client = connect(port).await;
        client.write_all(b"\x1b!?").await.unwrap();
        let mut buf = [0u8; 1];
        tokio::time::timeout(Duration::from_millis(500), client.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, [0u8]);

        handle.abort();
    }

    #[tokio::test]
    async fn check_replies_with_two_zero_bytes() {
        let (tx, _rx) = code_queue();
        let listener = PrinterListener::bind(0, "test", tx).await.unwrap();
        let port = listener.listener.local_addr().unwrap().port();
        let handle = tokio::spawn(listener.run());

        let mut client = connect(port).await;
        client.write_all(b"~S,CHECK").await.unwrap();
        let mut buf = [0u8; 2];
        tokio::time::timeout(Duration::from_millis(500), client.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"00");

        handle.abort();
    }

    #[tokio::test]
    async fn counter_reply_reflects_successful_prints() {
        let (tx, _rx) = code_queue();
        let listener = PrinterListener::bind(0, "test", tx).await.unwrap();
        let port = listener.listener.local_addr().unwrap().port();
        let handle = tokio::spawn(listener.run());

        let mut client = connect(port).await;
        for i in 0..5 {
            client
                .write_all(format!("BARCODE=CODE{i}").as_bytes())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        client.write_all(b"OUT @LABEL").await.unwrap();

        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_millis(500), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"6");

        handle.abort();
    }

    #[tokio::test]
    async fn unrecognized_payload_leaves_queue_untouched() {
        let (tx, mut rx) = code_queue();
        let listener = PrinterListener::bind(0, "test", tx).await.unwrap();
        let port = listener.listener.local_addr().unwrap().port();
        let handle = tokio::spawn(listener.run());

        let mut client = connect(port).await;
        client.write_all(b"not a recognized dialect").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(rx.try_recv().is_err());

        handle.abort();
    }
}
