//! The timed emitter: drains a shared code queue on a fixed cadence,
//! applies error/quality/drop fault injection, transmits to every
//! connected client, and optionally fans out originals round-robin into N
//! aggregation sub-queues.

use std::net::SocketAddr;
use std::time::Duration;

use dm_core::quality::{self, QualityTag};
use rand::rngs::ThreadRng;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::net::{bind, try_accept};
use crate::queue::{CodeReceiver, CodeSender};

const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Fault-injection and batching configuration for one emitter instance.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// The per-emission cadence (`T`): how long the emitter sleeps
    /// between draining successive codes off its queue.
    pub read_interval: Duration,
    /// Stack-pool size; transmissions batch exactly this many messages.
    pub stack: usize,
    pub gen_errors: bool,
    pub error_percent: u8,
    pub drop_dm_percent: u8,
    pub add_code_quality: bool,
    pub bad_codes_percent: u8,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        EmitterConfig {
            read_interval: Duration::from_millis(150),
            stack: 1,
            gen_errors: false,
            error_percent: 2,
            drop_dm_percent: 0,
            add_code_quality: false,
            bad_codes_percent: 0,
        }
    }
}

struct StackSlot {
    message: String,
    /// The original code, pre-quality-tag, if this slot has one (absent
    /// only on the `error` branch of error injection).
    original: Option<String>,
}

/// A camera-role (or verification-role) TCP listener: one shared queue in,
/// zero or more client sockets and aggregation sub-queues out.
pub struct Emitter {
    listener: TcpListener,
    role: &'static str,
    queue: CodeReceiver,
    config: EmitterConfig,
    clients: Vec<(TcpStream, SocketAddr)>,
    stack_pool: Vec<StackSlot>,
    fanout: Vec<CodeSender>,
    fanout_cursor: usize,
}

impl Emitter {
    pub async fn bind(
        port: u16,
        role: &'static str,
        queue: CodeReceiver,
        config: EmitterConfig,
        fanout: Vec<CodeSender>,
    ) -> std::io::Result<Self> {
        let listener = bind(port).await?;
        info!(role, port, "emitter listener bound");
        Ok(Emitter {
            listener,
            role,
            queue,
            config,
            clients: Vec::new(),
            stack_pool: Vec::new(),
            fanout,
            fanout_cursor: 0,
        })
    }

    /// Run the accept + emission loop. Never returns.
    pub async fn run(mut self) {
        let mut rng = rand::thread_rng();
        loop {
            if let Some((stream, addr)) = try_accept(&self.listener) {
                info!(role = self.role, %addr, "emitter client connected");
                self.clients.push((stream, addr));
            }

            if self.clients.is_empty() {
                sleep(IDLE_SLEEP).await;
                continue;
            }

            sleep(self.config.read_interval).await;

            if !self.emission_step(&mut rng).await {
                sleep(IDLE_SLEEP).await;
            }
        }
    }

    /// One DRAIN[-> TRANSMIT -> FANOUT] step. Returns `false` if the
    /// shared queue was empty (caller should idle-sleep and retry).
    async fn emission_step(&mut self, rng: &mut ThreadRng) -> bool {
        let code = match self.queue.try_recv() {
            Ok(code) => code,
            Err(_) => return false,
        };

        let slot = self.build_slot(code, rng);
        self.stack_pool.push(slot);

        if self.stack_pool.len() < self.config.stack.max(1) {
            return true;
        }

        let batch: Vec<StackSlot> = self.stack_pool.drain(..).collect();
        let frame = batch
            .iter()
            .map(|s| s.message.as_str())
            .collect::<Vec<_>>()
            .join("\n\r");

        let dropped = self.config.drop_dm_percent > 0
            && rng.gen_range(0..=100) <= self.config.drop_dm_percent;
        if dropped {
            info!(role = self.role, "DROPPED");
            return true;
        }

        self.transmit(&frame).await;
        self.fan_out(batch);
        true
    }

    fn build_slot(&self, code: String, rng: &mut ThreadRng) -> StackSlot {
        if self.config.gen_errors && rng.gen_range(0..=100) <= self.config.error_percent {
            if rng.gen_bool(0.5) {
                StackSlot {
                    message: "error".to_owned(),
                    original: None,
                }
            } else {
                StackSlot {
                    message: format!("{code}\n\r{code}"),
                    original: Some(code),
                }
            }
        } else {
            let mut message = code.clone();
            if self.config.add_code_quality {
                let tag = if rng.gen_range(0..=100) <= self.config.bad_codes_percent {
                    QualityTag::sample_bad(rng)
                } else {
                    QualityTag::sample_good(rng)
                };
                message = quality::tag(&message, tag);
            }
            StackSlot {
                message,
                original: Some(code),
            }
        }
    }

    async fn transmit(&mut self, frame: &str) {
        info!(role = self.role, queue_len = self.queue.len(), frame, "SENT");
        let mut payload = Vec::with_capacity(frame.len() + 2);
        payload.extend_from_slice(frame.as_bytes());
        payload.extend_from_slice(b"\n\r");

        let mut idx = 0;
        while idx < self.clients.len() {
            match self.clients[idx].0.write_all(&payload).await {
                Ok(()) => idx += 1,
                Err(e) => {
                    let (_, addr) = self.clients.remove(idx);
                    warn!(role = self.role, %addr, error = %e, "client send failed, removed");
                }
            }
        }
    }

    fn fan_out(&mut self, batch: Vec<StackSlot>) {
        if self.fanout.is_empty() {
            return;
        }
        for slot in batch {
            let Some(original) = slot.original else {
                continue;
            };
            let stripped = quality::strip(&original).to_owned();
            let n = self.fanout.len();
            let _ = self.fanout[self.fanout_cursor].send(stripped);
            self.fanout_cursor = (self.fanout_cursor + 1) % n;
        }
    }
}
