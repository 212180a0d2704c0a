//! The shared code queues (serialization, verification, per-stream
//! aggregation, pallet) that connect a producer role to a consumer role.
//!
//! Each queue has exactly two tenants — one producer, one consumer — so an
//! unbounded MPSC channel is a direct, linearizable FIFO fit: `send`
//! enqueues at the tail, `try_recv`/`recv` dequeues at the head, and the
//! channel itself owns the internal synchronization.

use tokio::sync::mpsc;

/// Producer half of a code queue.
pub type CodeSender = mpsc::UnboundedSender<String>;
/// Consumer half of a code queue, owned solely by its emitter task.
pub type CodeReceiver = mpsc::UnboundedReceiver<String>;

/// Create a fresh, empty code queue.
pub fn code_queue() -> (CodeSender, CodeReceiver) {
    mpsc::unbounded_channel()
}
