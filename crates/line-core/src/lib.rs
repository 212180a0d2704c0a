//! Concurrency fabric for the production-line emulator: TCP listener
//! runtime, timed emitter, file-source replay, and the queue topology
//! that wires them into the serialization and refurbishment pipelines.

pub mod emitter;
pub mod file_source;
pub mod net;
pub mod pipeline;
pub mod printer;
pub mod queue;

pub use emitter::{Emitter, EmitterConfig};
pub use pipeline::{spawn_refurbishment, spawn_serialization, SerializationConfig};
pub use printer::PrinterListener;
pub use queue::{code_queue, CodeReceiver, CodeSender};
