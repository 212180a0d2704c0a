//! Queue topology wiring: assembles listeners, emitters, and the queues
//! that connect them into the two supported end-to-end shapes and spawns
//! each as an independent task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::error;

use crate::emitter::{Emitter, EmitterConfig};
use crate::file_source;
use crate::printer::PrinterListener;
use crate::queue::code_queue;

/// Default port mapping for every role in the line.
pub const DM_CAMERA_PORT: u16 = 23;
pub const VERIFICATION_CAMERA_PORT: u16 = 32;
pub const AGGREGATION_VERIFICATION_PRINTER_PORT: u16 = 9102;
pub const LEVEL_0_PALLET_PRINTER_PORT: u16 = 9102;
pub const LEVEL_1_PALLET_PRINTER_PORT: u16 = 9103;
pub const LEVEL_2_PALLET_PRINTER_PORT: u16 = 9104;
pub const LEVEL_3_PALLET_PRINTER_PORT: u16 = 9105;
const AGGREGATION_CAMERA_BASE_PORT: u16 = 27;

/// Everything the `s` (serialization) CLI subcommand needs to assemble
/// the full topology.
#[derive(Debug, Clone)]
pub struct SerializationConfig {
    pub printer_port: u16,
    pub dm_file_source: bool,
    pub aggregation_count: u8,
    pub gen_errors: bool,
    pub error_percent: u8,
    pub drop_dm_percent: u8,
    pub read_interval: Duration,
    pub add_code_quality: bool,
    pub bad_codes_percent: u8,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        SerializationConfig {
            printer_port: 9101,
            dm_file_source: false,
            aggregation_count: 3,
            gen_errors: false,
            error_percent: 2,
            drop_dm_percent: 0,
            read_interval: Duration::from_millis(150),
            add_code_quality: false,
            bad_codes_percent: 0,
        }
    }
}

/// Spawn the serialization topology: DM Printer -> S -> DM Camera, fanned
/// out (if `aggregation_count` > 0) into per-stream Aggregation Cameras,
/// plus either an Aggregation Verification Printer/Camera pair or a
/// LEVEL_0 Pallet Printer, and the LEVEL_1..3 Pallet Printers always.
pub async fn spawn_serialization(config: SerializationConfig) -> std::io::Result<()> {
    let (s_tx, s_rx) = code_queue();

    if !config.dm_file_source {
        let printer = PrinterListener::bind(config.printer_port, "dm_printer", s_tx.clone()).await?;
        tokio::spawn(printer.run());
    } else {
        let path = dm_csv_path();
        let tx = s_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = file_source::replay(&path, tx).await {
                error!(error = %e, "refurbishment file source failed inside serialization topology");
            }
        });
    }
    drop(s_tx);

    let n = usize::from(config.aggregation_count.min(9));
    let mut aggregation_senders = Vec::with_capacity(n);
    let mut aggregation_receivers = Vec::with_capacity(n);
    for _ in 0..n {
        let (tx, rx) = code_queue();
        aggregation_senders.push(tx);
        aggregation_receivers.push(rx);
    }

    let camera_config = EmitterConfig {
        read_interval: config.read_interval,
        stack: 1,
        gen_errors: config.gen_errors,
        error_percent: config.error_percent,
        drop_dm_percent: config.drop_dm_percent,
        add_code_quality: config.add_code_quality,
        bad_codes_percent: config.bad_codes_percent,
    };
    let dm_camera = Emitter::bind(
        DM_CAMERA_PORT,
        "dm_camera",
        s_rx,
        camera_config,
        aggregation_senders,
    )
    .await?;
    tokio::spawn(dm_camera.run());

    if n > 0 {
        for (i, rx) in aggregation_receivers.into_iter().enumerate() {
            let port = AGGREGATION_CAMERA_BASE_PORT + u16::try_from(i).expect("N <= 9");
            // Leaked once per aggregation stream (N <= 9, fixed at startup):
            // a small, bounded, one-time cost for a `&'static str` role tag.
            let role: &'static str = Box::leak(format!("aggregation_camera_{i}").into_boxed_str());
            let camera = Emitter::bind(port, role, rx, passthrough_config(config.read_interval), Vec::new()).await?;
            tokio::spawn(camera.run());
        }

        let (v_tx, v_rx) = code_queue();
        let verification_printer = PrinterListener::bind(
            AGGREGATION_VERIFICATION_PRINTER_PORT,
            "aggregation_verification_printer",
            v_tx,
        )
        .await?;
        tokio::spawn(verification_printer.run());

        let verification_camera = Emitter::bind(
            VERIFICATION_CAMERA_PORT,
            "verification_camera",
            v_rx,
            passthrough_config(config.read_interval),
            Vec::new(),
        )
        .await?;
        tokio::spawn(verification_camera.run());
    } else {
        let (level0_tx, _level0_rx) = code_queue();
        let level0 =
            PrinterListener::bind(LEVEL_0_PALLET_PRINTER_PORT, "level_0_pallet_printer", level0_tx)
                .await?;
        tokio::spawn(level0.run());
    }

    spawn_pallet_printers().await?;

    Ok(())
}

/// Spawn the refurbishment topology: a file-source replay feeding queue
/// D, drained by a single camera emitter with no fan-out and no faults.
pub async fn spawn_refurbishment() -> std::io::Result<()> {
    let path = dm_csv_path();
    if !path.exists() {
        error!(path = %path.display(), "refurbishment file missing, not starting listeners");
        return Ok(());
    }

    let (d_tx, d_rx) = code_queue();
    tokio::spawn(async move {
        if let Err(e) = file_source::replay(&path, d_tx).await {
            error!(error = %e, "refurbishment file source failed");
        }
    });

    let camera = Emitter::bind(
        DM_CAMERA_PORT,
        "refurbishment_camera",
        d_rx,
        passthrough_config(Duration::from_millis(150)),
        Vec::new(),
    )
    .await?;
    tokio::spawn(camera.run());

    Ok(())
}

async fn spawn_pallet_printers() -> std::io::Result<()> {
    for (role, port) in [
        ("level_1_pallet_printer", LEVEL_1_PALLET_PRINTER_PORT),
        ("level_2_pallet_printer", LEVEL_2_PALLET_PRINTER_PORT),
        ("level_3_pallet_printer", LEVEL_3_PALLET_PRINTER_PORT),
    ] {
        let (tx, _rx) = code_queue();
        let listener = PrinterListener::bind(port, role, tx).await?;
        tokio::spawn(listener.run());
    }
    Ok(())
}

fn passthrough_config(read_interval: Duration) -> EmitterConfig {
    EmitterConfig {
        read_interval,
        stack: 1,
        gen_errors: false,
        error_percent: 0,
        drop_dm_percent: 0,
        add_code_quality: false,
        bad_codes_percent: 0,
    }
}

/// `dm.csv`, resolved next to the running executable.
fn dm_csv_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dm.csv")
}
