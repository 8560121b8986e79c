//! sdrdaemontx: receiver daemon. Reassembles FEC-protected UDP datagrams
//! back into a contiguous I/Q sample stream and serves a TCP command channel.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use sdr_config::control::{ControlCommand, ControlServer, ControlSink};
use sdr_config::DaemonConfig;
use sdr_receiver::{NetworkReader, ResidualBuffer, SingleSlotReassembler, SlidingWindowReassembler};
use sdr_receiver::sliding::DEFAULT_SLOT_COUNT;
use tokio::io::AsyncWriteExt;
use tokio::net::UdpSocket;
use tracing::{info, warn};

const RESIDUAL_READ_CHUNK: usize = 65_536;

#[derive(Parser)]
#[command(name = "sdrdaemontx")]
#[command(about = "Reassemble FEC-protected UDP datagrams into an I/Q sample stream", long_about = None)]
struct Cli {
    /// Destination device type (device enumeration itself is out of scope)
    #[arg(short = 't', long, default_value = "file")]
    devtype: String,

    /// Startup configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Device index
    #[arg(short = 'd', long, default_value_t = 0)]
    devidx: u32,

    /// Enable a buffered input queue between the network reader and the
    /// device, and select the sliding-window reassembler variant
    #[arg(short = 'b', long)]
    buffered: bool,

    /// Bind address for the UDP data channel
    #[arg(short = 'I', long, default_value = "0.0.0.0")]
    address: String,

    /// Bind port for the UDP data channel
    #[arg(short = 'D', long)]
    dataport: Option<u16>,

    /// Bind port for the TCP command channel
    #[arg(short = 'C', long)]
    ctlport: Option<u16>,

    /// Raise logging verbosity
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Also write the reassembled sample stream to a file, sdriq-style
    /// (sample rate, frequency, start timestamp header followed by raw
    /// interleaved samples)
    #[arg(long)]
    record: Option<PathBuf>,
}

struct NoopSink;

impl ControlSink for NoopSink {
    fn apply(&self, command: &ControlCommand) -> std::result::Result<(), String> {
        match command {
            ControlCommand::Passthrough(key, _value) => {
                warn!(key, "ignoring device-specific control key, no device backend wired");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let file_config = match &cli.config {
        Some(path) => Some(DaemonConfig::from_file(path).context("failed to parse config file")?),
        None => None,
    };

    let data_port = cli
        .dataport
        .or_else(|| file_config.as_ref().map(|c| c.data_port()))
        .unwrap_or(9090);
    let ctl_port = cli
        .ctlport
        .or_else(|| file_config.as_ref().map(|c| c.control_port()))
        .unwrap_or(9091);
    let buf_payloads = file_config
        .as_ref()
        .map(|c| c.residual_buffer_payloads())
        .unwrap_or(512);
    let record_sample_rate_hz = file_config.as_ref().map(|c| c.sample_rate_hz()).unwrap_or(0);
    let record_frequency_hz = file_config.as_ref().map(|c| c.center_frequency_hz()).unwrap_or(0);

    info!(devtype = %cli.devtype, devidx = cli.devidx, buffered = cli.buffered, "starting sdrdaemontx");

    let bind_addr: SocketAddr = format!("{}:{}", cli.address, data_port)
        .parse()
        .context("invalid bind address")?;
    let socket = UdpSocket::bind(bind_addr)
        .await
        .context("failed to bind UDP data socket")?;

    let residual = Arc::new(ResidualBuffer::new(
        sdr_proto::constants::FRAME_PAYLOAD_BYTES,
        buf_payloads,
    ));

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

    let ctl_addr: SocketAddr = format!("0.0.0.0:{ctl_port}")
        .parse()
        .context("invalid control channel bind address")?;
    let sink = Arc::new(NoopSink);
    let control_server = ControlServer::bind(ctl_addr, sink)
        .await
        .context("failed to bind control channel")?;
    let ctl_stop = stop_rx.clone();
    let ctl_handle = tokio::spawn(async move { control_server.run(ctl_stop).await });

    let network_stop = stop_rx.clone();
    let network_residual = residual.clone();
    let network_handle = if cli.buffered {
        let reassembler = SlidingWindowReassembler::new(DEFAULT_SLOT_COUNT);
        tokio::spawn(async move {
            let mut reader = NetworkReader::new(socket, reassembler, network_residual);
            reader.run(network_stop).await
        })
    } else {
        let reassembler = SingleSlotReassembler::new();
        tokio::spawn(async move {
            let mut reader = NetworkReader::new(socket, reassembler, network_residual);
            reader.run(network_stop).await
        })
    };

    let consumer_stop = stop_rx.clone();
    let consumer_residual = residual.clone();
    let consumer_handle = tokio::spawn(async move {
        run_consumer(
            consumer_residual,
            cli.record,
            record_sample_rate_hz,
            record_frequency_hz,
            consumer_stop,
        )
        .await
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    let _ = stop_tx.send(true);

    let _ = network_handle.await;
    let _ = ctl_handle.await;
    let _ = consumer_handle.await;

    Ok(())
}

/// Drains the residual buffer at the consumer's own cadence. With no real
/// downstream SDR Tx device in scope, the stream is either discarded or, if
/// `--record` was given, written to a file in the `FileSink` sdriq layout.
async fn run_consumer(
    residual: Arc<ResidualBuffer>,
    record_path: Option<PathBuf>,
    sample_rate_hz: u32,
    frequency_hz: u64,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut file = match record_path {
        Some(path) => match open_record_file(&path, sample_rate_hz, frequency_hz).await {
            Ok(f) => Some(f),
            Err(e) => {
                warn!(error = %e, "failed to open record file, discarding samples instead");
                None
            }
        },
        None => None,
    };

    let mut chunk = vec![0u8; RESIDUAL_READ_CHUNK];
    while !*stop.borrow() {
        let n = residual.read(&mut chunk).await;
        if n == 0 {
            continue;
        }
        if let Some(f) = file.as_mut() {
            if let Err(e) = f.write_all(&chunk[..n]).await {
                warn!(error = %e, "failed to write record file, discarding samples from here on");
                file = None;
            }
        }
    }
}

async fn open_record_file(
    path: &PathBuf,
    sample_rate_hz: u32,
    frequency_hz: u64,
) -> std::io::Result<tokio::fs::File> {
    let mut file = tokio::fs::File::create(path).await?;
    let started_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    file.write_all(&sample_rate_hz.to_le_bytes()).await?;
    file.write_all(&frequency_hz.to_le_bytes()).await?;
    file.write_all(&started_at.to_le_bytes()).await?;
    Ok(file)
}
