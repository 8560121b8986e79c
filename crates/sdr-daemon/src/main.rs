//! sdrdaemon: sender daemon. Frames I/Q samples into FEC-protected UDP
//! datagrams and serves a TCP command channel for live reconfiguration.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sdr_config::control::{ControlCommand, ControlServer, ControlSink};
use sdr_config::DaemonConfig;
use sdr_proto::constants::SAMPLES_PER_BLOCK;
use sdr_proto::Sample;
use sdr_sender::{Framer, SenderControls, TuningSnapshot, TxRing, TxTask};
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// Tx staging ring depth. Two slots is the minimum; a third gives the
/// producer thread headroom while the Tx task is mid-transmit.
const RING_CAPACITY: usize = 3;

#[derive(Parser)]
#[command(name = "sdrdaemon")]
#[command(about = "Frame I/Q samples into FEC-protected UDP datagrams", long_about = None)]
struct Cli {
    /// Source device type (device enumeration itself is out of scope; this
    /// selects the synthetic sample source used in its place)
    #[arg(short = 't', long, default_value = "file")]
    devtype: String,

    /// Startup configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Device index
    #[arg(short = 'd', long, default_value_t = 0)]
    devidx: u32,

    /// FEC recovery block count (0..127)
    #[arg(short = 'b', long, default_value_t = 0)]
    blocks: u8,

    /// Destination address for the UDP data channel
    #[arg(short = 'I', long, default_value = "127.0.0.1")]
    address: String,

    /// Destination port for the UDP data channel
    #[arg(short = 'D', long)]
    dataport: Option<u16>,

    /// Bind port for the TCP command channel
    #[arg(short = 'C', long)]
    ctlport: Option<u16>,

    /// Raise logging verbosity
    #[arg(short = 'v', long)]
    verbose: bool,
}

struct SenderSink {
    controls: Arc<SenderControls>,
    tuning: Arc<TuningSnapshot>,
}

impl ControlSink for SenderSink {
    fn apply(&self, command: &ControlCommand) -> std::result::Result<(), String> {
        match command {
            ControlCommand::CenterFrequencyHz(hz) => {
                self.tuning.set_center_frequency_hz(*hz as u32);
                Ok(())
            }
            ControlCommand::SampleRateHz(hz) => {
                self.tuning.set_sample_rate_hz(*hz);
                Ok(())
            }
            ControlCommand::FecBlocks(r) => {
                self.controls.recovery_count.store(*r, Ordering::Relaxed);
                Ok(())
            }
            ControlCommand::TxDelayUs(us) => {
                self.controls.tx_delay_us.store(*us, Ordering::Relaxed);
                Ok(())
            }
            ControlCommand::DecimationLog2(_) | ControlCommand::InterpolationLog2(_) => Ok(()),
            ControlCommand::FcPos(_pos) => Ok(()),
            ControlCommand::Passthrough(key, _value) => {
                warn!(key, "ignoring device-specific control key, no device backend wired");
                Ok(())
            }
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

    let center_frequency_hz = file_config
        .as_ref()
        .map(|c| c.center_frequency_hz())
        .unwrap_or(435_000_000);
    let sample_rate_hz = file_config.as_ref().map(|c| c.sample_rate_hz()).unwrap_or(1_000_000);
    let recovery_count = if cli.blocks > 0 {
        cli.blocks
    } else {
        file_config.as_ref().map(|c| c.fec_blocks()).unwrap_or(0)
    };
    let tx_delay_us = file_config.as_ref().map(|c| c.tx_delay_us()).unwrap_or(0);
    let data_port = cli
        .dataport
        .or_else(|| file_config.as_ref().map(|c| c.data_port()))
        .unwrap_or(9090);
    let ctl_port = cli
        .ctlport
        .or_else(|| file_config.as_ref().map(|c| c.control_port()))
        .unwrap_or(9091);

    info!(devtype = %cli.devtype, devidx = cli.devidx, "starting sdrdaemon");

    let dest: SocketAddr = format!("{}:{}", cli.address, data_port)
        .parse()
        .context("invalid destination address")?;
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind UDP data socket")?;

    let ring = Arc::new(TxRing::new(RING_CAPACITY));
    let controls = Arc::new(SenderControls::new(recovery_count, tx_delay_us));
    let tuning = Arc::new(TuningSnapshot::new(
        center_frequency_hz as u32,
        sample_rate_hz,
        0x02,
        16,
    ));

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

    let tx_task = TxTask::new(ring.clone(), socket, dest);
    let tx_stop = stop_rx.clone();
    let tx_handle = tokio::spawn(async move { tx_task.run(tx_stop).await });

    let ctl_addr: SocketAddr = format!("0.0.0.0:{ctl_port}")
        .parse()
        .context("invalid control channel bind address")?;
    let sink = Arc::new(SenderSink {
        controls: controls.clone(),
        tuning: tuning.clone(),
    });
    let control_server = ControlServer::bind(ctl_addr, sink)
        .await
        .context("failed to bind control channel")?;
    let ctl_stop = stop_rx.clone();
    let ctl_handle = tokio::spawn(async move { control_server.run(ctl_stop).await });

    let producer_ring = ring.clone();
    let producer_controls = controls.clone();
    let producer_tuning = tuning.clone();
    let producer_stop = stop_rx.clone();
    let producer_handle = std::thread::spawn(move || {
        run_sample_source(producer_ring, producer_controls, producer_tuning, producer_stop)
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    let _ = stop_tx.send(true);

    let _ = tx_handle.await;
    let _ = ctl_handle.await;
    let _ = producer_handle.join();

    Ok(())
}

/// Synthetic sample source standing in for a real SDR front-end (device
/// enumeration and acquisition are out of scope). Runs on its own OS
/// thread since `Framer::write` may block cooperatively on ring backpressure.
fn run_sample_source(
    ring: Arc<TxRing>,
    controls: Arc<SenderControls>,
    tuning: Arc<TuningSnapshot>,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let mut framer = Framer::new(ring, controls, tuning);
    let mut phase: u32 = 0;
    let mut chunk = vec![Sample::new(0, 0); SAMPLES_PER_BLOCK];

    while !*stop.borrow() {
        for sample in chunk.iter_mut() {
            let angle = (phase as f64) * 0.01;
            *sample = Sample::new((angle.cos() * 1000.0) as i16, (angle.sin() * 1000.0) as i16);
            phase = phase.wrapping_add(1);
        }
        framer.write(&chunk);
        if stop.has_changed().unwrap_or(false) && *stop.borrow() {
            break;
        }
    }
}
