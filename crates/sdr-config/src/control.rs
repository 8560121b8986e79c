use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};

/// Center-frequency placement relative to the tuner's local oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcPos {
    Infradyne,
    Supradyne,
    Centered,
}

impl FcPos {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(FcPos::Infradyne),
            1 => Ok(FcPos::Supradyne),
            2 => Ok(FcPos::Centered),
            _ => Err(Error::InvalidValue {
                key: "fcpos".into(),
                value: v.to_string(),
            }),
        }
    }
}

/// One parsed command-channel directive. Device-specific keys (`gain`,
/// `lgain`, `vgain`, `bw`, `bwfilter`, `extamp`, `antbias`, `agc`,
/// `ppmp`/`ppmn`) are not interpreted here; they pass through to whatever
/// collaborator owns the device.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    CenterFrequencyHz(u64),
    SampleRateHz(u32),
    FecBlocks(u8),
    TxDelayUs(u32),
    DecimationLog2(u8),
    InterpolationLog2(u8),
    FcPos(FcPos),
    Passthrough(String, String),
}

fn parse_one(key: &str, value: &str) -> Result<ControlCommand> {
    let invalid = |key: &str| Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    match key {
        "freq" => Ok(ControlCommand::CenterFrequencyHz(
            value.parse().map_err(|_| invalid(key))?,
        )),
        "srate" => Ok(ControlCommand::SampleRateHz(
            value.parse().map_err(|_| invalid(key))?,
        )),
        "fecblk" => {
            let r: u8 = value.parse().map_err(|_| invalid(key))?;
            if !(1..=127).contains(&r) {
                return Err(invalid(key));
            }
            Ok(ControlCommand::FecBlocks(r))
        }
        "txdelay" => Ok(ControlCommand::TxDelayUs(
            value.parse().map_err(|_| invalid(key))?,
        )),
        "decim" => {
            let d: u8 = value.parse().map_err(|_| invalid(key))?;
            if d > 6 {
                return Err(invalid(key));
            }
            Ok(ControlCommand::DecimationLog2(d))
        }
        "interp" => {
            let i: u8 = value.parse().map_err(|_| invalid(key))?;
            if i > 6 {
                return Err(invalid(key));
            }
            Ok(ControlCommand::InterpolationLog2(i))
        }
        "fcpos" => {
            let v: u8 = value.parse().map_err(|_| invalid(key))?;
            Ok(ControlCommand::FcPos(FcPos::from_u8(v)?))
        }
        other => Ok(ControlCommand::Passthrough(other.to_string(), value.to_string())),
    }
}

/// Parse an ASCII `key=value,key=value` request body, per the grammar the
/// command channel speaks on the wire.
pub fn parse_request(request: &str) -> Result<Vec<ControlCommand>> {
    let request = request.trim();
    if request.is_empty() {
        return Err(Error::MalformedRequest("empty request".into()));
    }
    request
        .split(',')
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::MalformedRequest(pair.to_string()))?;
            parse_one(key.trim(), value.trim())
        })
        .collect()
}

/// Anything that can accept parsed control commands and apply them,
/// returning an error string on rejection (`ConfigurationReject`).
pub trait ControlSink: Send + Sync {
    fn apply(&self, command: &ControlCommand) -> std::result::Result<(), String>;
}

/// TCP request/reply command server. One accept loop, one task per
/// connection; each connection is read line-by-line so a client may issue
/// several requests without reconnecting.
pub struct ControlServer<S: ControlSink + 'static> {
    listener: TcpListener,
    sink: Arc<S>,
}

impl<S: ControlSink + 'static> ControlServer<S> {
    pub async fn bind(addr: SocketAddr, sink: Arc<S>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, sink })
    }

    pub async fn run(&self, mut stop: tokio::sync::watch::Receiver<bool>) -> Result<()> {
        loop {
            if *stop.borrow() {
                return Ok(());
            }
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let sink = self.sink.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, sink).await {
                            tracing::debug!(%peer, error = %e, "control connection ended");
                        }
                    });
                }
                _ = stop.changed() => {
                    if *stop.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn handle_connection<S: ControlSink>(stream: TcpStream, sink: Arc<S>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_request(&line) {
            Ok(commands) => apply_all(&*sink, &commands),
            Err(e) => format!("ERR {e}"),
        };
        write_half.write_all(reply.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }
    Ok(())
}

fn apply_all<S: ControlSink + ?Sized>(sink: &S, commands: &[ControlCommand]) -> String {
    for command in commands {
        if let Err(e) = sink.apply(command) {
            return format!("ERR {e}");
        }
    }
    "OK".to_string()
}

/// Minimal synchronous-feeling client: connect, send one request line, read
/// one reply line.
pub struct ControlClient;

impl ControlClient {
    pub async fn send(addr: SocketAddr, request: &str) -> Result<String> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(request.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        let mut lines = BufReader::new(read_half).lines();
        lines
            .next_line()
            .await?
            .ok_or_else(|| Error::MalformedRequest("connection closed with no reply".into()))
    }
}
