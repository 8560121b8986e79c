use std::sync::Arc;

use sdr_proto::constants::DATAGRAM_SIZE;
use sdr_proto::Datagram;
use tokio::net::UdpSocket;

use crate::error::Result;
use crate::reassembler::Reassembler;
use crate::residual::ResidualBuffer;

/// Network reader task: receives datagrams, feeds them to a [`Reassembler`],
/// and appends recovered frame payloads to the shared [`ResidualBuffer`].
/// Runs on its own background task; its only blocking point is the socket
/// receive itself.
pub struct NetworkReader<R: Reassembler> {
    socket: UdpSocket,
    reassembler: R,
    residual: Arc<ResidualBuffer>,
}

impl<R: Reassembler> NetworkReader<R> {
    pub fn new(socket: UdpSocket, reassembler: R, residual: Arc<ResidualBuffer>) -> Self {
        Self {
            socket,
            reassembler,
            residual,
        }
    }

    pub async fn run(&mut self, mut stop: tokio::sync::watch::Receiver<bool>) -> Result<()> {
        let mut buf = [0u8; DATAGRAM_SIZE];
        loop {
            if *stop.borrow() {
                return Ok(());
            }
            tokio::select! {
                recv = self.socket.recv_from(&mut buf) => {
                    let (n, _peer) = recv?;
                    if n != DATAGRAM_SIZE {
                        tracing::warn!(n, "dropping datagram of unexpected size");
                        continue;
                    }
                    match Datagram::decode(&buf[..]) {
                        Ok(datagram) => {
                            if let Some(frame) = self.reassembler.write_and_read(datagram)? {
                                self.residual.append(&frame.payload).await;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "dropping malformed datagram"),
                    }
                }
                _ = stop.changed() => {
                    if *stop.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    pub fn reassembler(&self) -> &R {
        &self.reassembler
    }
}
