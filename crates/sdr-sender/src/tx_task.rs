use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use sdr_fec::{CauchyCodec, CodecParams};
use sdr_proto::constants::{BLOCK_SIZE, MAX_RECOVERY_COUNT, ORIGINAL_COUNT};
use sdr_proto::{Datagram, Header};
use tokio::net::UdpSocket;

use crate::error::Result;
use crate::ring::{StagingSlot, TxRing};

/// Endless loop consuming ready staging buffers in ring order, encoding
/// recovery blocks when `recovery_count > 0`, and transmitting each
/// datagram over UDP with per-datagram pacing. One per sender.
pub struct TxTask {
    ring: Arc<TxRing>,
    socket: UdpSocket,
    dest: SocketAddr,
    codec: CauchyCodec,
}

impl TxTask {
    pub fn new(ring: Arc<TxRing>, socket: UdpSocket, dest: SocketAddr) -> Self {
        Self {
            ring,
            socket,
            dest,
            codec: CauchyCodec::new(),
        }
    }

    /// Runs until `stop` is set to `true`. Intended to be spawned as its own
    /// task alongside the producer thread driving the [`Framer`](crate::framer::Framer).
    pub async fn run(&self, mut stop: tokio::sync::watch::Receiver<bool>) -> Result<()> {
        loop {
            if *stop.borrow() {
                return Ok(());
            }
            tokio::select! {
                slot = self.ring.wait_for_ready() => {
                    self.drain_slot(slot).await?;
                    self.ring.advance_read();
                }
                _ = stop.changed() => {
                    if *stop.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn drain_slot(&self, slot_mutex: &Mutex<StagingSlot>) -> Result<()> {
        let (frame_index, recovery_count, tx_delay_us, mut blocks) = {
            let slot = slot_mutex.lock().unwrap();
            let recovery_count = slot.recovery_count;
            let needed = ORIGINAL_COUNT + recovery_count;
            let blocks: Vec<BytesMut> = slot.blocks[..needed].to_vec();
            (slot.frame_index, recovery_count, slot.tx_delay_us, blocks)
        };

        if recovery_count > 0 {
            let params = CodecParams {
                block_bytes: BLOCK_SIZE,
                original_count: ORIGINAL_COUNT,
                max_recovery_count: MAX_RECOVERY_COUNT,
            };
            let (orig_part, rec_part) = blocks.split_at_mut(ORIGINAL_COUNT);
            let originals: Vec<&[u8]> = orig_part.iter().map(|b| &b[..]).collect();
            let mut recovery_refs: Vec<&mut [u8]> = rec_part.iter_mut().map(|b| &mut b[..]).collect();
            self.codec.encode(params, &originals, &mut recovery_refs)?;
        }

        for (index, block) in blocks.iter().enumerate() {
            let header = Header::new(frame_index, index as u8);
            let payload = Bytes::copy_from_slice(&block[..]);
            let dg = Datagram::new(header, payload)?;
            let buf = dg.encode_to_bytes();
            self.socket.send_to(&buf, self.dest).await?;
            if tx_delay_us > 0 {
                tokio::time::sleep(Duration::from_micros(tx_delay_us)).await;
            }
        }
        Ok(())
    }
}
