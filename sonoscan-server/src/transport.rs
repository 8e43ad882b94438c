//! Framed protocol transport
//!
//! Wraps any async byte stream (a serial port opened by the platform, a
//! serial-to-TCP bridge, or an in-memory duplex in tests) into a
//! frame-oriented link: send whole frames, await a specific message id with
//! a deadline. Opening the underlying device is the caller's concern.

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use sonoscan_core::protocol::{message_id, nack_rejected_id};
use sonoscan_core::{Frame, FrameAccumulator};

use crate::error::DeviceError;

/// Read chunk size; device-data frames for 1000 samples fit in two reads
const READ_BUF_LEN: usize = 2048;

/// Frame-oriented link over an async byte stream.
pub struct SonarLink<T> {
    io: T,
    accumulator: FrameAccumulator,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SonarLink<T> {
    pub fn new(io: T) -> Self {
        SonarLink {
            io,
            accumulator: FrameAccumulator::new(),
        }
    }

    /// Write one frame to the transport.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), DeviceError> {
        let wire = frame.encode();
        trace!("sending message {} ({} bytes)", frame.message_id, wire.len());
        self.io.write_all(&wire).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Await the next frame with `message_id`, discarding unrelated traffic.
    ///
    /// Blocks the calling task for at most `timeout`; expiry yields
    /// [`DeviceError::Timeout`] and leaves the device state untouched.
    pub async fn wait_message(
        &mut self,
        message_id: u16,
        timeout: Duration,
    ) -> Result<Frame, DeviceError> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_BUF_LEN];

        loop {
            while let Some(frame) = self.accumulator.next_frame() {
                if frame.message_id == message_id {
                    return Ok(frame);
                }
                if frame.message_id == message_id::NACK {
                    // the device rejected a command; the awaited response will
                    // not come, the deadline bounds how long we keep listening
                    match nack_rejected_id(&frame.payload) {
                        Some(rejected) => warn!("device rejected message {rejected}"),
                        None => warn!("device sent a NACK without a message id"),
                    }
                    continue;
                }
                debug!("ignoring message {} while waiting for {}", frame.message_id, message_id);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DeviceError::Timeout(timeout.as_millis() as u64));
            }
            match tokio::time::timeout(remaining, self.io.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    return Err(DeviceError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "sonar transport closed",
                    )))
                }
                Ok(Ok(n)) => self.accumulator.extend(&buf[..n]),
                Ok(Err(e)) => return Err(DeviceError::Io(e)),
                Err(_) => return Err(DeviceError::Timeout(timeout.as_millis() as u64)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonoscan_core::protocol::ping360;
    use sonoscan_core::DeviceSettings;

    #[tokio::test]
    async fn test_send_and_wait_roundtrip() {
        let (near, far) = tokio::io::duplex(4096);
        let mut link = SonarLink::new(near);
        let mut peer = SonarLink::new(far);

        let frame = ping360::encode_device_data(&DeviceSettings::default(), 42, &[1, 2, 3]);
        peer.send(&frame).await.unwrap();

        let received = link
            .wait_message(ping360::DEVICE_DATA, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn test_wait_message_skips_unrelated_frames() {
        let (near, far) = tokio::io::duplex(4096);
        let mut link = SonarLink::new(near);
        let mut peer = SonarLink::new(far);

        peer.send(&Frame::new(1, vec![])).await.unwrap();
        let wanted = ping360::encode_device_data(&DeviceSettings::default(), 0, &[7]);
        peer.send(&wanted).await.unwrap();

        let received = link
            .wait_message(ping360::DEVICE_DATA, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(received, wanted);
    }

    #[tokio::test]
    async fn test_wait_message_survives_nack() {
        let (near, far) = tokio::io::duplex(4096);
        let mut link = SonarLink::new(near);
        let mut peer = SonarLink::new(far);

        // rejection of the transducer command, then the data it asked for
        let nack = Frame::new(message_id::NACK, ping360::TRANSDUCER.to_le_bytes().to_vec());
        peer.send(&nack).await.unwrap();
        let wanted = ping360::encode_device_data(&DeviceSettings::default(), 5, &[9]);
        peer.send(&wanted).await.unwrap();

        let received = link
            .wait_message(ping360::DEVICE_DATA, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(received, wanted);
    }

    #[tokio::test]
    async fn test_nack_alone_still_times_out() {
        let (near, far) = tokio::io::duplex(4096);
        let mut link = SonarLink::new(near);
        let mut peer = SonarLink::new(far);

        peer.send(&Frame::new(message_id::NACK, vec![])).await.unwrap();
        let err = link
            .wait_message(ping360::DEVICE_DATA, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_wait_message_times_out() {
        let (near, _far) = tokio::io::duplex(64);
        let mut link = SonarLink::new(near);
        let err = link
            .wait_message(ping360::DEVICE_DATA, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(20)));
    }
}
