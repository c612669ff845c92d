use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{trace, warn};

use crate::instructions::{calc_checksum, Instruction, StatusError, HEADER};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DynamixelError {
    #[error("connection timeout")]
    Timeout,
    #[error("{0}")]
    StatusError(StatusError),
    #[error("reading error")]
    ReadingError,
    #[error("status packet from id {actual} while talking to id {expected}")]
    UnexpectedId { expected: u8, actual: u8 },
    #[error("expected {expected} parameter bytes, received {actual}")]
    MissingParams { expected: usize, actual: usize },
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StatusError> for DynamixelError {
    fn from(error: StatusError) -> Self {
        DynamixelError::StatusError(error)
    }
}

impl DynamixelError {
    /// True when the servo answered but flagged an error in its status packet.
    pub fn is_device_error(&self) -> bool {
        matches!(self, DynamixelError::StatusError(_))
    }
}

pub type Result<T> = std::result::Result<T, DynamixelError>;

#[derive(PartialEq, Debug)]
pub(crate) struct Status {
    id: u8,
    error: u8,
    params: Vec<u8>,
}

impl Status {
    pub(crate) fn new(id: u8, error: u8, params: Vec<u8>) -> Status {
        Status { id, error, params }
    }

    pub(crate) fn id(&self) -> u8 {
        self.id
    }

    pub(crate) fn check_error(&self) -> std::result::Result<(), StatusError> {
        StatusError::check_error(self.error)
    }

    pub(crate) fn params(&self) -> &[u8] {
        &self.params
    }
}

pub(crate) struct DynamixelProtocol;

impl Decoder for DynamixelProtocol {
    type Item = Status;
    type Error = DynamixelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match src.windows(2).position(|window| window == HEADER) {
                Some(0) => {}
                Some(offset) => {
                    warn!(discarded = offset, "discarding bytes before status header");
                    src.advance(offset);
                }
                None => {
                    // a trailing 0xFF may be the first half of the next header
                    let keep = usize::from(src.last() == Some(&HEADER[0]));
                    let discard = src.len() - keep;
                    if discard > 0 {
                        warn!(discarded = discard, "discarding bytes without status header");
                        src.advance(discard);
                    }
                    return Ok(None);
                }
            }
            if src.len() < 3 {
                return Ok(None);
            }
            // 0xFF is never a valid id, so a third 0xFF means the header starts one byte later
            if src[2] == HEADER[0] {
                src.advance(1);
                continue;
            }
            if src.len() < 4 {
                return Ok(None);
            }
            let len = src[3] as usize;
            if len < 2 {
                warn!(len, "status packet length too short, resyncing");
                src.advance(1);
                continue;
            }
            if src.len() < 4 + len {
                return Ok(None);
            }
            let message = src.split_to(4 + len);
            trace!(packet = ?&message[..], "received status packet");

            let checksum = calc_checksum(&message[2..3 + len]);
            if checksum != message[3 + len] {
                warn!(
                    expected = checksum,
                    actual = message[3 + len],
                    "dropping status packet with bad checksum"
                );
                continue;
            }
            let params = message[5..3 + len].to_vec();
            return Ok(Some(Status::new(message[2], message[4], params)));
        }
    }
}

impl Encoder<Box<dyn Instruction>> for DynamixelProtocol {
    type Error = DynamixelError;

    fn encode(&mut self, data: Box<dyn Instruction>, buf: &mut BytesMut) -> Result<()> {
        let msg = data.serialize();
        trace!(packet = ?msg, "sending instruction packet");
        buf.reserve(msg.len());
        buf.put(msg.as_ref());
        Ok(())
    }
}

#[async_trait]
pub(crate) trait FramedDriver: Send + Sync {
    async fn send(&mut self, instruction: Box<dyn Instruction>) -> Result<()>;
    async fn receive(&mut self) -> Result<Status>;
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;
}

pub(crate) const TIMEOUT: u64 = 100;
pub(crate) const DEFAULT_BAUD_RATE: u32 = 1_000_000;

pub struct FramedSerialDriver {
    framed_port: Framed<SerialStream, DynamixelProtocol>,
}

impl FramedSerialDriver {
    pub fn new(port: &str) -> Result<FramedSerialDriver> {
        FramedSerialDriver::with_baud_rate(port, DEFAULT_BAUD_RATE)
    }

    pub fn with_baud_rate(port: &str, baud_rate: u32) -> Result<FramedSerialDriver> {
        let serial_port = tokio_serial::new(port, baud_rate)
            .timeout(Duration::from_millis(TIMEOUT))
            .open_native_async()?;
        Ok(FramedSerialDriver {
            framed_port: DynamixelProtocol.framed(serial_port),
        })
    }
}

#[async_trait]
impl FramedDriver for FramedSerialDriver {
    async fn send(&mut self, instruction: Box<dyn Instruction>) -> Result<()> {
        // drop late replies from a transaction that already timed out
        self.framed_port.read_buffer_mut().clear();
        self.framed_port.get_mut().clear(ClearBuffer::Input)?;
        self.framed_port.send(instruction).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Status> {
        let response = timeout(Duration::from_millis(TIMEOUT), self.framed_port.next())
            .await
            .map_err(|_| DynamixelError::Timeout)?
            .ok_or(DynamixelError::ReadingError)??;
        Ok(response)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.framed_port.get_mut().set_baud_rate(baud_rate)?;
        Ok(())
    }
}
