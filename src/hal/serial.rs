//! Serial transport on `tokio-serial`.
//!
//! The module's UART always runs 8 data bits and 1 stop bit; only the baud
//! rate and parity change between sleep and the configured operating
//! settings. Each open splits the stream into a read half and a write half;
//! the port closes once both are dropped.

use crate::error::EbyteError;
use crate::hal::{Parity, SerialReader, SerialSettings, SerialTransport, SerialWriter};
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// UART link to the module
pub struct TokioSerialTransport {
    path: String,
}

impl TokioSerialTransport {
    /// A transport for the device at `path` (e.g., "/dev/ttyS0"); nothing is
    /// opened until `open` is called.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Read half of an open UART
pub struct SerialReadHalf(ReadHalf<SerialStream>);

/// Write half of an open UART
pub struct SerialWriteHalf(WriteHalf<SerialStream>);

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    type Reader = SerialReadHalf;
    type Writer = SerialWriteHalf;

    async fn open(
        &mut self,
        settings: SerialSettings,
    ) -> Result<(SerialReadHalf, SerialWriteHalf), EbyteError> {
        let stream = tokio_serial::new(&self.path, settings.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(settings.parity.into())
            .open_native_async()?;

        debug!("Opened {} at {settings}", self.path);
        let (reader, writer) = tokio::io::split(stream);
        Ok((SerialReadHalf(reader), SerialWriteHalf(writer)))
    }
}

#[async_trait]
impl SerialReader for SerialReadHalf {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, EbyteError> {
        Ok(self.0.read(buf).await?)
    }
}

#[async_trait]
impl SerialWriter for SerialWriteHalf {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), EbyteError> {
        self.0.write_all(data).await?;
        self.0.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EbyteError> {
        // SerialStream has no close method; dropping both halves closes the port
        self.0.flush().await?;
        Ok(())
    }
}
