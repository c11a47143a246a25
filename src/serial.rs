use crate::config::SerialConfig;
use crate::error::AppError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::{debug, warn};

/// Open the device 8N1 with no flow control and drop anything already buffered.
pub fn open(cfg: &SerialConfig) -> Result<SerialStream, AppError> {
    let port = tokio_serial::new(&cfg.port, cfg.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| AppError::Serial(format!("failed to open {}: {}", cfg.port, e)))?;

    port.clear(ClearBuffer::All)
        .map_err(|e| AppError::Serial(format!("failed to clear buffers on {}: {}", cfg.port, e)))?;

    Ok(port)
}

/// Splits a byte stream into `\n`-terminated lines.
pub struct LineReader<R> {
    inner: BufReader<R>,
    read_timeout: Option<Duration>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(stream: R, read_timeout: Option<Duration>) -> Self {
        Self {
            inner: BufReader::new(stream),
            read_timeout,
            buf: Vec::with_capacity(256),
        }
    }

    /// Wait for the next line with the terminator (and any `\r`) removed.
    ///
    /// End of stream is [`AppError::SerialClosed`]. A partial line without a
    /// terminator at end of stream is still returned first. An expired read
    /// timeout only logs; the wait continues.
    pub async fn next_line(&mut self) -> Result<&[u8], AppError> {
        self.buf.clear();
        let n = match self.read_timeout {
            None => self.read_raw().await?,
            Some(limit) => loop {
                let res = tokio::time::timeout(limit, self.read_raw()).await;
                match res {
                    Ok(res) => break res?,
                    Err(_) => warn!(
                        timeout_secs = limit.as_secs(),
                        buffered = self.buf.len(),
                        "no reading received from serial device"
                    ),
                }
            },
        };
        if n == 0 && self.buf.is_empty() {
            return Err(AppError::SerialClosed);
        }
        debug!(bytes = self.buf.len(), "line read");
        Ok(trim_line_ending(&self.buf))
    }

    async fn read_raw(&mut self) -> Result<usize, AppError> {
        self.inner
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|e| AppError::Serial(format!("read failed: {}", e)))
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
