//! Serial line source for the VE.Direct text stream.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::SerialStream;

/// VE.Direct text-protocol framing: 19200 baud, 8 data bits, no parity,
/// 1 stop bit.
const BAUD_RATE: u32 = 19200;

/// Upper bound on how long one read may block, which also bounds how
/// quickly a shutdown is honored.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("Serial read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("Serial stream ended")]
    Closed,
}

/// Owns the serial port and yields decoded text lines.
///
/// Restartable only by reopening: once `next_line` returns an error the
/// source is spent and the caller drops it.
pub struct SerialLineSource {
    reader: BufReader<SerialStream>,
    pending: Vec<u8>,
}

impl SerialLineSource {
    /// Open the port with VE.Direct framing.
    pub fn open(port: &str) -> Result<Self, SerialError> {
        let builder = tokio_serial::new(port, BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One);

        let stream = SerialStream::open(&builder).map_err(|source| SerialError::Open {
            port: port.to_string(),
            source,
        })?;

        Ok(Self {
            reader: BufReader::new(stream),
            pending: Vec::new(),
        })
    }

    /// Read the next LF-delimited line, decoded permissively and trimmed.
    ///
    /// Returns `Ok(None)` when no complete line arrived within the read
    /// timeout; bytes received so far stay buffered and the read resumes
    /// on the next call. An I/O failure or end of stream is a typed error,
    /// never a panic.
    pub async fn next_line(&mut self) -> Result<Option<String>, SerialError> {
        let read = tokio::time::timeout(
            READ_TIMEOUT,
            self.reader.read_until(b'\n', &mut self.pending),
        )
        .await;

        match read {
            Ok(Ok(0)) => Err(SerialError::Closed),
            Ok(Ok(_)) => {
                if self.pending.last() != Some(&b'\n') {
                    // read_until returned without the delimiter: EOF mid-line.
                    return Err(SerialError::Closed);
                }
                let line = decode_line(&self.pending);
                self.pending.clear();
                Ok(Some(line))
            }
            Ok(Err(e)) => Err(SerialError::Read(e)),
            Err(_) => Ok(None),
        }
    }
}

/// Decode a raw record as ASCII, dropping any non-ASCII bytes, and trim
/// surrounding whitespace (including the CR of the CRLF terminator).
fn decode_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .copied()
        .filter(u8::is_ascii)
        .map(char::from)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_trims_crlf() {
        assert_eq!(decode_line(b"V\t12560\r\n"), "V\t12560");
    }

    #[test]
    fn test_decode_line_drops_non_ascii() {
        assert_eq!(decode_line(b"V\t125\xff60\r\n"), "V\t12560");
        assert_eq!(decode_line(b"\xc3\xa9SOC\t845\n"), "SOC\t845");
    }

    #[test]
    fn test_decode_line_keeps_inner_tab() {
        assert_eq!(decode_line(b"Checksum\t\x09\r\n"), "Checksum");
    }
}
