//! Connectionless GELF writer.
//!
//! Every write becomes one GELF 1.1 message sent over UDP. The socket is
//! non-blocking and send failures are dropped, so a slow or unreachable
//! collector never stalls the caller. Only [`GelfWriter::check`] reports
//! socket errors; flushing never does.

use std::{
    io::{self, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket},
};

use chrono::{DateTime, Utc};
use flate2::{write::GzEncoder, Compression};
use serde::Serialize;

use super::{writer::LogWriter, Level, LogRecord};

/// Largest datagram sent, chunk header included.
pub const CHUNK_SIZE: usize = 1420;
pub const MAX_CHUNKS: usize = 128;

const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
const CHUNK_HEADER_LEN: usize = 12;
const GELF_VERSION: &str = "1.1";

#[derive(Serialize)]
struct GelfMessage<'a> {
    version: &'static str,
    host: &'a str,
    short_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_message: Option<&'a str>,
    timestamp: f64,
    level: u8,
    #[serde(rename = "_facility", skip_serializing_if = "is_empty")]
    facility: &'a str,
    #[serde(rename = "_file", skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(rename = "_line", skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

/// Payload encoding of the datagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GelfCompression {
    #[default]
    None,
    Gzip,
}

pub struct GelfWriter {
    socket: UdpSocket,
    facility: String,
    hostname: String,
    compression: GelfCompression,
}

impl GelfWriter {
    /// Resolves `address` (`host:port`) and opens a non-blocking UDP socket
    /// connected to it.
    pub fn new(address: &str) -> io::Result<Self> {
        let remote = address.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no address found for {}", address),
            )
        })?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            facility: String::new(),
            hostname: hostname(),
            compression: GelfCompression::None,
        })
    }

    pub fn set_facility(&mut self, facility: impl Into<String>) {
        self.facility = facility.into();
    }

    pub fn facility(&self) -> &str {
        &self.facility
    }

    pub fn set_compression(&mut self, compression: GelfCompression) {
        self.compression = compression;
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Reports an error the socket has picked up since the last check, if any.
    pub fn check(&self) -> io::Result<()> {
        match self.socket.take_error()? {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn send(
        &self,
        text: &str,
        severity: u8,
        timestamp: DateTime<Utc>,
        caller: Option<&str>,
    ) -> io::Result<()> {
        let text = text.trim();
        let (short_message, full_message) = match text.find('\n') {
            Some(idx) if idx > 0 => (&text[..idx], Some(text)),
            _ => (text, None),
        };
        let (file, line) = match caller.map(split_caller) {
            Some((file, line)) => (Some(file), line),
            None => (None, None),
        };

        let message = GelfMessage {
            version: GELF_VERSION,
            host: &self.hostname,
            short_message,
            full_message,
            timestamp: timestamp.timestamp_micros() as f64 / 1_000_000.0,
            level: severity,
            facility: &self.facility,
            file,
            line,
        };
        let payload = match self.compression {
            GelfCompression::None => serde_json::to_vec(&message)?,
            GelfCompression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                serde_json::to_writer(&mut encoder, &message)?;
                encoder.finish()?
            }
        };

        let Some(datagrams) = chunk(&payload) else {
            return Ok(());
        };

        for datagram in datagrams {
            // Best effort: the collector may be gone or the buffer full.
            let _ = self.socket.send(&datagram);
        }

        Ok(())
    }
}

impl LogWriter for GelfWriter {
    fn write_line(&mut self, record: &LogRecord, line: &str) -> io::Result<()> {
        self.send(
            line,
            record.level.syslog_severity(),
            record.timestamp,
            record.caller.as_deref(),
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for GelfWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.send(&text, Level::Info.syslog_severity(), Utc::now(), None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Splits a serialized message into datagrams. Returns `None` when the
/// message needs more than [`MAX_CHUNKS`] chunks.
fn chunk(payload: &[u8]) -> Option<Vec<Vec<u8>>> {
    if payload.len() <= CHUNK_SIZE {
        return Some(vec![payload.to_vec()]);
    }

    let data_size = CHUNK_SIZE - CHUNK_HEADER_LEN;
    let count = payload.len().div_ceil(data_size);
    if count > MAX_CHUNKS {
        return None;
    }

    let id = uuid::Uuid::new_v4();
    let id = &id.as_bytes()[..8];

    let datagrams = payload
        .chunks(data_size)
        .enumerate()
        .map(|(seq, data)| {
            let mut datagram = Vec::with_capacity(CHUNK_HEADER_LEN + data.len());
            datagram.extend_from_slice(&CHUNK_MAGIC);
            datagram.extend_from_slice(id);
            datagram.push(seq as u8);
            datagram.push(count as u8);
            datagram.extend_from_slice(data);
            datagram
        })
        .collect();

    Some(datagrams)
}

fn is_empty(value: &&str) -> bool {
    value.is_empty()
}

/// Splits `file:line`. A caller without a numeric line keeps the whole
/// string as file.
fn split_caller(caller: &str) -> (&str, Option<u32>) {
    match caller.rsplit_once(':') {
        Some((file, line)) => match line.parse() {
            Ok(line) => (file, Some(line)),
            Err(_) => (caller, None),
        },
        None => (caller, None),
    }
}

fn hostname() -> String {
    let name = gethostname::gethostname().to_string_lossy().into_owned();
    if name.is_empty() {
        "localhost".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Read, thread, time::Duration};

    use flate2::read::GzDecoder;
    use serde_json::Value;

    use super::*;

    fn collector() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        socket
    }

    fn receive(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = vec![0u8; 65536];
        let len = socket.recv(&mut buf).unwrap();
        buf.truncate(len);
        buf
    }

    #[test]
    fn sends_gelf_message_with_facility() {
        let collector = collector();
        let address = collector.local_addr().unwrap().to_string();

        let mut writer = GelfWriter::new(&address).unwrap();
        writer.set_facility("billing");

        let record = LogRecord::new(Level::Error, "boom");
        writer.write_line(&record, r#"{"msg":"boom"}"#).unwrap();

        let message: Value = serde_json::from_slice(&receive(&collector)).unwrap();
        assert_eq!(message["version"], "1.1");
        assert_eq!(message["short_message"], r#"{"msg":"boom"}"#);
        assert_eq!(message["level"], 3);
        assert_eq!(message["_facility"], "billing");
        assert_eq!(message["host"], hostname());
        assert!(message.get("full_message").is_none());
        assert!(message.get("_file").is_none());
    }

    #[test]
    fn caller_becomes_file_and_line() {
        let collector = collector();
        let address = collector.local_addr().unwrap().to_string();

        let mut writer = GelfWriter::new(&address).unwrap();
        let record = LogRecord::new(Level::Warn, "slow").with_caller("src/api/orders.rs:88");
        writer.write_line(&record, "slow").unwrap();

        let message: Value = serde_json::from_slice(&receive(&collector)).unwrap();
        assert_eq!(message["_file"], "src/api/orders.rs");
        assert_eq!(message["_line"], 88);
    }

    #[test]
    fn splits_callers() {
        assert_eq!(split_caller("a.rs:12"), ("a.rs", Some(12)));
        assert_eq!(split_caller("a.rs"), ("a.rs", None));
        assert_eq!(split_caller("c:\\a.rs"), ("c:\\a.rs", None));
    }

    #[test]
    fn gzip_payloads_decompress_to_the_message() {
        let collector = collector();
        let address = collector.local_addr().unwrap().to_string();

        let mut writer = GelfWriter::new(&address).unwrap();
        writer.set_compression(GelfCompression::Gzip);
        writer
            .write_line(&LogRecord::new(Level::Info, "packed"), "packed")
            .unwrap();

        let datagram = receive(&collector);
        assert_eq!(&datagram[..2], &[0x1f, 0x8b]);
        let mut json = String::new();
        GzDecoder::new(&datagram[..])
            .read_to_string(&mut json)
            .unwrap();
        let message: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(message["short_message"], "packed");
    }

    #[test]
    fn flush_ignores_errors_from_a_dead_collector() {
        let address = {
            let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
            socket.local_addr().unwrap().to_string()
        };

        let mut writer = GelfWriter::new(&address).unwrap();
        let record = LogRecord::new(Level::Error, "nobody listens");
        writer.write_line(&record, "nobody listens").unwrap();
        thread::sleep(Duration::from_millis(200));

        assert!(LogWriter::flush(&mut writer).is_ok());
        assert!(Write::flush(&mut writer).is_ok());
    }

    #[test]
    fn multi_line_writes_keep_full_message() {
        let collector = collector();
        let address = collector.local_addr().unwrap().to_string();

        let mut writer = GelfWriter::new(&address).unwrap();
        writer.write_all(b"first\nsecond\n").unwrap();

        let message: Value = serde_json::from_slice(&receive(&collector)).unwrap();
        assert_eq!(message["short_message"], "first");
        assert_eq!(message["full_message"], "first\nsecond");
        assert_eq!(message["level"], 6);
        assert!(message.get("_facility").is_none());
    }

    #[test]
    fn large_payloads_are_chunked() {
        let payload = vec![b'x'; CHUNK_SIZE * 3];
        let datagrams = chunk(&payload).unwrap();

        assert_eq!(datagrams.len(), 4);
        let id = &datagrams[0][2..10];
        for (seq, datagram) in datagrams.iter().enumerate() {
            assert!(datagram.len() <= CHUNK_SIZE);
            assert_eq!(&datagram[..2], &CHUNK_MAGIC);
            assert_eq!(&datagram[2..10], id);
            assert_eq!(datagram[10] as usize, seq);
            assert_eq!(datagram[11], 4);
        }

        let joined: Vec<u8> = datagrams
            .iter()
            .flat_map(|d| d[CHUNK_HEADER_LEN..].iter().copied())
            .collect();
        assert_eq!(joined, payload);
    }

    #[test]
    fn oversized_payloads_are_dropped() {
        let payload = vec![b'x'; (CHUNK_SIZE - CHUNK_HEADER_LEN) * MAX_CHUNKS + 1];
        assert!(chunk(&payload).is_none());
    }

    #[test]
    fn unresolvable_address_is_an_error() {
        assert!(GelfWriter::new("not an address").is_err());
        assert!(GelfWriter::new("localhost").is_err());
    }
}
