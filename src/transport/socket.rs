//! TCP socket transport: APDU bytes exchanged verbatim, with no DLE
//! framing and no ACK/NAK handshake — the APDU's own length field
//! delimits each message, and TCP is trusted for its own flow control
//! (spec §4.6, §9 open question (a)).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::{debug, trace, trace_span};

use super::Transport;
use crate::errors::{Error, Result};

pub struct SocketTransport {
    stream: TcpStream,
    host: String,
    port: u16,
    insert_delays: bool,
}

impl SocketTransport {
    pub fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let span = trace_span!("socket_connect", host, port);
        let _enter = span.enter();

        let addr = format!("{host}:{port}");
        let socket_addr = addr
            .parse()
            .map_err(|e| Error::TransportConnectionFailed(format!("{addr}: {e}")))?;
        let stream = TcpStream::connect_timeout(&socket_addr, connect_timeout)
            .map_err(|e| Error::TransportConnectionFailed(format!("{addr}: {e}")))?;
        stream.set_nodelay(true).map_err(Error::Io)?;

        debug!(host, port, "socket transport connected");
        Ok(Self {
            stream,
            host: host.to_string(),
            port,
            insert_delays: false,
        })
    }

    pub fn with_insert_delays(mut self, insert_delays: bool) -> Self {
        self.insert_delays = insert_delays;
        self
    }

    /// Reads exactly the header-plus-length-prefixed bytes of one APDU off
    /// the stream: two header bytes, then the one- or three-byte length
    /// field, then that many body bytes.
    fn read_one_apdu(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut header = [0u8; 2];
        self.stream.read_exact(&mut header)?;
        out.extend_from_slice(&header);

        let mut len_byte = [0u8; 1];
        self.stream.read_exact(&mut len_byte)?;
        out.push(len_byte[0]);

        let body_len = if len_byte[0] != 0xFF {
            len_byte[0] as usize
        } else {
            let mut ext = [0u8; 2];
            self.stream.read_exact(&mut ext)?;
            out.extend_from_slice(&ext);
            (ext[0] as usize) | ((ext[1] as usize) << 8)
        };

        let mut body = vec![0u8; body_len];
        self.stream.read_exact(&mut body)?;
        out.extend_from_slice(&body);
        Ok(out)
    }
}

impl Transport for SocketTransport {
    fn send_apdu(&mut self, apdu_bytes: &[u8]) -> Result<()> {
        trace!(len = apdu_bytes.len(), "socket TX");
        self.stream.write_all(apdu_bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv_apdu(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.stream.set_read_timeout(Some(timeout)).map_err(Error::Io)?;
        match self.read_one_apdu() {
            Ok(bytes) => {
                trace!(len = bytes.len(), "socket RX");
                Ok(bytes)
            }
            Err(Error::Io(e))
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Err(Error::Timeout(timeout))
            }
            Err(e) => Err(e),
        }
    }

    fn reset(&mut self) -> Result<()> {
        debug!(host = self.host, port = self.port, "resetting socket transport");
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        *self = Self::connect(&self.host, self.port, Duration::from_secs(5))?
            .with_insert_delays(self.insert_delays);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(host = self.host, port = self.port, "closing socket transport");
        self.stream.shutdown(std::net::Shutdown::Both).map_err(Error::Io)
    }

    fn insert_delays(&self) -> bool {
        self.insert_delays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn round_trips_one_apdu_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut header = [0u8; 3];
            stream.read_exact(&mut header).unwrap();
            let mut body = vec![0u8; header[2] as usize];
            stream.read_exact(&mut body).unwrap();
            stream.write_all(&[0x06, 0x0F, 0x00]).unwrap();
        });

        let mut transport =
            SocketTransport::connect("127.0.0.1", addr.port(), Duration::from_secs(1)).unwrap();
        transport.send_apdu(&[0x06, 0x00, 0x00]).unwrap();
        let resp = transport.recv_apdu(Duration::from_secs(1)).unwrap();
        assert_eq!(resp, vec![0x06, 0x0F, 0x00]);
        handle.join().unwrap();
    }
}
