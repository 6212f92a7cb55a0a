use std::{
    io::{self, BufRead, BufReader, Read, Write},
    net::TcpStream,
    string::FromUtf8Error,
};

use log::trace;
use thiserror::Error;

use super::Envelope;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("received line is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
    #[error("transport already ended")]
    Closed,
}

/// A duplex channel carrying one serialized message per line.
pub trait Transport {
    /// Write one line. The newline terminator is appended by the transport.
    fn send(&mut self, line: &str) -> Result<(), TransportError>;

    /// Block until the next line arrives; `None` once the peer has closed the stream.
    ///
    /// A line that is not UTF-8 is consumed and reported as
    /// [`TransportError::Encoding`]; the following line can still be received.
    fn receive(&mut self) -> Result<Option<String>, TransportError>;

    /// Stop writing. Later sends fail with [`TransportError::Closed`].
    fn end(&mut self) -> Result<(), TransportError>;

    fn send_envelope(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        let line = serde_json::to_string(envelope)?;
        self.send(&line)
    }
}

/// Opens transports for a client.
pub trait Connector {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// Newline-delimited transport over any byte stream.
pub struct LineTransport<T: Read + Write> {
    stream: BufReader<T>,
    ended: bool,
}

impl<T: Read + Write> LineTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream: BufReader::new(stream),
            ended: false,
        }
    }

    pub fn into_inner(self) -> T {
        self.stream.into_inner()
    }
}

impl<T: Read + Write> Transport for LineTransport<T> {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        if self.ended {
            return Err(TransportError::Closed);
        }

        trace!("sending: {line}");
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<String>, TransportError> {
        let mut bytes = Vec::new();
        if self.stream.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }

        let line = String::from_utf8(bytes)?;
        trace!("received: {}", line.trim_end());
        Ok(Some(line))
    }

    fn end(&mut self) -> Result<(), TransportError> {
        if !self.ended {
            self.ended = true;
            self.stream.get_mut().flush()?;
        }
        Ok(())
    }
}

/// Connects over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let stream = TcpStream::connect(endpoint)?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpTransport(LineTransport::new(stream))))
    }
}

struct TcpTransport(LineTransport<TcpStream>);

impl Transport for TcpTransport {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        self.0.send(line)
    }

    fn receive(&mut self) -> Result<Option<String>, TransportError> {
        self.0.receive()
    }

    fn end(&mut self) -> Result<(), TransportError> {
        self.0.end()?;
        self.0.stream.get_ref().shutdown(std::net::Shutdown::Write)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use crate::{correlation::Token, protocol::Command};

    use super::*;

    #[test]
    fn read_write_line() {
        let stream = Cursor::new(Vec::new());
        let mut transport = LineTransport::new(stream);

        transport
            .send_envelope(&Envelope::new(Command::Show, Token::from("t1")))
            .unwrap();
        transport
            .stream
            .get_mut()
            .seek(std::io::SeekFrom::Start(0))
            .unwrap();

        let line = transport.receive().unwrap().unwrap();
        assert_eq!(line, "{\"command\":\"SHOW\",\"token\":\"t1\"}\n");
        assert_eq!(transport.receive().unwrap(), None);
    }

    #[test]
    fn receive_splits_lines() {
        let stream = Cursor::new(b"{\"status\":\"a\"}\n{\"status\":\"b\"}\n".to_vec());
        let mut transport = LineTransport::new(stream);

        assert_eq!(transport.receive().unwrap().unwrap(), "{\"status\":\"a\"}\n");
        assert_eq!(transport.receive().unwrap().unwrap(), "{\"status\":\"b\"}\n");
        assert_eq!(transport.receive().unwrap(), None);
    }

    #[test]
    fn receive_skips_past_non_utf8_line() {
        let stream = Cursor::new(b"\xff\xfe garbage\n{\"status\":\"a\"}\n".to_vec());
        let mut transport = LineTransport::new(stream);

        let err = transport.receive().unwrap_err();
        assert!(matches!(err, TransportError::Encoding(_)));
        assert_eq!(transport.receive().unwrap().unwrap(), "{\"status\":\"a\"}\n");
        assert_eq!(transport.receive().unwrap(), None);
    }

    #[test]
    fn send_after_end() {
        let mut transport = LineTransport::new(Cursor::new(Vec::new()));

        transport.end().unwrap();
        let err = transport.send("{}").unwrap_err();

        assert!(matches!(err, TransportError::Closed));
        assert!(transport.into_inner().into_inner().is_empty());
    }
}
