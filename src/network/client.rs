//! TCP Client
//!
//! Blocking client sending command envelopes and reading one response
//! object per command.

use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{MmpError, Result};
use crate::protocol::{read_objects, ObjectWriter, Parser, ProtocolObject, StreamWriter};

const READ_CHUNK_SIZE: usize = 8192;

/// Client connection to an mmpkv node
pub struct Client {
    reader: TcpStream,
    writer: StreamWriter<TcpStream>,
    parser: Parser,
    pending: Vec<ProtocolObject>,
    chunk: Vec<u8>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        Ok(Self {
            reader,
            writer: StreamWriter::new(stream),
            parser: Parser::new(),
            pending: Vec::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        })
    }

    /// Send one command and wait for its response
    pub fn request(
        &mut self,
        keyword: &str,
        parameters: &[ProtocolObject],
    ) -> Result<ProtocolObject> {
        self.writer.write_command(keyword, parameters)?;
        self.writer.flush()?;
        self.read_responses(1)?
            .pop()
            .ok_or_else(|| MmpError::Network("missing response".into()))
    }

    /// Send all commands in one write, then read their responses in order
    pub fn pipeline(
        &mut self,
        requests: &[(&str, &[ProtocolObject])],
    ) -> Result<Vec<ProtocolObject>> {
        for (keyword, parameters) in requests {
            self.writer.write_command(keyword, parameters)?;
        }
        self.writer.flush()?;
        self.read_responses(requests.len())
    }

    /// Send an arbitrary object without waiting for a response
    pub fn send_object(&mut self, object: ProtocolObject) -> Result<()> {
        self.writer.write_object(object)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Block until `count` response objects have arrived
    pub fn read_responses(&mut self, count: usize) -> Result<Vec<ProtocolObject>> {
        read_objects(
            &mut self.reader,
            &mut self.parser,
            &mut self.pending,
            &mut self.chunk,
            count,
        )
    }

    pub fn ping(&mut self) -> Result<ProtocolObject> {
        self.request("PING", &[])
    }
}
