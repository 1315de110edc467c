use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

/// Byte-level link to the base station.
///
/// `read_chunk` blocks for at most one read timeout and returns an empty
/// buffer when nothing arrived in that window.
pub trait ByteChannel: Send {
    fn flush_input(&mut self) -> io::Result<()>;
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn read_chunk(&mut self, max: usize) -> io::Result<Vec<u8>>;
    fn read_timeout(&self) -> Duration;
}

/// Base reached through a serial-to-TCP bridge.
pub struct TcpChannel {
    stream: TcpStream,
    read_timeout: Duration,
}

impl TcpChannel {
    pub fn connect(address: impl ToSocketAddrs, read_timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;
        log::info!("Connected to base at {}", stream.peer_addr()?);
        Ok(Self {
            stream,
            read_timeout,
        })
    }
}

impl ByteChannel for TcpChannel {
    fn flush_input(&mut self) -> io::Result<()> {
        self.stream.set_nonblocking(true)?;
        let mut discarded = 0usize;
        let mut buf = [0u8; 256];
        let result = loop {
            match self.stream.read(&mut buf) {
                Ok(0) => break Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => discarded += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        if discarded > 0 {
            log::debug!("Discarded {} stale bytes from base", discarded);
        }
        result
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn read_chunk(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        match self.stream.read(&mut buf) {
            Ok(0) => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}
