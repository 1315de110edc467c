use std::{io, time::Duration};

use super::{channel::ByteChannel, error::TransportError};

/// Upper bound on a single response.
pub const MAX_RESPONSE_LEN: usize = 200;

/// Menu selections understood by the base firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseCommand {
    StationFix,
    BeaconData,
    FlushQueue,
}

impl BaseCommand {
    pub fn token(&self) -> &'static [u8] {
        match self {
            BaseCommand::StationFix => b"1\r",
            BaseCommand::BeaconData => b"3\r",
            BaseCommand::FlushQueue => b"4\r",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseCommand::StationFix => "station fix",
            BaseCommand::BeaconData => "beacon data",
            BaseCommand::FlushQueue => "queue flush",
        }
    }
}

/// Command/response exchange over a byte channel.
pub struct Session<C> {
    channel: C,
}

impl<C: ByteChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Sends `command` once and waits up to `timeout` for the answer.
    ///
    /// Stale input is discarded first. Bytes are gathered until the line
    /// terminator arrives, the buffer is full, or the line goes quiet after
    /// some data was received. The command is never resent.
    pub fn request_response(
        &mut self,
        command: BaseCommand,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        self.channel.flush_input().map_err(map_io)?;
        self.channel.write_all(command.token()).map_err(map_io)?;
        log::debug!("Sent {} request", command.name());

        let attempts = read_attempts(timeout, self.channel.read_timeout());
        let mut buffer = Vec::new();
        for _ in 0..attempts {
            let chunk = self
                .channel
                .read_chunk(MAX_RESPONSE_LEN - buffer.len())
                .map_err(map_io)?;
            if chunk.is_empty() {
                if !buffer.is_empty() {
                    break;
                }
                continue;
            }
            buffer.extend_from_slice(&chunk);
            if buffer.ends_with(b"\r\n") || buffer.len() >= MAX_RESPONSE_LEN {
                break;
            }
        }

        if buffer.is_empty() {
            return Err(TransportError::Timeout {
                command: command.name(),
                timeout,
            });
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn read_attempts(timeout: Duration, read_timeout: Duration) -> u32 {
    if read_timeout.is_zero() {
        return 1;
    }
    let attempts = timeout.as_secs_f64() / read_timeout.as_secs_f64();
    (attempts.ceil() as u32).max(1)
}

fn map_io(err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::Closed
    } else {
        TransportError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::channel::tests::ScriptedChannel;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_command_tokens() {
        assert_eq!(BaseCommand::StationFix.token(), b"1\r");
        assert_eq!(BaseCommand::BeaconData.token(), b"3\r");
        assert_eq!(BaseCommand::FlushQueue.token(), b"4\r");
    }

    #[test]
    fn test_response_after_silence() {
        let channel = ScriptedChannel::new();
        channel.push_silence(3);
        channel.push("0\r\n");
        let mut session = Session::new(channel.clone());

        let resp = session
            .request_response(BaseCommand::BeaconData, TIMEOUT)
            .unwrap();
        assert_eq!(resp, "0\r\n");
        assert_eq!(channel.written_commands(), vec!["3\r".to_string()]);
        assert_eq!(*channel.flushes.lock().unwrap(), 1, "input should be flushed first");
    }

    #[test]
    fn test_response_split_across_reads() {
        let channel = ScriptedChannel::new();
        channel.push("20180115120000,51.5,");
        channel.push("-0.1,10,0,0,1.0,7\r\n");
        channel.push("leftover");
        let mut session = Session::new(channel.clone());

        let resp = session
            .request_response(BaseCommand::StationFix, TIMEOUT)
            .unwrap();
        assert_eq!(resp, "20180115120000,51.5,-0.1,10,0,0,1.0,7\r\n");
        assert_eq!(channel.remaining_reads(), 1, "should stop at the terminator");
    }

    #[test]
    fn test_unterminated_response_ends_on_quiet_line() {
        let channel = ScriptedChannel::new();
        channel.push("ERROR");
        channel.push_silence(1);
        channel.push("late");
        let mut session = Session::new(channel.clone());

        let resp = session
            .request_response(BaseCommand::StationFix, TIMEOUT)
            .unwrap();
        assert_eq!(resp, "ERROR");
    }

    #[test]
    fn test_timeout_sends_once() {
        let channel = ScriptedChannel::new();
        // 2 s at 250 ms per read is 8 attempts.
        channel.push_silence(8);
        channel.push("too late\r\n");
        let mut session = Session::new(channel.clone());

        let err = session
            .request_response(BaseCommand::FlushQueue, TIMEOUT)
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
        assert_eq!(channel.written_commands().len(), 1, "command must not be resent");
        assert_eq!(channel.remaining_reads(), 1);
    }

    #[test]
    fn test_closed_channel() {
        let channel = ScriptedChannel::new();
        channel.push_error(io::ErrorKind::UnexpectedEof);
        let mut session = Session::new(channel);

        let err = session
            .request_response(BaseCommand::StationFix, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn test_read_attempts() {
        let rt = Duration::from_millis(250);
        assert_eq!(read_attempts(Duration::from_secs(35), rt), 140);
        assert_eq!(read_attempts(Duration::from_millis(300), rt), 2);
        assert_eq!(read_attempts(Duration::ZERO, rt), 1);
    }
}
