use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use super::types::SmtpReply;

/// Deadline shared by the write and the reply of one command.
pub(crate) struct StepDeadline {
    expires_at: Instant,
}

impl StepDeadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
        }
    }

    fn remaining(&self) -> io::Result<Duration> {
        let left = self.expires_at.saturating_duration_since(Instant::now());
        if left.is_zero() {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no response before the step deadline",
            ))
        } else {
            Ok(left)
        }
    }
}

/// A plain TCP SMTP connection. Dropping it closes the socket, whatever state
/// the dialog ended in.
pub(crate) struct SmtpSession {
    stream: TcpStream,
    buffer: Vec<u8>,
    peer: SocketAddr,
}

impl SmtpSession {
    pub(crate) fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        Ok(Self {
            stream,
            buffer: Vec::new(),
            peer: addr,
        })
    }

    pub(crate) fn send(&mut self, command: &str, deadline: &StepDeadline) -> io::Result<()> {
        self.stream.set_write_timeout(Some(deadline.remaining()?))?;
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line)?;
        self.stream.flush()
    }

    pub(crate) fn read_reply(&mut self, deadline: &StepDeadline) -> io::Result<SmtpReply> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let raw = self.read_line(deadline)?;
            if raw.len() < 3 {
                return Err(invalid_data(format!("invalid SMTP reply: '{raw}'")));
            }
            let code_part = raw
                .get(..3)
                .ok_or_else(|| invalid_data(format!("invalid SMTP reply: '{raw}'")))?;
            let parsed_code = code_part
                .parse::<u16>()
                .map_err(|_| invalid_data(format!("invalid SMTP status code: '{code_part}'")))?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(invalid_data(format!(
                        "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            let text = raw.get(4..).unwrap_or_default().trim();
            if !text.is_empty() {
                message_lines.push(text.to_string());
            }
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| invalid_data("SMTP reply missing status code".into()))?,
            message: message_lines.join(" "),
        })
    }

    fn read_line(&mut self, deadline: &StepDeadline) -> io::Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            self.stream.set_read_timeout(Some(deadline.remaining()?))?;
            let mut buf = [0u8; 512];
            let read = self.stream.read(&mut buf)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        tracing::trace!(peer = %self.peer, "closing smtp connection");
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
