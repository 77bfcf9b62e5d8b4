use std::net::{Ipv4Addr, SocketAddr};

use tracing::{debug, trace};

use super::session::{SmtpSession, StepDeadline};
use super::types::{
    SessionState, SmtpClientError, SmtpConnectionConfig, SmtpErrorStage, SmtpReply,
};

/// Drives one `greeting → EHLO/HELO → MAIL FROM → RCPT TO` dialog against a
/// single IPv4 host. The client never sends `DATA` or `QUIT`; the socket is
/// closed when the session goes out of scope.
pub struct SmtpClient<'a> {
    configuration: &'a SmtpConnectionConfig,
    state: SessionState,
    errors: Vec<SmtpClientError>,
}

impl<'a> SmtpClient<'a> {
    pub fn new(configuration: &'a SmtpConnectionConfig) -> Self {
        Self {
            configuration,
            state: SessionState::Init,
            errors: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn errors(&self) -> &[SmtpClientError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SmtpClientError> {
        self.errors
    }

    /// Returns `true` when the server accepted `RCPT TO:<target_email>`.
    /// Any failure is recorded in [`errors`](Self::errors).
    pub fn run_session(&mut self, target_host: &str, target_email: &str) -> bool {
        match self.dialog(target_host, target_email) {
            Ok(()) => {
                self.state = SessionState::Done;
                debug!(host = target_host, "recipient accepted");
                true
            }
            Err(err) => {
                debug!(
                    host = target_host,
                    state = ?self.state,
                    error = %err,
                    "smtp session failed"
                );
                self.errors.push(err);
                false
            }
        }
    }

    fn dialog(&mut self, target_host: &str, target_email: &str) -> Result<(), SmtpClientError> {
        let ip: Ipv4Addr = target_host.parse().map_err(|_| {
            SmtpClientError::new(
                SmtpErrorStage::Connection,
                format!("{target_host} is not an ipv4 address"),
            )
        })?;
        let addr = SocketAddr::from((ip, self.configuration.target_port));

        let mut session = SmtpSession::connect(addr, self.configuration.connection_timeout)
            .map_err(|err| SmtpClientError::new(SmtpErrorStage::Connection, err.to_string()))?;
        self.state = SessionState::Connected;

        let step = StepDeadline::after(self.configuration.response_timeout);
        let greeting = session
            .read_reply(&step)
            .map_err(|err| SmtpClientError::from_io(SmtpErrorStage::Connection, &err))?;
        trace!(code = greeting.code, message = %greeting.message, "smtp greeting");
        if !greeting.is_positive_completion() {
            return Err(SmtpClientError::new(
                SmtpErrorStage::Connection,
                greeting.to_string(),
            ));
        }

        self.hello(&mut session)?;

        let mail_from = format!("MAIL FROM:<{}>", self.configuration.verifier_email);
        let reply = self.exchange(
            &mut session,
            &mail_from,
            SmtpErrorStage::MailFrom,
            SessionState::MailFromSent,
        )?;
        expect_positive(reply, SmtpErrorStage::MailFrom)?;

        let rcpt_to = format!("RCPT TO:<{target_email}>");
        let reply = self.exchange(
            &mut session,
            &rcpt_to,
            SmtpErrorStage::RcptTo,
            SessionState::RcptToSent,
        )?;
        expect_positive(reply, SmtpErrorStage::RcptTo)
    }

    /// `EHLO` first; a permanent rejection falls back to `HELO`.
    fn hello(&mut self, session: &mut SmtpSession) -> Result<(), SmtpClientError> {
        let ehlo = format!("EHLO {}", self.configuration.verifier_domain);
        let reply = self.exchange(
            session,
            &ehlo,
            SmtpErrorStage::Hello,
            SessionState::HeloSent,
        )?;
        if reply.is_positive_completion() {
            return Ok(());
        }
        if !reply.is_permanent_failure() {
            return Err(SmtpClientError::new(SmtpErrorStage::Hello, reply.to_string()));
        }

        trace!(reply = %reply, "EHLO refused, trying HELO");
        let helo = format!("HELO {}", self.configuration.verifier_domain);
        let reply = self.exchange(
            session,
            &helo,
            SmtpErrorStage::Hello,
            SessionState::HeloSent,
        )?;
        expect_positive(reply, SmtpErrorStage::Hello)
    }

    fn exchange(
        &mut self,
        session: &mut SmtpSession,
        command: &str,
        stage: SmtpErrorStage,
        sent: SessionState,
    ) -> Result<SmtpReply, SmtpClientError> {
        let step = StepDeadline::after(self.configuration.response_timeout);
        trace!(command, "smtp >");
        session
            .send(command, &step)
            .map_err(|err| SmtpClientError::from_io(stage, &err))?;
        self.state = sent;
        let reply = session
            .read_reply(&step)
            .map_err(|err| SmtpClientError::from_io(stage, &err))?;
        trace!(code = reply.code, message = %reply.message, "smtp <");
        Ok(reply)
    }
}

fn expect_positive(reply: SmtpReply, stage: SmtpErrorStage) -> Result<(), SmtpClientError> {
    if reply.is_positive_completion() {
        Ok(())
    } else {
        Err(SmtpClientError::new(stage, reply.to_string()))
    }
}
