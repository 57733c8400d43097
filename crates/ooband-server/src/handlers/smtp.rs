// ============================================
// File: crates/ooband-server/src/handlers/smtp.rs
// ============================================
//! # SMTP Listener
//!
//! ## Creation Reason
//! Targets that send mail to a generated address prove outbound SMTP.
//! This listener speaks just enough ESMTP to receive the message and
//! hand the envelope to the interaction pipeline.
//!
//! ## Dialogue
//! ```text
//! S: 220 <domain> ESMTP
//! C: EHLO x            S: 250-<domain> / 250-SIZE / 250-AUTH / 250 8BITMIME
//! C: MAIL FROM:<a@b>   S: 250 OK
//! C: RCPT TO:<c@d>     S: 250 OK            (every recipient accepted)
//! C: DATA              S: 354 ...
//! C: ... .             S: 250 OK            (capture happens here)
//! C: QUIT              S: 221 Bye
//! ```
//! Also handled: `HELO`, `RSET`, `NOOP`, `VRFY` (252), `AUTH PLAIN/LOGIN`
//! (any credentials), `STARTTLS` (454).
//!
//! ## ⚠️ Important Note for Next Developer
//! - The `250 OK` after DATA never depends on correlation
//! - Messages above the size cap are refused with 552 and not captured
//! - Lines past `MAX_LINE_BYTES` are cut and the overflow dropped; a cut
//!   command gets 500 and a cut DATA line makes the message oversized

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ooband_core::protocol::Protocol;

use crate::handlers::interaction::{Capture, InteractionHandler};

/// Idle time allowed between client lines.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Longest command line accepted (RFC 5321 allows 512 with CRLF).
const MAX_LINE_BYTES: u64 = 4096;

// ============================================
// SmtpListener
// ============================================

/// Minimal ESMTP receiver.
#[derive(Debug, Clone)]
pub struct SmtpListener {
    handler: InteractionHandler,
    domain: String,
    max_message_bytes: usize,
}

#[derive(Debug, Default)]
struct Envelope {
    from: Option<String>,
    recipients: Vec<String>,
}

impl Envelope {
    fn reset(&mut self) {
        self.from = None;
        self.recipients.clear();
    }
}

impl SmtpListener {
    /// Creates a listener announcing `domain`.
    #[must_use]
    pub fn new(handler: InteractionHandler, domain: impl Into<String>, max_message_bytes: usize) -> Self {
        Self {
            handler,
            domain: domain.into(),
            max_message_bytes,
        }
    }

    /// Accepts connections until `shutdown` fires.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) {
        let local = listener.local_addr().ok();
        info!(addr = ?local, "SMTP listener started");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = this.run_session(stream, peer).await {
                                debug!(peer = %peer, error = %e, "SMTP session ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "SMTP accept failed"),
                },
                _ = shutdown.recv() => {
                    info!(addr = ?local, "SMTP listener shutting down");
                    break;
                }
            }
        }
    }

    /// Runs one SMTP dialogue over `stream`.
    ///
    /// # Errors
    /// Returns the I/O error that ended the session.
    pub async fn run_session<S>(&self, stream: S, peer: SocketAddr) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut envelope = Envelope::default();

        reply(&mut writer, &format!("220 {} ESMTP ready", self.domain)).await?;

        while let Some(line) = read_line(&mut reader).await? {
            if line.truncated {
                reply(&mut writer, "500 Line too long").await?;
                continue;
            }
            let (verb, arg) = split_command(&line.text);

            match verb.as_str() {
                "HELO" => reply(&mut writer, &format!("250 {}", self.domain)).await?,
                "EHLO" => {
                    let lines = format!(
                        "250-{}\r\n250-SIZE {}\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME",
                        self.domain, self.max_message_bytes
                    );
                    reply(&mut writer, &lines).await?;
                }
                "MAIL" => {
                    envelope.reset();
                    envelope.from = Some(parse_path(arg));
                    reply(&mut writer, "250 OK").await?;
                }
                "RCPT" => {
                    if envelope.from.is_none() {
                        reply(&mut writer, "503 Need MAIL before RCPT").await?;
                    } else {
                        envelope.recipients.push(parse_path(arg));
                        reply(&mut writer, "250 OK").await?;
                    }
                }
                "DATA" => {
                    if envelope.recipients.is_empty() {
                        reply(&mut writer, "503 Need RCPT before DATA").await?;
                        continue;
                    }
                    reply(&mut writer, "354 End data with <CR><LF>.<CR><LF>").await?;

                    match read_data(&mut reader, self.max_message_bytes).await? {
                        Some(message) => {
                            self.capture(peer, &envelope, message).await;
                            reply(&mut writer, "250 OK").await?;
                        }
                        None => {
                            debug!(peer = %peer, "SMTP message over size limit");
                            reply(&mut writer, "552 Message size exceeds limit").await?;
                        }
                    }
                    envelope.reset();
                }
                "RSET" => {
                    envelope.reset();
                    reply(&mut writer, "250 OK").await?;
                }
                "NOOP" => reply(&mut writer, "250 OK").await?,
                "VRFY" => reply(&mut writer, "252 Cannot VRFY user, but will accept message").await?,
                "AUTH" => authenticate(&mut reader, &mut writer, arg).await?,
                "STARTTLS" => reply(&mut writer, "454 TLS not available").await?,
                "QUIT" => {
                    reply(&mut writer, "221 Bye").await?;
                    break;
                }
                _ => reply(&mut writer, "502 Command not implemented").await?,
            }
        }

        writer.shutdown().await.ok();
        Ok(())
    }

    async fn capture(&self, peer: SocketAddr, envelope: &Envelope, message: String) {
        let mut capture = Capture::new(Protocol::Smtp, peer, message);
        capture.from = envelope.from.clone().unwrap_or_default();
        capture.candidates = envelope.recipients.clone();
        capture.to = envelope.recipients.clone();

        let outcome = self.handler.handle(capture).await;
        debug!(peer = %peer, ?outcome, "SMTP message processed");
    }
}

// ============================================
// Line Helpers
// ============================================

async fn reply<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}

/// Accepts any `AUTH PLAIN` or `AUTH LOGIN` credentials.
async fn authenticate<R, W>(reader: &mut R, writer: &mut W, arg: &str) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut parts = arg.split_whitespace();
    let mechanism = parts.next().unwrap_or_default().to_ascii_uppercase();
    let initial = parts.next();

    match mechanism.as_str() {
        "PLAIN" => {
            if initial.is_none() {
                reply(writer, "334 ").await?;
                read_line(reader).await?;
            }
        }
        "LOGIN" => {
            if initial.is_none() {
                reply(writer, "334 VXNlcm5hbWU6").await?;
                read_line(reader).await?;
            }
            reply(writer, "334 UGFzc3dvcmQ6").await?;
            read_line(reader).await?;
        }
        _ => return reply(writer, "504 Unrecognized authentication type").await,
    }
    reply(writer, "235 Authentication successful").await
}

/// One client line with its terminator removed.
#[derive(Debug)]
struct Line {
    text: String,
    /// The line ran past [`MAX_LINE_BYTES`] or hit EOF before `\n`.
    truncated: bool,
}

/// Reads one line without its terminator; `None` at EOF.
///
/// A line longer than [`MAX_LINE_BYTES`] is cut there and the remainder,
/// up to and including the next `\n`, is discarded, so an overflow chunk
/// never surfaces as a line of its own.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<Line>> {
    let mut buf = Vec::new();
    let read = tokio::time::timeout(
        COMMAND_TIMEOUT,
        (&mut *reader).take(MAX_LINE_BYTES).read_until(b'\n', &mut buf),
    )
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "SMTP client idle"))??;

    if read == 0 {
        return Ok(None);
    }

    let truncated = buf.last() != Some(&b'\n');
    if truncated {
        tokio::time::timeout(COMMAND_TIMEOUT, discard_rest_of_line(reader))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "SMTP client idle"))??;
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(Line {
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated,
    }))
}

/// Consumes input up to and including the next `\n`, or until EOF.
async fn discard_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let (consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}

/// Reads a dot-terminated message, undoing dot-stuffing.
///
/// Returns `None` when the message exceeds `limit` or carries a line
/// longer than [`MAX_LINE_BYTES`]; the rest of it is still consumed so
/// the dialogue stays in sync. Only a complete line can end the message.
async fn read_data<R: AsyncBufRead + Unpin>(reader: &mut R, limit: usize) -> io::Result<Option<String>> {
    let mut message = String::new();
    let mut oversized = false;

    loop {
        let Some(line) = read_line(reader).await? else {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF inside DATA"));
        };
        if line.truncated {
            oversized = true;
            continue;
        }
        if line.text == "." {
            break;
        }
        let text = line.text.strip_prefix('.').unwrap_or(&line.text);

        if message.len() + text.len() + 2 > limit {
            oversized = true;
        }
        if !oversized {
            message.push_str(text);
            message.push_str("\r\n");
        }
    }

    Ok((!oversized).then_some(message))
}

fn split_command(line: &str) -> (String, &str) {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    (verb.to_ascii_uppercase(), rest.trim())
}

/// Extracts the address from `FROM:<a@b> SIZE=1` or `TO:<c@d>`.
fn parse_path(arg: &str) -> String {
    let path = arg.split_once(':').map_or(arg, |(_, rest)| rest).trim();
    match path.strip_prefix('<') {
        Some(inner) => inner.split('>').next().unwrap_or_default().to_owned(),
        None => path.split_whitespace().next().unwrap_or_default().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::io::{duplex, DuplexStream};

    use ooband_common::CorrelationId;
    use ooband_core::crypto::ClientKeyPair;
    use ooband_core::protocol::identifier::{mint, IdentifierVariant};
    use ooband_core::protocol::Callback;

    use crate::error::Result;
    use crate::services::{
        CallbackBinding, CallbackEngine, CorrelationStore, DslEvaluator, MemoryStore, SessionRegistry,
    };

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CallbackBinding>>,
    }

    impl DslEvaluator for Recorder {
        fn evaluate_predicate(&self, _expr: &str, _binding: &CallbackBinding) -> Result<bool> {
            Ok(true)
        }

        fn execute_action(&self, _code: &str, binding: &CallbackBinding) -> Result<()> {
            self.seen.lock().push(binding.clone());
            Ok(())
        }
    }

    struct Harness {
        listener: SmtpListener,
        store: Arc<MemoryStore>,
        recorder: Arc<Recorder>,
        cid: CorrelationId,
    }

    fn harness(max_message_bytes: usize) -> Harness {
        let registry = Arc::new(SessionRegistry::new(10, 8, Duration::from_secs(60)));
        let store = Arc::new(MemoryStore::new(registry, Duration::from_secs(60), 100));
        let recorder = Arc::new(Recorder::default());
        let engine = CallbackEngine::new(recorder.clone(), Duration::from_secs(1));
        let handler = InteractionHandler::new(store.clone(), engine, 33);

        let cid = CorrelationId::generate();
        store
            .registry()
            .register(
                cid.clone(),
                ClientKeyPair::generate().public_key(),
                false,
                vec![Callback::new("true", "record")],
            )
            .unwrap();

        Harness {
            listener: SmtpListener::new(handler, "oob.test", max_message_bytes),
            store,
            recorder,
            cid,
        }
    }

    async fn converse(listener: &SmtpListener, script: &str) -> String {
        let (client, server): (DuplexStream, DuplexStream) = duplex(64 * 1024);
        let peer: SocketAddr = "203.0.113.9:2525".parse().unwrap();

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(script.as_bytes()).await.unwrap();

        listener.run_session(server, peer).await.unwrap();

        let mut transcript = String::new();
        client_read.read_to_string(&mut transcript).await.unwrap();
        transcript
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("FROM:<a@b.test> SIZE=10"), "a@b.test");
        assert_eq!(parse_path("TO: <c@d.test>"), "c@d.test");
        assert_eq!(parse_path("TO:e@f.test"), "e@f.test");
        assert_eq!(parse_path("FROM:<>"), "");
    }

    #[test]
    fn test_split_command_is_case_insensitive() {
        assert_eq!(split_command("ehlo client"), ("EHLO".to_owned(), "client"));
        assert_eq!(split_command("QUIT"), ("QUIT".to_owned(), ""));
    }

    #[tokio::test]
    async fn test_full_dialogue_captures_message() {
        let h = harness(1024 * 1024);
        let label = mint(&h.cid, IdentifierVariant::Extended);
        let script = format!(
            "EHLO scanner\r\nMAIL FROM:<sender@outside.test>\r\nRCPT TO:<user@{label}.oob.test>\r\n\
             DATA\r\nSubject: hi\r\n\r\n..leading dot\r\n.\r\nQUIT\r\n"
        );

        let transcript = converse(&h.listener, &script).await;

        assert!(transcript.starts_with("220 oob.test"));
        assert!(transcript.contains("250-SIZE 1048576"));
        assert!(transcript.contains("354 "));
        assert!(transcript.ends_with("221 Bye\r\n"));

        let seen = h.recorder.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].from, "sender@outside.test");
        assert_eq!(seen[0].to, vec![format!("user@{label}.oob.test")]);
        assert_eq!(seen[0].remote_addr, "203.0.113.9:2525");
        assert!(seen[0].data.contains("\r\n.leading dot\r\n"));
        drop(seen);

        assert_eq!(h.store.take(h.cid.as_str()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_recipient_still_gets_250() {
        let h = harness(1024 * 1024);
        let script = "HELO x\r\nMAIL FROM:<a@b.test>\r\nRCPT TO:<user@short.domain.com>\r\n\
                      DATA\r\nbody\r\n.\r\nQUIT\r\n";

        let transcript = converse(&h.listener, script).await;

        assert_eq!(transcript.matches("250 OK").count(), 3);
        assert!(h.recorder.seen.lock().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_sequence_errors_and_misc_commands() {
        let h = harness(1024 * 1024);
        let script = "RCPT TO:<a@b.test>\r\nDATA\r\nVRFY root\r\nSTARTTLS\r\nNOOP\r\nRSET\r\n\
                      AUTH PLAIN AGFiYwBkZWY=\r\nAUTH LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\nBOGUS\r\nQUIT\r\n";

        let transcript = converse(&h.listener, script).await;

        assert!(transcript.contains("503 Need MAIL before RCPT"));
        assert!(transcript.contains("503 Need RCPT before DATA"));
        assert!(transcript.contains("252 "));
        assert!(transcript.contains("454 TLS not available"));
        assert_eq!(transcript.matches("235 ").count(), 2);
        assert!(transcript.contains("502 Command not implemented"));
    }

    #[tokio::test]
    async fn test_oversized_message_is_refused() {
        let h = harness(1024);
        let label = mint(&h.cid, IdentifierVariant::Extended);
        let body = "x".repeat(2000);
        let script = format!(
            "HELO x\r\nMAIL FROM:<a@b.test>\r\nRCPT TO:<u@{label}.oob.test>\r\n\
             DATA\r\n{body}\r\n.\r\nQUIT\r\n"
        );

        let transcript = converse(&h.listener, &script).await;

        assert!(transcript.contains("552 "));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_data_line_cannot_end_message() {
        let h = harness(1024 * 1024);
        let label = mint(&h.cid, IdentifierVariant::Extended);
        let overlong = format!("{}.", "x".repeat(4096));
        let script = format!(
            "HELO x\r\nMAIL FROM:<a@b.test>\r\nRCPT TO:<u@{label}.oob.test>\r\n\
             DATA\r\nline one\r\n{overlong}\r\nRSET\r\nafter\r\n.\r\nQUIT\r\n"
        );

        let transcript = converse(&h.listener, &script).await;

        let after_data = transcript.split("354 ").nth(1).unwrap();
        assert_eq!(
            after_data.lines().skip(1).collect::<Vec<_>>(),
            vec!["552 Message size exceeds limit", "221 Bye"]
        );
        assert!(!transcript.contains("502 "));
        assert!(h.recorder.seen.lock().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_command_is_rejected_whole() {
        let h = harness(1024 * 1024);
        let script = format!("NOOP {}QUIT\r\nNOOP\r\nQUIT\r\n", "y".repeat(5000));

        let transcript = converse(&h.listener, &script).await;

        let replies: Vec<_> = transcript.lines().skip(1).collect();
        assert_eq!(replies, vec!["500 Line too long", "250 OK", "221 Bye"]);
    }

    #[tokio::test]
    async fn test_read_line_discards_overflow() {
        let input = format!("{}\r\nnext\r\n", "z".repeat(6000));
        let mut reader = BufReader::new(input.as_bytes());

        let first = read_line(&mut reader).await.unwrap().unwrap();
        assert!(first.truncated);
        assert_eq!(first.text.len(), 4096);

        let second = read_line(&mut reader).await.unwrap().unwrap();
        assert!(!second.truncated);
        assert_eq!(second.text, "next");

        assert!(read_line(&mut reader).await.unwrap().is_none());
    }
}
