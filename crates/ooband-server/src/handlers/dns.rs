// ============================================
// File: crates/ooband-server/src/handlers/dns.rs
// ============================================
//! # DNS Listener
//!
//! ## Creation Reason
//! Name resolution is the most common out-of-band signal: a target that
//! only looks up a generated hostname has still reached out. This
//! listener answers authoritatively for the configured domain and feeds
//! every question to the interaction pipeline.
//!
//! ## Answering Rules
//! | Query name           | Type     | Answer                      |
//! |----------------------|----------|-----------------------------|
//! | under `domain`       | A / ANY  | `A public_ip`               |
//! | under `domain`       | other    | NOERROR, no records         |
//! | anything else        | any      | NXDOMAIN                    |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Datagrams are handled inline on the socket task; keep `respond` cheap
//! - Undecodable datagrams are dropped without a reply

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record, RecordType};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use ooband_core::protocol::Protocol;
use ooband_transport::Transport;

use crate::handlers::interaction::{Capture, InteractionHandler};

/// Largest datagram read.
const MAX_DATAGRAM: usize = 4096;

/// TTL on synthesized records.
const ANSWER_TTL: u32 = 60;

// ============================================
// DnsListener
// ============================================

/// Authoritative responder for the capture domain.
#[derive(Debug, Clone)]
pub struct DnsListener {
    handler: InteractionHandler,
    domain: String,
    public_ip: Ipv4Addr,
}

impl DnsListener {
    /// Creates a listener for `domain` answering with `public_ip`.
    #[must_use]
    pub fn new(handler: InteractionHandler, domain: &str, public_ip: Ipv4Addr) -> Self {
        Self {
            handler,
            domain: domain.trim_end_matches('.').to_ascii_lowercase(),
            public_ip,
        }
    }

    /// Serves datagrams from `transport` until `shutdown` fires.
    pub async fn serve(
        self: Arc<Self>,
        transport: Arc<dyn Transport>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(addr = ?transport.local_addr().ok(), domain = %self.domain, "DNS listener started");
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                received = transport.recv(&mut buf) => match received {
                    Ok((len, source)) => {
                        if let Some(reply) = self.respond(&buf[..len], source.addr).await {
                            if let Err(e) = transport.send(&reply, &source.addr).await {
                                debug!(peer = %source.addr, error = %e, "DNS reply failed");
                            }
                        }
                    }
                    Err(e) => {
                        if !transport.is_active() {
                            break;
                        }
                        warn!(error = %e, "DNS receive failed");
                    }
                },
                _ = shutdown.recv() => {
                    info!("DNS listener shutting down");
                    break;
                }
            }
        }
    }

    /// Builds the reply for one datagram and captures its questions.
    pub async fn respond(&self, packet: &[u8], peer: SocketAddr) -> Option<Vec<u8>> {
        let request = match Message::from_vec(packet) {
            Ok(message) => message,
            Err(e) => {
                trace!(peer = %peer, error = %e, "Undecodable DNS datagram");
                return None;
            }
        };
        if request.message_type() != MessageType::Query {
            return None;
        }

        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_authoritative(true)
            .set_recursion_desired(request.recursion_desired());
        response.add_queries(request.queries().iter().cloned());

        let mut in_zone = false;
        for query in request.queries() {
            let qname = normalize(&query.name().to_ascii());
            if !self.in_zone(&qname) {
                continue;
            }
            in_zone = true;
            if matches!(query.query_type(), RecordType::A | RecordType::ANY) {
                response.add_answer(Record::from_rdata(
                    query.name().clone(),
                    ANSWER_TTL,
                    RData::A(A(self.public_ip)),
                ));
            }
        }
        if !in_zone {
            response.set_response_code(ResponseCode::NXDomain);
        }

        let raw_request = request.to_string();
        let raw_response = response.to_string();
        for query in request.queries() {
            let qname = normalize(&query.name().to_ascii());
            let mut capture = Capture::new(Protocol::Dns, peer, raw_request.clone());
            capture.raw_response = Some(raw_response.clone());
            capture.candidates = vec![qname.clone()];
            capture.to = vec![qname];
            capture.q_type = Some(query.query_type().to_string());

            let outcome = self.handler.handle(capture).await;
            trace!(peer = %peer, ?outcome, "DNS question processed");
        }

        match response.to_vec() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Failed to encode DNS response");
                None
            }
        }
    }

    fn in_zone(&self, qname: &str) -> bool {
        qname == self.domain
            || qname
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}
