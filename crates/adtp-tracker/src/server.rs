//! The tracker server: accept loop, per-connection request handling,
//! authentication, integrity checks, and delegate dispatch.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use prost::Message;
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use adtp_crypto::{open_envelope, Address, Identity, SignedMessage};
use adtp_net::{recv_envelope, send_envelope};
use adtp_proto::{ErrorBody, ErrorCode, TrackerQuery, TrackerRegister};
use adtp_proto::{ERROR_CODE, QUERY_CODE, REGISTRATION_CODE};

use crate::delegate::{TrackerDelegate, TrackerFault};

/// A directory server authoritative over the records registered with it.
///
/// Each connection carries one request and at most one response. A failed
/// request produces a typed error envelope; the server never terminates
/// because of a single bad connection.
#[derive(Clone)]
pub struct Tracker {
    identity: Arc<Identity>,
    delegate: Arc<dyn TrackerDelegate>,
}

impl Tracker {
    pub fn new(identity: Arc<Identity>, delegate: Arc<dyn TrackerDelegate>) -> Self {
        Self { identity, delegate }
    }

    /// The tracker's own address.
    pub fn address(&self) -> &Address {
        self.identity.address()
    }

    /// Bind on `:port` and serve until the accept loop fails.
    pub async fn start_server(&self, port: u16) -> std::io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        self.delegate
            .log_message(&["starting tracker on port", &port.to_string()]);
        self.serve(listener).await;
        Ok(())
    }

    /// Accept loop over an already-bound listener. Accept failures are
    /// reported to the delegate and terminate the loop.
    pub async fn serve(&self, listener: TcpListener) {
        self.delegate.log_message(&["tracker is running"]);
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let tracker = self.clone();
                    tokio::spawn(async move {
                        tracker.handle_client(stream, peer).await;
                    });
                }
                Err(err) => {
                    self.fault("accepting new client", &err);
                    return;
                }
            }
        }
    }

    async fn handle_client(&self, mut stream: TcpStream, peer: SocketAddr) {
        let peer_label = peer.to_string();
        self.delegate.log_message(&["serving", &peer_label]);
        let started = Instant::now();

        self.handle_request(&mut stream).await;

        self.delegate.log_message(&[
            "finished with",
            &peer_label,
            "in",
            &format!("{:?}", started.elapsed()),
        ]);
        // The stream drops here, closing the connection on all exit paths.
    }

    async fn handle_request(&self, stream: &mut TcpStream) {
        let envelope = match recv_envelope(stream).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                self.fault("reading in message", &"connection closed before a request");
                return;
            }
            Err(err) => {
                self.fault("reading in message", &err);
                self.send_error(stream, "", ErrorCode::UnexpectedError, "unable to read message")
                    .await;
                return;
            }
        };

        let signed = match open_envelope(&envelope, &self.identity) {
            Ok(signed) => signed,
            Err(err) => {
                self.fault("decrypting message", &err);
                self.send_error(
                    stream,
                    "",
                    ErrorCode::UnexpectedError,
                    "unable to decrypt message",
                )
                .await;
                return;
            }
        };

        if !signed.verify() {
            self.fault("verifying message", &"signature verification failed");
            self.send_error(
                stream,
                signed.header().from.as_str(),
                ErrorCode::InvalidSignature,
                "unable to verify message",
            )
            .await;
            return;
        }

        // Live requests are reconstructed with timestamp verification to
        // bound the replay window.
        let (payload, type_code, header) = match signed.reconstruct_with_timestamp() {
            Ok((payload, type_code, header)) => {
                (payload.to_vec(), type_code.to_string(), header.clone())
            }
            Err(err) => {
                self.fault("reconstructing message", &err);
                self.send_error(
                    stream,
                    signed.header().from.as_str(),
                    ErrorCode::UnexpectedError,
                    "unable to reconstruct message",
                )
                .await;
                return;
            }
        };

        let from = Address::from_fingerprint(&header.from);
        if !self.delegate.allow_connection(&from) {
            debug!(from = %from, "connection refused by delegate");
            return;
        }

        match type_code.as_str() {
            REGISTRATION_CODE => {
                self.handle_registration(stream, &payload, &header.from, signed)
                    .await;
            }
            QUERY_CODE => {
                self.handle_query(stream, &payload, &header.from).await;
            }
            other => {
                debug!(type_code = other, "ignoring unknown message type");
            }
        }
    }

    async fn handle_registration(
        &self,
        stream: &mut TcpStream,
        payload: &[u8],
        from: &str,
        signed: SignedMessage,
    ) {
        let registration = match TrackerRegister::decode(payload) {
            Ok(registration) => registration,
            Err(err) => {
                self.fault("unloading registration payload", &err);
                self.send_error(
                    stream,
                    from,
                    ErrorCode::UnexpectedError,
                    "unable to unload message payload",
                )
                .await;
                return;
            }
        };

        // The signed identity must own the record it is registering.
        if registration.address != from {
            self.fault("registration integrity", &"registration address differs from signer");
            self.send_error(
                stream,
                from,
                ErrorCode::InvalidSignature,
                "signature doesn't match registration address",
            )
            .await;
            return;
        }

        let owner = Address::from_fingerprint(from);
        self.delegate
            .save_record(&owner, signed, &registration.username)
            .await;
        // No confirmation envelope; absence of an error is the success
        // signal.
    }

    async fn handle_query(&self, stream: &mut TcpStream, payload: &[u8], from: &str) {
        let query = match TrackerQuery::decode(payload) {
            Ok(query) => query,
            Err(err) => {
                self.fault("unloading query payload", &err);
                self.send_error(
                    stream,
                    from,
                    ErrorCode::UnexpectedError,
                    "unable to unload message payload",
                )
                .await;
                return;
            }
        };

        let record = if query.username.is_empty() {
            if query.address.is_empty() {
                self.send_error(stream, from, ErrorCode::UnexpectedError, "address is not valid")
                    .await;
                return;
            }
            let queried = Address::from_fingerprint(&query.address);
            self.delegate.get_record_by_address(&queried).await
        } else {
            self.delegate.get_record_by_alias(&query.username).await
        };

        let Some(mut record) = record else {
            self.send_error(
                stream,
                from,
                ErrorCode::AddressNotFound,
                "couldn't find that address",
            )
            .await;
            return;
        };

        // The record is an owned clone of the stored envelope; appending
        // the tracker's counter-signature here never touches stored state.
        record.add_signature(&self.identity);

        let requester = Address::from_fingerprint(from);
        let envelope = record.address_to(&requester);
        if let Err(err) = send_envelope(stream, &envelope).await {
            self.fault("sending query response", &err);
            self.send_error(
                stream,
                from,
                ErrorCode::InternalError,
                "couldn't send query response",
            )
            .await;
        }
    }

    /// Reply with a typed, tracker-signed error envelope. Best-effort: a
    /// failed write is a silent drop.
    async fn send_error(&self, stream: &mut TcpStream, to: &str, code: ErrorCode, message: &str) {
        let body = ErrorBody {
            code: code as i32,
            message: message.to_string(),
        };
        let recipient = Address::from_fingerprint(to);
        let signed = SignedMessage::sign(
            body.encode_to_vec(),
            ERROR_CODE,
            &recipient,
            &self.identity,
        );
        let envelope = signed.address_to(&recipient);
        if let Err(err) = send_envelope(stream, &envelope).await {
            debug!(%err, "failed to deliver error reply");
        }
    }

    fn fault(&self, location: &'static str, detail: &dyn fmt::Display) {
        self.delegate.handle_error(&TrackerFault {
            location,
            detail: detail.to_string(),
        });
    }
}
