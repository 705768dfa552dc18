//! Tracker connections: SRV discovery and one-shot envelope exchange.

use prost::Message;
use tokio::net::TcpStream;
use tracing::debug;

use adtp_proto::Envelope;

use crate::framing::{read_frame, write_frame, FramingError};

/// Default tracker port when the URL names none and SRV discovery fails.
pub const DEFAULT_TRACKER_PORT: u16 = 2048;

/// Resolve a tracker URL to a dialable `host:port`.
///
/// A URL without a port is looked up as the SRV record
/// `_adtp._tcp.<host>`; the first SRV target and port win. SRV failure
/// falls back to the URL verbatim and must not fail the connection.
pub async fn resolve_location(url: &str) -> String {
    if url.contains(':') {
        return url.to_string();
    }

    let resolver = match hickory_resolver::TokioResolver::builder_tokio() {
        Ok(builder) => builder.build(),
        Err(err) => {
            debug!(url, %err, "system resolver unavailable, using url verbatim");
            return url.to_string();
        }
    };

    match resolver.srv_lookup(format!("_adtp._tcp.{url}.")).await {
        Ok(lookup) => match lookup.iter().next() {
            Some(srv) => {
                let target = srv.target().to_utf8();
                format!("{}:{}", target.trim_end_matches('.'), srv.port())
            }
            None => url.to_string(),
        },
        Err(err) => {
            debug!(url, %err, "srv lookup failed, using url verbatim");
            url.to_string()
        }
    }
}

/// Open a TCP connection to a tracker URL.
pub async fn connect(url: &str) -> std::io::Result<TcpStream> {
    let location = resolve_location(url).await;
    TcpStream::connect(location).await
}

/// Write one envelope to the connection.
pub async fn send_envelope(stream: &mut TcpStream, env: &Envelope) -> Result<(), FramingError> {
    write_frame(stream, &env.encode_to_vec()).await
}

/// Read one envelope. `Ok(None)` is clean EOF, the peer having closed
/// without a reply.
pub async fn recv_envelope(stream: &mut TcpStream) -> Result<Option<Envelope>, FramingError> {
    match read_frame(stream).await? {
        Some(frame) => Ok(Some(Envelope::decode(&frame[..])?)),
        None => Ok(None),
    }
}
