use crate::core::{ChainSnapshot, ChainSource};
use crate::error::{BlockchainError, Result};
use crate::network::Package;
use log::debug;
use serde_json::Deserializer;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Default connect/read/write timeout for peer requests
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(5000);

/// Largest reply accepted from a peer
pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

// Reads the reply against one deadline for the whole exchange, and refuses
// to read past the size limit
struct DeadlineReader<'a> {
    stream: &'a TcpStream,
    deadline: Instant,
    remaining: u64,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(io::Error::new(ErrorKind::TimedOut, "reply deadline passed"));
        }
        if self.remaining == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "reply exceeds the size limit",
            ));
        }
        self.stream.set_read_timeout(Some(left))?;

        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let mut stream = self.stream;
        let n = stream.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Send one request to `addr` and wait for the single reply
///
/// `timeout` bounds the whole exchange, not each read, so a peer that
/// trickles bytes cannot hold the caller past it. Connection trouble and
/// the deadline map to `PeerUnreachable`; a reply that is missing, too
/// large or does not parse maps to `PeerMalformedResponse`.
pub fn send_request(addr: &str, pkg: &Package, timeout: Duration) -> Result<Package> {
    exchange(addr, pkg, timeout, MAX_RESPONSE_BYTES)
}

fn exchange(addr: &str, pkg: &Package, timeout: Duration, max_bytes: u64) -> Result<Package> {
    let deadline = Instant::now() + timeout;
    let unreachable = |e: io::Error| BlockchainError::PeerUnreachable(format!("{addr}: {e}"));

    let socket_addr: SocketAddr = addr
        .to_socket_addrs()
        .map_err(unreachable)?
        .next()
        .ok_or_else(|| BlockchainError::PeerUnreachable(format!("{addr}: no address resolved")))?;

    debug!("Sending {} to {addr}", pkg.name());

    let mut stream = TcpStream::connect_timeout(&socket_addr, timeout).map_err(unreachable)?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(unreachable)?;

    serde_json::to_writer(&stream, pkg)
        .map_err(|e| BlockchainError::PeerUnreachable(format!("{addr}: failed to send: {e}")))?;
    stream.flush().map_err(unreachable)?;
    // Half-close so the server knows the request is complete
    stream.shutdown(Shutdown::Write).map_err(unreachable)?;

    let reader = BufReader::new(DeadlineReader {
        stream: &stream,
        deadline,
        remaining: max_bytes,
    });
    let mut replies = Deserializer::from_reader(reader).into_iter::<Package>();
    match replies.next() {
        Some(Ok(reply)) => {
            debug!("Received {} from {addr}", reply.name());
            Ok(reply)
        }
        Some(Err(e)) if e.is_io() => {
            let e = io::Error::from(e);
            if e.kind() == ErrorKind::InvalidData {
                Err(BlockchainError::PeerMalformedResponse(format!("{addr}: {e}")))
            } else {
                Err(BlockchainError::PeerUnreachable(format!(
                    "{addr}: failed to read reply: {e}"
                )))
            }
        }
        Some(Err(e)) => Err(BlockchainError::PeerMalformedResponse(format!(
            "{addr}: {e}"
        ))),
        None => Err(BlockchainError::PeerMalformedResponse(format!(
            "{addr}: connection closed without a reply"
        ))),
    }
}

/// Fetches peer chains over the node protocol
#[derive(Debug, Clone)]
pub struct TcpChainSource {
    timeout: Duration,
    max_response_bytes: u64,
}

impl Default for TcpChainSource {
    fn default() -> Self {
        TcpChainSource::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl TcpChainSource {
    pub fn new(timeout: Duration) -> TcpChainSource {
        TcpChainSource {
            timeout,
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, max_response_bytes: u64) -> TcpChainSource {
        self.max_response_bytes = max_response_bytes;
        self
    }
}

impl ChainSource for TcpChainSource {
    fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        let reply = exchange(
            peer,
            &Package::GetChain,
            self.timeout,
            self.max_response_bytes,
        )?;
        match reply {
            Package::Chain { chain, length } => Ok(ChainSnapshot { chain, length }),
            Package::Error { kind, message } => Err(BlockchainError::PeerMalformedResponse(
                format!("{peer} answered with {kind}: {message}"),
            )),
            other => Err(BlockchainError::PeerMalformedResponse(format!(
                "{peer} answered GetChain with {}",
                other.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    // Accept one connection, drain the request, then answer with raw bytes
    fn one_shot_server(reply: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).unwrap();
            stream.write_all(reply).unwrap();
        });
        addr
    }

    #[test]
    fn test_unreachable_peer() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let result = TcpChainSource::new(Duration::from_millis(500)).fetch_chain(&addr);
        assert!(matches!(result, Err(BlockchainError::PeerUnreachable(_))));
    }

    #[test]
    fn test_garbage_reply_is_malformed() {
        let addr = one_shot_server(b"this is not json");
        let result = TcpChainSource::default().fetch_chain(&addr);
        assert!(matches!(
            result,
            Err(BlockchainError::PeerMalformedResponse(_))
        ));
    }

    #[test]
    fn test_wrong_reply_variant_is_malformed() {
        let addr = one_shot_server(br#"{"NodesRegistered":{"total_nodes":1}}"#);
        let result = TcpChainSource::default().fetch_chain(&addr);
        assert!(matches!(
            result,
            Err(BlockchainError::PeerMalformedResponse(_))
        ));
    }

    #[test]
    fn test_chain_reply_is_returned() {
        let addr = one_shot_server(br#"{"Chain":{"chain":[],"length":0}}"#);
        let snapshot = TcpChainSource::default().fetch_chain(&addr).unwrap();
        assert_eq!(snapshot.length, 0);
        assert!(snapshot.chain.is_empty());
    }

    #[test]
    fn test_trickling_peer_hits_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).unwrap();
            // Each byte arrives well inside the per-read timeout
            if stream.write_all(b"{").is_err() {
                return;
            }
            for _ in 0..20 {
                thread::sleep(Duration::from_millis(200));
                if stream.write_all(b" ").is_err() {
                    break;
                }
            }
        });

        let started = Instant::now();
        let result = TcpChainSource::new(Duration::from_millis(500)).fetch_chain(&addr);
        assert!(matches!(result, Err(BlockchainError::PeerUnreachable(_))));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[test]
    fn test_oversized_reply_is_malformed() {
        let addr = one_shot_server(br#"{"Chain":{"chain":[],"length":0}}"#);
        let result = TcpChainSource::default()
            .with_max_response_bytes(8)
            .fetch_chain(&addr);
        assert!(matches!(
            result,
            Err(BlockchainError::PeerMalformedResponse(_))
        ));
    }
}
