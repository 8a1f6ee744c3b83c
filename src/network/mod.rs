//! Node-to-node and client-to-node networking
//!
//! This module holds the peer registry, the JSON request/response protocol,
//! the blocking TCP client used to talk to other nodes and the threaded
//! server that answers them.

pub mod client;
pub mod message;
pub mod peer_registry;
pub mod server;

pub use client::{send_request, TcpChainSource, DEFAULT_PEER_TIMEOUT, MAX_RESPONSE_BYTES};
pub use message::{Credential, Package, TransactionRequest};
pub use peer_registry::PeerRegistry;
pub use server::{NodeContext, Server};
