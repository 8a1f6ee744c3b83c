use crate::config::Config;
use crate::core::{ConsensusResolver, Ledger};
use crate::error::{BlockchainError, Result};
use crate::network::{Package, PeerRegistry, TcpChainSource, TransactionRequest};
use log::{debug, error, info, warn};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Everything a request handler needs; cheap to clone into each connection thread
#[derive(Clone)]
pub struct NodeContext {
    ledger: Ledger,
    peers: Arc<PeerRegistry>,
    resolver: Arc<ConsensusResolver>,
}

impl NodeContext {
    pub fn new(ledger: Ledger, peers: Arc<PeerRegistry>, resolver: ConsensusResolver) -> Self {
        Self {
            ledger,
            peers,
            resolver: Arc::new(resolver),
        }
    }

    pub fn get_ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn get_peers(&self) -> &PeerRegistry {
        self.peers.as_ref()
    }

    pub fn resolve(&self) -> Result<bool> {
        self.resolver.resolve(&self.ledger, &self.peers)
    }

    /// Answer one request; failures become an `Error` package
    pub fn handle(&self, pkg: Package) -> Package {
        let request = pkg.name();
        match self.process_message(pkg) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Request {request} failed: {e}");
                Package::error(&e)
            }
        }
    }

    fn process_message(&self, pkg: Package) -> Result<Package> {
        match pkg {
            Package::NewTransaction { transaction } => self.handle_new_transaction(transaction),
            Package::Mine => {
                let block = self.ledger.mine()?;
                Ok(Package::Mined { block })
            }
            Package::GetChain => {
                let chain = self.ledger.chain()?;
                let length = chain.len();
                Ok(Package::Chain { chain, length })
            }
            Package::RegisterNodes { nodes } => self.handle_register_nodes(nodes),
            Package::Resolve => {
                let replaced = self.resolve()?;
                let chain = self.ledger.chain()?;
                Ok(Package::Resolved { replaced, chain })
            }
            other => Err(BlockchainError::InvalidInput(format!(
                "{} is not a request",
                other.name()
            ))),
        }
    }

    fn handle_new_transaction(&self, request: TransactionRequest) -> Result<Package> {
        let transaction = request.into_transaction()?;
        let index = self.ledger.new_transaction(transaction)?;
        info!("Transaction will be added to block {index}");
        Ok(Package::TransactionAccepted { index })
    }

    // Either every address is valid and all get registered, or nothing changes
    fn handle_register_nodes(&self, nodes: Vec<String>) -> Result<Package> {
        if nodes.is_empty() {
            return Err(BlockchainError::InvalidInput(
                "Please supply a valid list of nodes".to_string(),
            ));
        }
        for node in &nodes {
            crate::network::peer_registry::canonicalize(node)?;
        }
        for node in &nodes {
            self.peers.register(node)?;
        }
        Ok(Package::NodesRegistered {
            total_nodes: self.peers.len()?,
        })
    }
}

/// Serves the node protocol over TCP, one thread per connection
pub struct Server {
    context: NodeContext,
    read_timeout: Duration,
    resolve_interval: Option<Duration>,
}

impl Server {
    pub fn new(context: NodeContext) -> Self {
        Self {
            context,
            read_timeout: Duration::from_secs(60),
            resolve_interval: None,
        }
    }

    /// Build the ledger, registry and resolver described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let ledger = Ledger::from_config(config)?;
        let peers = Arc::new(PeerRegistry::new());
        for peer in &config.network.bootstrap_peers {
            peers.register(peer)?;
        }
        let resolver = ConsensusResolver::new(TcpChainSource::new(config.peer_timeout()));

        let mut server = Self::new(NodeContext::new(ledger, peers, resolver));
        server.read_timeout = config.request_timeout();
        server.resolve_interval = config.resolve_interval();
        Ok(server)
    }

    pub fn get_context(&self) -> &NodeContext {
        &self.context
    }

    /// Bind `addr` and serve until the process exits
    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = Self::bind(addr)?;
        self.serve(listener)
    }

    pub fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))
    }

    /// Accept connections on an already bound listener
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            "Node {} listening on {local_addr}",
            self.context.ledger.get_node_id()
        );

        if let Some(interval) = self.resolve_interval {
            self.start_periodic_resolution(interval);
        }

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    let context = self.context.clone();
                    let read_timeout = self.read_timeout;
                    thread::spawn(move || {
                        if let Err(e) =
                            Self::handle_connection(&context, stream, peer_addr, read_timeout)
                        {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    // Re-run consensus in the background every `interval`
    fn start_periodic_resolution(&self, interval: Duration) {
        let context = self.context.clone();
        info!("Resolving against peers every {}s", interval.as_secs());

        thread::spawn(move || loop {
            thread::sleep(interval);
            match context.resolve() {
                Ok(true) => info!("Periodic resolution replaced the local chain"),
                Ok(false) => {}
                Err(e) => warn!("Periodic resolution failed: {e}"),
            }
        });
    }

    fn handle_connection(
        context: &NodeContext,
        stream: TcpStream,
        peer_addr: SocketAddr,
        read_timeout: Duration,
    ) -> Result<()> {
        stream
            .set_read_timeout(Some(read_timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;
        stream
            .set_write_timeout(Some(read_timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;

        let reader = BufReader::new(&stream);
        let mut pkg_reader = Deserializer::from_reader(reader).into_iter::<Package>();

        let reply = match pkg_reader.next() {
            Some(Ok(pkg)) => {
                info!("Received {} from {peer_addr}", pkg.name());
                context.handle(pkg)
            }
            Some(Err(e)) => {
                warn!("Malformed request from {peer_addr}: {e}");
                Package::error(&BlockchainError::InvalidInput(format!(
                    "Failed to deserialize package: {e}"
                )))
            }
            None => {
                info!("Connection from {peer_addr} closed without a request");
                return Ok(());
            }
        };

        let mut writer = &stream;
        serde_json::to_writer(writer, &reply)
            .map_err(|e| BlockchainError::Network(format!("Failed to send reply: {e}")))?;
        writer.flush()?;

        if let Err(e) = stream.shutdown(Shutdown::Both) {
            debug!("Failed to shut down connection from {peer_addr}: {e}");
        }
        Ok(())
    }
}
