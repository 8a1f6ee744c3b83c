use crate::config::DEFAULT_NODE_ADDR;
use crate::crypto::SigningMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "proof-ledger", about = "Single-node proof-of-work ledger")]
pub struct Opt {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long, help = "Address to listen on (overrides config)")]
        listen: Option<String>,
    },
    #[command(name = "send", about = "Submit a transaction to a node")]
    Send {
        #[arg(long, default_value = DEFAULT_NODE_ADDR, help = "Node to send to")]
        node: String,
        #[arg(help = "Sender identifier")]
        sender: String,
        #[arg(help = "Recipient identifier")]
        recipient: String,
        #[arg(help = "Amount to transfer")]
        amount: u64,
        #[arg(
            long,
            default_value = "RSA",
            help = "Signing method (RSA, DSA or None)"
        )]
        method: SigningMethod,
        #[arg(long, help = "Private key file: hex DER for RSA, TOML for DSA")]
        key: Option<PathBuf>,
        #[arg(long, help = "Let the node sign with the key instead of signing locally")]
        remote_sign: bool,
    },
    #[command(name = "mine", about = "Ask a node to mine the next block")]
    Mine {
        #[arg(long, default_value = DEFAULT_NODE_ADDR)]
        node: String,
    },
    #[command(name = "printchain", about = "Print a node's full chain")]
    Printchain {
        #[arg(long, default_value = DEFAULT_NODE_ADDR)]
        node: String,
    },
    #[command(name = "register", about = "Register peers with a node")]
    Register {
        #[arg(long, default_value = DEFAULT_NODE_ADDR)]
        node: String,
        #[arg(required = true, help = "Peer addresses (host:port or URL)")]
        peers: Vec<String>,
    },
    #[command(name = "resolve", about = "Run consensus on a node")]
    Resolve {
        #[arg(long, default_value = DEFAULT_NODE_ADDR)]
        node: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_parses_method_and_key() {
        let opt = Opt::try_parse_from([
            "proof-ledger",
            "send",
            "alice",
            "bob",
            "5",
            "--method",
            "dsa",
            "--key",
            "dsa_key.toml",
        ])
        .unwrap();
        match opt.command {
            Command::Send {
                node,
                amount,
                method,
                key,
                remote_sign,
                ..
            } => {
                assert_eq!(node, DEFAULT_NODE_ADDR);
                assert_eq!(amount, 5);
                assert_eq!(method, SigningMethod::Dsa);
                assert_eq!(key, Some(PathBuf::from("dsa_key.toml")));
                assert!(!remote_sign);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = Opt::try_parse_from(["proof-ledger", "send", "a", "b", "1", "--method", "ecdsa"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let opt =
            Opt::try_parse_from(["proof-ledger", "startnode", "--config", "node.toml"]).unwrap();
        assert_eq!(opt.config, Some(PathBuf::from("node.toml")));
        assert!(matches!(opt.command, Command::StartNode { listen: None }));
    }

    #[test]
    fn test_register_requires_peers() {
        assert!(Opt::try_parse_from(["proof-ledger", "register"]).is_err());
    }
}
