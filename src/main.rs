// Entry point for the ledger node and its client commands
// startnode runs the server; every other command sends one request to a running node
use clap::Parser;
use log::{error, info, LevelFilter};
use proof_ledger::network::{send_request, Credential, TransactionRequest};
use proof_ledger::{
    BlockchainError, Command, Config, Opt, Package, PrivateKeyMaterial, Result, Server,
    SigningMethod, Transaction,
};
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    // Info by default, RUST_LOG can still override it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<()> {
    let mut config = Config::load(opt.config.as_deref())?;
    let timeout = config.request_timeout();

    match opt.command {
        Command::StartNode { listen } => {
            if let Some(listen) = listen {
                config.apply_overrides(Some(listen), None);
                config.validate()?;
            }
            let server = Server::from_config(&config)?;
            info!(
                "Starting node {} on {}",
                server.get_context().get_ledger().get_node_id(),
                config.node.address
            );
            server.run(&config.node.address)?;
        }
        Command::Send {
            node,
            sender,
            recipient,
            amount,
            method,
            key,
            remote_sign,
        } => {
            let transaction = build_request(
                &sender,
                &recipient,
                amount,
                method,
                key.as_deref(),
                remote_sign,
            )?;
            let pkg = Package::NewTransaction { transaction };
            match expect_reply(send_request(&node, &pkg, timeout)?)? {
                Package::TransactionAccepted { index } => {
                    println!("Transaction will be added to block {index}");
                }
                other => return Err(unexpected(&other)),
            }
        }
        Command::Mine { node } => {
            match expect_reply(send_request(&node, &Package::Mine, timeout)?)? {
                Package::Mined { block } => {
                    println!("New block forged");
                    println!("{}", serde_json::to_string_pretty(&block)?);
                }
                other => return Err(unexpected(&other)),
            }
        }
        Command::Printchain { node } => {
            match expect_reply(send_request(&node, &Package::GetChain, timeout)?)? {
                Package::Chain { chain, length } => {
                    for block in &chain {
                        println!("{}", serde_json::to_string_pretty(block)?);
                    }
                    println!("Chain length: {length}");
                }
                other => return Err(unexpected(&other)),
            }
        }
        Command::Register { node, peers } => {
            let pkg = Package::RegisterNodes { nodes: peers };
            match expect_reply(send_request(&node, &pkg, timeout)?)? {
                Package::NodesRegistered { total_nodes } => {
                    println!("New nodes have been added, {total_nodes} known in total");
                }
                other => return Err(unexpected(&other)),
            }
        }
        Command::Resolve { node } => {
            match expect_reply(send_request(&node, &Package::Resolve, timeout)?)? {
                Package::Resolved { replaced, chain } => {
                    if replaced {
                        println!("Our chain was replaced");
                    } else {
                        println!("Our chain is authoritative");
                    }
                    println!("Chain length: {}", chain.len());
                }
                other => return Err(unexpected(&other)),
            }
        }
    }
    Ok(())
}

// Sign locally unless the node was asked to do it
fn build_request(
    sender: &str,
    recipient: &str,
    amount: u64,
    method: SigningMethod,
    key_path: Option<&Path>,
    remote_sign: bool,
) -> Result<TransactionRequest> {
    if method == SigningMethod::None {
        return Ok(Transaction::new_unsigned(sender, recipient, amount).into());
    }

    let key_path = key_path.ok_or_else(|| {
        BlockchainError::InvalidInput(format!("{method} transactions need --key"))
    })?;
    let text = fs::read_to_string(key_path)?;
    let key = PrivateKeyMaterial::from_key_text(method, &text)?;

    if remote_sign {
        return Ok(TransactionRequest {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            method,
            credential: Some(Credential::SigningKey { key }),
        });
    }
    Ok(Transaction::new_signed(sender, recipient, amount, &key)?.into())
}

fn expect_reply(reply: Package) -> Result<Package> {
    match reply {
        Package::Error { kind, message } => {
            Err(BlockchainError::Network(format!(
                "node refused request ({kind}): {message}"
            )))
        }
        reply => Ok(reply),
    }
}

fn unexpected(reply: &Package) -> BlockchainError {
    BlockchainError::PeerMalformedResponse(format!("unexpected reply {}", reply.name()))
}
