use std::sync::Arc;

use clap::Parser;
use puf_client::rpc::{RpcConnection, SolanaRpcConnection};
use puf_claimer::{
    api_server::spawn_api_server,
    cli::{BalanceArgs, Cli, Commands, StartArgs},
    config::{ClaimConfig, ConfirmConfig, TokenConfig},
    metrics::register_metrics,
    telemetry::setup_telemetry,
    ClaimService,
};
use solana_sdk::signature::Signer;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    setup_telemetry();

    let cli = Cli::parse();
    debug!("Parsed command line");

    match cli.command {
        Commands::Start(args) => run_start(args).await,
        Commands::Balance(args) => run_balance(args).await,
    }
}

async fn run_start(args: StartArgs) -> anyhow::Result<()> {
    let config = ClaimConfig::new_for_start(&args)?;
    register_metrics();

    match &config.treasury {
        Some(treasury) => info!(
            "Treasury {} paying {} x 10^decimals of mint {} ({:?} mode)",
            treasury.pubkey(),
            config.reward_amount,
            config.token.mint,
            config.reward_mode
        ),
        None => warn!("PRIVATE_KEY not set in environment variables, every claim will fail"),
    }

    let rpc = SolanaRpcConnection::new(
        config
            .token
            .rpc_connection_config(config.confirm.commitment),
    );
    info!("Using RPC endpoint {}", rpc.get_url());
    if let Err(e) = rpc.health().await {
        warn!("RPC health check failed: {}", e);
    }

    let service = Arc::new(ClaimService::new(Arc::new(rpc), Arc::new(config)));
    let server = spawn_api_server(
        service,
        args.api_server_port,
        args.api_server_public_bind,
    )?;
    info!("Claim API listening on {}", server.addr);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");
    server.shutdown().await;
    Ok(())
}

async fn run_balance(args: BalanceArgs) -> anyhow::Result<()> {
    let token = TokenConfig::new(&args.token)?;
    let rpc = SolanaRpcConnection::new(
        token.rpc_connection_config(ConfirmConfig::default().commitment),
    );
    let config = ClaimConfig {
        token,
        treasury: None,
        reward_mode: Default::default(),
        reward_amount: 0,
        confirm: ConfirmConfig::default(),
    };
    let service = ClaimService::new(Arc::new(rpc), Arc::new(config));
    let balance = service.token_balance(&args.owner).await?;
    println!(
        "{} holds {} ({} raw) in {}",
        balance.owner,
        balance.ui_amount(),
        balance.amount,
        balance.token_account
    );
    Ok(())
}
