use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the claim API.
    Start(StartArgs),
    /// Print the reward token balance of a wallet.
    Balance(BalanceArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RewardMode {
    /// Issue new supply; the treasury is the mint authority.
    #[default]
    Mint,
    /// Move tokens out of the treasury's own token account.
    Transfer,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CommitmentArg {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

#[derive(Parser, Clone, Debug)]
pub struct TokenArgs {
    #[arg(long, env = "RPC_URL", default_value = "https://api.devnet.solana.com")]
    pub rpc_url: String,

    #[arg(
        long,
        env = "TOKEN_MINT",
        default_value = "3o2B9qoezrzED5p47agp8QVtozvjqGXGSvkW42pxyzEJ"
    )]
    pub mint: String,

    /// `token-2022`, `spl-token`, or a program id.
    #[arg(long, env = "TOKEN_PROGRAM", default_value = "token-2022")]
    pub token_program: String,

    #[arg(long, env = "RPC_MAX_RETRIES", default_value = "1")]
    pub rpc_max_retries: u32,

    #[arg(long, env = "RPC_RETRY_DELAY_MS", default_value = "1000")]
    pub rpc_retry_delay_ms: u64,
}

#[derive(Parser, Clone, Debug)]
pub struct StartArgs {
    #[command(flatten)]
    pub token: TokenArgs,

    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    #[arg(long, env = "REWARD_MODE", value_enum, default_value_t = RewardMode::Mint)]
    pub reward_mode: RewardMode,

    #[arg(long, env = "REWARD_AMOUNT", default_value = "1000")]
    pub reward_amount: u64,

    #[arg(long, env = "CLAIM_COMMITMENT", value_enum, default_value_t = CommitmentArg::Processed)]
    pub commitment: CommitmentArg,

    #[arg(long, env = "CLAIM_CONFIRM_TIMEOUT_MS", default_value = "60000")]
    pub confirm_timeout_ms: u64,

    #[arg(long, env = "CLAIM_POLL_INTERVAL_MS", default_value = "500")]
    pub poll_interval_ms: u64,

    #[arg(long, env = "API_SERVER_PORT", default_value = "3000")]
    pub api_server_port: u16,

    #[arg(long, env = "API_SERVER_PUBLIC_BIND")]
    pub api_server_public_bind: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub token: TokenArgs,

    #[arg(long)]
    pub owner: String,
}
