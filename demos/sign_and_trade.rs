//! Example: sign an order as the maker and fill it as the taker.
//!
//! Deployment comes from the `PERPETUAL_*` environment variables (or `.env`),
//! see `perpetual_sdk::config`.
//!
//! Run with: cargo run --example sign_and_trade -- --maker-key 0x.. --taker-key 0x.. --simulate

use std::process::exit;

use alloy::{
    network::EthereumWallet, primitives::U256, providers::ProviderBuilder,
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use fastnum::{D128, UD128, decimal::Context};
use perpetual_sdk::{
    Perpetual,
    chain::RpcChain,
    config::ClientConfig,
    contracts::{Contracts, TxResult},
    num::{Fee, Price},
    orders::{Orders, balance_updates_after_filling_order},
    signing::SigningMethod,
    testing::LocalSigners,
    types::{ConfirmationType, Order, SendOptions},
};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "sign-and-trade")]
#[command(about = "Signs an order and fills it in one trade batch")]
struct Cli {
    /// Private key of the order maker
    #[arg(long)]
    maker_key: String,

    /// Private key of the taker, also sends the transaction
    #[arg(long)]
    taker_key: String,

    /// Position amount in base units
    #[arg(long, default_value = "1000000000000000000")]
    amount: String,

    #[arg(long, default_value = "100")]
    price: String,

    /// Fee rate, e.g. 0.002
    #[arg(long, default_value = "0.002")]
    fee: String,

    /// Maker sells instead of buying
    #[arg(long)]
    sell: bool,

    /// One of Hash, UnsafeHash, Compatibility, TypedData, LegacyV3, LegacyV4, WalletSpecific
    #[arg(long, default_value = "Hash")]
    method: String,

    /// Estimate gas only
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(Cli::parse()).await {
        error!(%err, "sign and trade failed");
        exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let chain = config.chain()?;

    let maker_key: PrivateKeySigner = cli.maker_key.parse()?;
    let taker_key: PrivateKeySigner = cli.taker_key.parse()?;
    let amount: U256 = cli.amount.parse()?;
    let price = Price::new(
        UD128::from_str(&cli.price, Context::default()).map_err(|err| format!("price: {err}"))?,
    )?;
    let fee = Fee::new(
        D128::from_str(&cli.fee, Context::default()).map_err(|err| format!("fee: {err}"))?,
    )?;
    let method: SigningMethod = cli.method.parse()?;

    let signers = LocalSigners::new();
    let maker = signers.add(maker_key);
    let taker = taker_key.address();

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(taker_key))
        .connect_http(config.node_rpc_url()?);
    let contracts = Contracts::new(RpcChain::new(provider), chain.clone())
        .with_defaults(config.send_defaults()?.from(taker))
        .with_gas_tracking(config.track_gas);
    let orders = Orders::with_domain_name(&chain, config.orders_domain_name());
    let perpetual = Perpetual::with_orders(contracts, orders);

    let order = Order {
        is_buy: !cli.sell,
        is_decrease_only: false,
        amount,
        limit_price: price,
        trigger_price: Price::ZERO,
        limit_fee: fee,
        maker,
        taker,
        expiration: U256::ZERO,
        salt: U256::from(rand_salt()),
    };
    let signed = perpetual
        .orders()
        .signed_order(&signers, order, method)
        .await?;
    info!(
        order_hash = %perpetual.orders().order_hash(&signed),
        signature = %signed.typed_signature(),
        valid = perpetual.orders().order_has_valid_signature(&signed),
        "order signed"
    );

    let update = balance_updates_after_filling_order(amount, price, fee, signed.is_buy)?;
    info!(
        margin = %update.margin_delta,
        position = %update.position_delta,
        "expected maker balance change"
    );

    let mut operation = perpetual.initiate_trade();
    operation.fill_signed_order(&signed, amount, price, fee)?;

    let mut options = SendOptions::default();
    if cli.simulate {
        options = options.confirmation_type(ConfirmationType::Simulate);
    }
    match operation.commit(options).await? {
        TxResult::Simulated { gas_estimate } => info!(gas_estimate, "trade simulated"),
        TxResult::Hash { transaction_hash } => info!(%transaction_hash, "trade submitted"),
        TxResult::Confirmed(receipt) => info!(?receipt, "trade confirmed"),
        TxResult::Both {
            transaction_hash,
            confirmation,
        } => {
            info!(%transaction_hash, "trade submitted");
            let receipt = confirmation.await?;
            info!(?receipt, "trade confirmed");
        }
    }
    if config.track_gas {
        info!(
            cumulative_gas_used = perpetual.gas_ledger().cumulative_gas_used(),
            "gas used"
        );
    }
    Ok(())
}

fn rand_salt() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}
