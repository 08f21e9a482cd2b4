use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use paylink::rust_decimal::Decimal;
use paylink::{Amount, HoldingAccount, PaymentIntent, PreviewMetadata};
use paylink_fake_ledger::{FakeLedger, FakeSigner};
use paylink_wallet::{SettlementExecutor, Signer};

use crate::config::Settings;

#[derive(Args)]
pub struct PaySubCommand {
    /// Payment link or query string
    link: String,
    /// Balance of the demo payer, in whole asset units
    #[arg(long, default_value = "100")]
    payer_balance: Decimal,
    /// Fake ledger failure injection as JSON, e.g. `{"reject_with":"insufficient funds"}`
    #[arg(long)]
    behavior: Option<String>,
    /// Check the recipient balance after settlement
    #[arg(long)]
    verify_balance: bool,
}

pub async fn pay(settings: &Settings, sub_command_args: &PaySubCommand) -> Result<()> {
    let intent = PaymentIntent::from_str(&sub_command_args.link)?;
    let asset = settings.asset()?;

    let preview = PreviewMetadata::from_intent(&intent);
    println!("{}: {}", preview.title, preview.description);

    let ledger = FakeLedger::default();
    if let Some(behavior) = &sub_command_args.behavior {
        ledger.set_behavior_json(behavior).await?;
    }

    let signer = FakeSigner::random();
    let balance = Amount::from_decimal_truncated(sub_command_args.payer_balance, asset.decimals)?;
    ledger.fund(signer.identity(), &asset, balance).await?;
    tracing::info!("Demo payer {} funded with {}", signer.identity(), balance);

    let mut config = settings.executor;
    if sub_command_args.verify_balance {
        config = config.with_verify_balance(true);
    }

    let executor = SettlementExecutor::new(
        Arc::new(ledger.clone()),
        Arc::new(signer),
        asset.clone(),
        config,
    );

    let result = executor.execute(&intent).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let received = ledger
        .balance_of(&HoldingAccount::derive(&intent.recipient, &asset))
        .await
        .unwrap_or(Amount::ZERO);
    println!(
        "Recipient holds {} {}",
        received.to_decimal(asset.decimals),
        asset.symbol
    );

    if let Some(err) = result.error().cloned() {
        bail!(err);
    }

    Ok(())
}
