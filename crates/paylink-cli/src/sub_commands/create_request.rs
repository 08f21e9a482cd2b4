use anyhow::Result;
use clap::Args;
use paylink::rust_decimal::Decimal;
use paylink::{Address, PaymentIntent};

use crate::config::Settings;

#[derive(Args)]
pub struct CreateRequestSubCommand {
    /// Address receiving the payment
    #[arg(short, long)]
    recipient: Address,
    /// Amount to request
    #[arg(short, long)]
    amount: Decimal,
    /// What the payment is for
    #[arg(short, long)]
    label: String,
    /// Optional note for the payer
    #[arg(short, long)]
    message: Option<String>,
}

pub fn create_request(
    settings: &Settings,
    sub_command_args: &CreateRequestSubCommand,
) -> Result<()> {
    let mut builder = PaymentIntent::builder()
        .recipient(sub_command_args.recipient)
        .amount(sub_command_args.amount)
        .label(&sub_command_args.label);
    if let Some(message) = &sub_command_args.message {
        builder = builder.message(message);
    }

    let intent = builder.build()?;
    let link = intent.to_link(&settings.origin()?)?;

    println!("{link}");
    Ok(())
}
