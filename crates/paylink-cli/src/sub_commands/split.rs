use anyhow::Result;
use clap::Args;
use paylink::amount::decimal_from_cents;
use paylink::rust_decimal::Decimal;
use paylink::{Address, SplitMode, SplitPlan};

use crate::config::Settings;

#[derive(Args)]
pub struct SplitSubCommand {
    /// Address receiving the payments
    #[arg(short, long)]
    recipient: Address,
    /// Total to split
    #[arg(short, long)]
    total: Decimal,
    /// Number of participants, requester included
    #[arg(short, long)]
    count: u32,
    /// What the payment is for
    #[arg(short, long)]
    label: String,
    /// Optional note for the payers
    #[arg(short, long)]
    message: Option<String>,
    /// One link per participant instead of a shared link
    #[arg(long)]
    per_participant: bool,
}

pub fn split(settings: &Settings, sub_command_args: &SplitSubCommand) -> Result<()> {
    let mode = if sub_command_args.per_participant {
        SplitMode::PerParticipantLinks
    } else {
        settings.split.mode
    };

    let plan = SplitPlan::new(sub_command_args.total, sub_command_args.count, mode)?;
    let origin = settings.origin()?;

    println!(
        "Splitting {} {} ways ({})",
        decimal_from_cents(plan.total_cents()),
        plan.split_count(),
        plan.mode()
    );
    println!(
        "Your share: {}",
        decimal_from_cents(plan.shares()[plan.requester_share_index()])
    );

    let intents = plan.intents(
        sub_command_args.recipient,
        &sub_command_args.label,
        sub_command_args.message.as_deref(),
    )?;

    for intent in intents {
        let link = intent.to_link(&origin)?;
        match intent.share_index {
            Some(index) => println!("Share {index}: {} {link}", intent.amount),
            None => println!("Each participant: {} {link}", intent.amount),
        }
    }

    if plan.shortfall() > 0 {
        println!(
            "Shared link collects {} of {}",
            decimal_from_cents(plan.collected_total()),
            decimal_from_cents(plan.total_cents())
        );
    }

    Ok(())
}
