use std::str::FromStr;

use anyhow::Result;
use clap::Args;
use paylink::PaymentIntent;

#[derive(Args)]
pub struct DecodeRequestSubCommand {
    /// Payment link or query string
    link: String,
}

pub fn decode_request(sub_command_args: &DecodeRequestSubCommand) -> Result<()> {
    let intent = PaymentIntent::from_str(&sub_command_args.link)?;

    println!("{}", serde_json::to_string_pretty(&intent)?);
    Ok(())
}
