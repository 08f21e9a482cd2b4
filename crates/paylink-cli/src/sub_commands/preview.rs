use anyhow::Result;
use clap::Args;
use paylink::PreviewMetadata;

#[derive(Args)]
pub struct PreviewSubCommand {
    /// Payment link or query string
    link: String,
}

pub fn preview(sub_command_args: &PreviewSubCommand) -> Result<()> {
    let preview = PreviewMetadata::from_query(&sub_command_args.link);

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}
