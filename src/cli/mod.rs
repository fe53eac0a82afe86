pub mod args;
pub mod commands;

pub use args::{EmulateArgs, TransformArgs, VerifyArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "transform-harness")]
#[command(version = crate::VERSION)]
#[command(about = "Transform function contract and end-to-end harness for transformer runtimes")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: start a runtime (or `transform-harness emulate`), then run `transform-harness verify` against it."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Verify a runtime end to end",
        long_about = "Verify starts a webhook receiver, loads the transformer blueprint, submits every fixture, waits for matching deliveries, and unloads the transformer.",
        after_help = "Example:\n    transform-harness verify --runtime-url http://localhost:3001 --fixtures fixtures/expected.json"
    )]
    Verify(VerifyArgs),
    #[command(
        about = "Apply the built-in transform to one envelope",
        long_about = "Transform reads an event envelope and prints the record the spread transform produces for it.",
        after_help = "Example:\n    echo '{\"eventId\":\"e1\",\"validTime\":\"2024-01-01T00:00:00Z\",\"payload\":{\"message\":\"hi\"}}' | transform-harness transform"
    )]
    Transform(TransformArgs),
    #[command(
        about = "Serve a local runtime emulator",
        long_about = "Emulate serves /load, /transform/{processId} and /unload/{processId}, running the built-in spread transform and delivering results to each submission's destination.",
        after_help = "Example:\n    transform-harness emulate --bind 127.0.0.1:3001"
    )]
    Emulate(EmulateArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Verify(verify_args) => commands::verify(verify_args).await,
        Command::Transform(transform_args) => commands::transform(transform_args).await,
        Command::Emulate(emulate_args) => commands::emulate(emulate_args).await,
    }
}
