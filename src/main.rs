use std::path::Path;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use iris_nn::bench::InferenceBenchmark;
use iris_nn::pipeline;
use iris_nn::RunConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train a small MLP on the Iris dataset and export it to ONNX")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the classifier and write model.onnx plus the raw dataset dumps
    Train,
    /// Run the exported model over the dumps in the working directory
    Bench {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let cli = Cli::parse();
    let out_dir = Path::new(".");

    match cli.command.unwrap_or(Command::Train) {
        Command::Train => {
            let (history, artifacts) = pipeline::run(&RunConfig::default(), out_dir)?;
            log::info!(
                "wrote {} after {} epochs",
                artifacts.model.display(),
                history.epochs()
            );
        }
        Command::Bench { json } => {
            let result = InferenceBenchmark::load(out_dir)?.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{result}");
            }
        }
    }

    Ok(())
}
