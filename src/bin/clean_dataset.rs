use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use groundwater_chat::{
    logging,
    services::dataset_loader::{self, DatasetSource},
};

#[derive(Parser)]
#[command(name = "clean_dataset")]
#[command(about = "Strip line breaks from column names, drop blank rows and re-save as CSV", long_about = None)]
struct Cli {
    /// Source CSV or XLSX file, or an http(s) URL
    #[arg(long, default_value = "data/finaldataset.csv")]
    input: String,
    /// Where to write the cleaned CSV
    #[arg(long, default_value = "data/finaldataset_clean.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    let source = DatasetSource::parse(&cli.input);
    let dataset = dataset_loader::load_dataset(&source)
        .await
        .with_context(|| format!("failed to load {}", source))?;

    dataset_loader::write_csv(&dataset, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    tracing::info!("Columns: {:?}", dataset.columns());
    tracing::info!("Rows: {}", dataset.len());
    tracing::info!("Saved as: {}", cli.output.display());

    Ok(())
}
