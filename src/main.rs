use clap::Parser;
use ozon_slot_engine::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
