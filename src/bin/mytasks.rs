use clap::Parser;
use mytasks_api_rust::cli::Cli;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = mytasks_api_rust::cli::run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
