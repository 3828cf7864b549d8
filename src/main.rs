use clap::Parser;
use pension_allowance::api::{Cli, Command, run_http_server, run_report};

#[tokio::main]
async fn main() {
    pension_allowance::telemetry::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            if let Err(e) = run_http_server(args).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Report(args) => match run_report(&args) {
            Ok(report) => print!("{report}"),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
        },
    }
}
