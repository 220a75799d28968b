use std::io;
use std::process::ExitCode;

use clap::Parser;
use rps::Server;

#[derive(Parser)]
#[command(
    name = "rps-server",
    about = "Authoritative server for two-player Rock-Paper-Scissors matches"
)]
struct Args {
    /// Bind host, positional form (default 0.0.0.0)
    bind_ip: Option<String>,
    /// Port, positional form (default 2500)
    port: Option<u16>,
    /// Bind host, long-flag form
    #[arg(long)]
    bind: Option<String>,
    /// Port, long-flag form
    #[arg(long = "port")]
    port_flag: Option<u16>,
    /// Raise the tracing log level to debug
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(level).init();

    let host = args
        .bind
        .or(args.bind_ip)
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = args.port_flag.or(args.port).unwrap_or(2500);
    let bind_addr = format!("{host}:{port}");

    let mut server = Server::new(&bind_addr);
    if let Err(e) = server.start() {
        eprintln!("failed to start server: {e}");
        return ExitCode::FAILURE;
    }

    println!("rps-server listening on {bind_addr} — press Enter to stop");
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);

    server.stop();
    ExitCode::SUCCESS
}
