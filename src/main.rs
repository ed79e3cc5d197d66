use anyhow::{bail, Context};

/// Valid ports are the open interval (1024, 65536); `u16` already bounds the
/// upper end, so only the lower bound needs an explicit check.
const MIN_PORT: u16 = 1024;

fn parse_port(arg: &str) -> anyhow::Result<u16> {
    let port: u16 = arg
        .parse()
        .with_context(|| format!("'{arg}' is not a valid port number"))?;
    if port <= MIN_PORT {
        bail!("port must be > {MIN_PORT} (got {port})");
    }
    Ok(port)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "cacheproxy".to_string());
    let port_arg = match args.next() {
        Some(arg) => arg,
        None => {
            eprintln!("usage: {program} <port>");
            std::process::exit(1);
        }
    };

    let port = match parse_port(&port_arg) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    cacheproxy::run_server(port).await
}
