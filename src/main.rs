#[tokio::main]
async fn main() {
  // Minimal CLI: --version, --help and the liveness poller
  let mut args = std::env::args().skip(1);
  if let Some(arg) = args.next() {
    if arg == "--version" || arg == "-V" {
      println!("mailrelay {}", env!("CARGO_PKG_VERSION"));
      return;
    }
    if arg == "--healthcheck" {
      let url = args
        .next()
        .unwrap_or_else(|| mailrelay::app::DEFAULT_HEALTH_URL.to_string());
      let healthy = mailrelay::app::healthcheck(&url).await;
      std::process::exit(if healthy { 0 } else { 1 });
    }
    // Any other arg prints help
    eprintln!("Usage: mailrelay [--version | --healthcheck [URL]]");
    return;
  }

  if let Err(e) = mailrelay::app::run().await {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}
