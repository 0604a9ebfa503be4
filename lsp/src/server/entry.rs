use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use super::{cli::try_cli, state::MarkdocLanguageServer};

pub(crate) const LOG_ENV: &str = "MARKDOC_LS_LOG";

pub async fn run() {
    if let Some(output) = try_cli().unwrap_or_else(|e| {
        eprintln!("markdoc-ls error: {e}");
        std::process::exit(2);
    }) {
        println!("{}", output);
        return;
    }

    // stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(MarkdocLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
