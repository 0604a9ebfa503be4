#[tokio::main]
async fn main() {
    markdoc_ls::server::run().await;
}
