#[tokio::main]
async fn main() -> anyhow::Result<()> {
    askdb_server::start().await
}
