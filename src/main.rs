#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = kambaz_api::run().await {
        eprintln!("kambaz-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
