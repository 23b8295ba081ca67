#[tokio::main]
async fn main() {
    if let Err(e) = medrecon_lib::run().await {
        eprintln!("medrecon: {e}");
        std::process::exit(1);
    }
}
