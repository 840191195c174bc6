#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    magitech_server::logging::init_from_env();

    let app = magitech_server::App::new().await?;
    app.run().await?;

    Ok(())
}
