use ocorrencias::app;
use ocorrencias::config::Config;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let mut config = Config::from_env();

    // Optional command-line override of the bind address
    let args: Vec<String> = env::args().collect();
    if args.len() >= 2 {
        config.bind_addr = args[1].clone();
    }

    // Start the web application
    app::run(config).await?;

    Ok(())
}
