use std::env;
use std::sync::Arc;

use futures::StreamExt;
use genstudio::{
    logger, AccountEvents, Config, ControllerState, CredentialProvider, EnvCredentialProvider,
    GeminiClient, GenerationController, GenerationRequest, GenerationStatus, ImageClient,
    Resolution, StaticCredentialProvider, StorageManager,
};

const USAGE: &str = "usage: genstudio <prompt> [low|medium|high] [output.png]\n       genstudio --history [limit]\n       genstudio --balance";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(logger::LoggerConfig::from_env())?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using process environment");
    }
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    logger::log_config_info(&config);

    let storage = StorageManager::new(&config.storage).await?;
    storage
        .ensure_account(&config.account_id, config.initial_credits)
        .await?;

    let events = AccountEvents::new();
    let mut changes = events.stream();
    let gemini = GeminiClient::new(&config.gemini);
    if !ImageClient::supported_models()
        .iter()
        .any(|(id, _, _)| *id == config.gemini.model)
    {
        log::warn!("Model {} is not in the known image model list", config.gemini.model);
    }
    let credentials: Arc<dyn CredentialProvider> = match config.gemini.api_key.clone() {
        Some(key) => Arc::new(StaticCredentialProvider::new(Some(key))),
        None => Arc::new(EnvCredentialProvider::new()),
    };
    let controller = GenerationController::new(
        gemini.image().clone(),
        credentials,
        &storage,
        events,
        config.image_cost,
    );
    let state = controller.mount(&config.account_id).await?;

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            println!("\nmodels (set GEMINI_IMAGE_MODEL):");
            for (id, name, provider) in ImageClient::supported_models() {
                let marker = if id == gemini.image().model() { "*" } else { " " };
                println!("  {} {} - {} ({})", marker, id, name, provider);
            }
        }
        Some("--balance") => {
            println!("{} credits", state.balance().unwrap_or_default());
        }
        Some("--history") => {
            let limit = args.get(1).and_then(|raw| raw.parse().ok()).or(Some(10));
            for entry in controller.history(&config.account_id, limit).await? {
                println!(
                    "{}  {:<6}  {}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.resolution,
                    entry.model_identifier,
                    entry.prompt
                );
            }
        }
        Some(prompt) => {
            let resolution: Resolution = match args.get(1) {
                Some(raw) => raw.parse()?,
                None => Resolution::default(),
            };
            let request = GenerationRequest::new(prompt, resolution)?;

            let next = controller
                .submit_observed(&state, request, |s: &ControllerState| match s.status {
                    GenerationStatus::Checking => log::info!("Checking API key..."),
                    GenerationStatus::Generating => log::info!("Generating..."),
                    _ => {}
                })
                .await;

            if let Some(error) = next.error {
                return Err(error.into());
            }

            if let Some(result) = next.result() {
                let path = args
                    .get(2)
                    .cloned()
                    .unwrap_or_else(|| result.download_name(chrono::Utc::now()));
                let bytes = result.save_to(&path).await?;
                println!("Saved {} ({} bytes)", path, bytes);
            }

            if let Some(Ok(change)) = changes.next().await {
                println!("{} credits remaining", change.credit_balance);
            }
        }
    }

    Ok(())
}
