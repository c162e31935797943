use env_logger::Env;
use shift_report::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    log::info!(
        "Using spreadsheet {} (roster '{}', log '{}')",
        config.spreadsheet_id,
        config.roster_sheet,
        config.log_sheet
    );

    shift_report::run(config).await?;

    Ok(())
}
