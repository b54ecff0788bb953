use std::io::Write as _;
use std::process::ExitCode;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use carlot_agent::{Console, DialogueLoop, EntryAnalyzer, Inventory, OllamaClient};
use carlot_core::config::{AppConfig, LoadOptions};
use carlot_core::domain::filters::FilterMap;
use carlot_core::domain::vehicle::Vehicle;
use carlot_db::{connect, migrations, SqlVehicleRepository, VehicleRepository};

pub fn run() -> ExitCode {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration issue: {error}");
            return ExitCode::from(2);
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to initialize async runtime: {error}");
            return ExitCode::from(3);
        }
    };

    match runtime.block_on(chat_session(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("chat session failed: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn chat_session(config: &AppConfig) -> Result<()> {
    let pool = connect(&config.database).await?;
    migrations::run_pending(&pool).await?;

    let inventory = SqlInventory { repository: SqlVehicleRepository::new(pool.clone()) };
    let analyzer = EntryAnalyzer::new(OllamaClient::new(&config.llm)?);

    tracing::info!(
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        "starting chat session"
    );

    DialogueLoop::new(analyzer, inventory, StdConsole::new()).run().await?;

    pool.close().await;
    Ok(())
}

fn init_logging(config: &AppConfig) {
    use carlot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

struct SqlInventory {
    repository: SqlVehicleRepository,
}

#[async_trait]
impl Inventory for SqlInventory {
    async fn search(&self, filters: &FilterMap) -> Result<Vec<Vehicle>> {
        Ok(self.repository.search(filters).await?)
    }
}

struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    fn new() -> Self {
        Self { lines: BufReader::new(tokio::io::stdin()).lines() }
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self) -> Result<Option<String>> {
        print!("You: ");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    async fn say(&mut self, line: &str) -> Result<()> {
        println!("{line}");
        Ok(())
    }
}
