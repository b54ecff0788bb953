use carlot_core::config::{AppConfig, LoadOptions};
use carlot_db::{connect, migrations, ShowroomSeedDataset};

use crate::commands::CommandResult;

pub fn run(count: Option<usize>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let total_count = count.unwrap_or_else(ShowroomSeedDataset::fixed_len);

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = ShowroomSeedDataset::load(&pool, total_count)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let run_result = if seed_result.skipped {
            Ok(SeedOutput { inserted: 0, skipped: true })
        } else {
            let verification = ShowroomSeedDataset::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

            if verification.all_present {
                Ok(SeedOutput { inserted: seed_result.inserted, skipped: false })
            } else {
                let failed_checks = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                let message = if failed_checks.is_empty() {
                    "some seed records failed to load".to_string()
                } else {
                    format!("seed verification failed for: {}", failed_checks.join(", "))
                };
                Err(("seed_verification", message, 6u8))
            }
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(SeedOutput { skipped: true, .. }) => CommandResult::success(
            "seed",
            "inventory already contains vehicles; seed skipped",
        ),
        Ok(SeedOutput { inserted, .. }) => {
            CommandResult::success("seed", format!("seeded {inserted} vehicles into inventory"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    inserted: u64,
    skipped: bool,
}
