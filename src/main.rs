use std::path::PathBuf;
use std::sync::Arc;

use planner_core::logging::init_logging;
use planner_core::{HttpBackend, LogNotifier, Planner, Storage, SystemClock, TokioTimers};

const DATA_DIR_ENV: &str = "PLANNER_DATA_DIR";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("planner-data"));
    let _logger = init_logging(&data_dir)?;

    let storage = Storage::new(data_dir);
    let settings = storage.load_settings_or_default();
    let backend = HttpBackend::new(&settings)?;

    let mut planner = Planner::new(
        backend,
        Arc::new(LogNotifier),
        TokioTimers::current(),
        Arc::new(SystemClock),
        storage,
        settings,
    );

    let armed = planner.refresh_events().await?;
    planner.refresh_tasks().await?;
    println!(
        "{} events, {} reminders armed ({})",
        planner.events().len(),
        armed,
        planner.lead_time().caption()
    );
    for cohort in planner.cohorts() {
        println!(
            "{}: {} / {} completed ({}%)",
            cohort.heading(),
            cohort.completed_count,
            cohort.total_count,
            cohort.rounded_percentage()
        );
    }

    tokio::signal::ctrl_c().await?;
    planner.shutdown();
    log::info!("planner: stopped");
    Ok(())
}
