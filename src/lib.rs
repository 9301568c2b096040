pub mod automation;
pub mod capture;
pub mod cli;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod segmentation;
pub mod settings;
pub mod utils;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use automation::commands::AutomateArgs;
use capture::{commands::record, CaptureSink, EventBus};
use cli::{Cli, Commands, ConfigAction};
use dashboard::{commands as dashboard_commands, DetailOptions};
use db::Database;
use settings::{SettingsStore, WorkflowSettings};

const DB_FILE_NAME: &str = "autopattern.sqlite3";
const SETTINGS_FILE_NAME: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
    /// Stored workflow settings with this run's CLI overrides applied.
    pub(crate) workflow: WorkflowSettings,
}

impl AppState {
    fn open(data_dir: &Path, threshold_ms: Option<u64>, debounce_ms: Option<u64>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DB_FILE_NAME))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;

        let workflow = settings
            .workflow()
            .with_overrides(threshold_ms, debounce_ms)
            .context("invalid workflow override")?;

        Ok(Self {
            db,
            settings,
            workflow,
        })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("autopattern"))
        .context("no data directory for this platform; pass --data-dir")
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    utils::logging::init(cli.verbose);

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    log::debug!("Using data directory {}", data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(dispatch(cli, data_dir))
}

async fn dispatch(cli: Cli, data_dir: PathBuf) -> Result<()> {
    let command = match cli.command {
        // Offline segmentation never opens the store.
        Commands::Segment { file } => {
            let frame = segment_file(&data_dir, &file, cli.threshold_ms).await?;
            print!("{frame}");
            return Ok(());
        }
        command => command,
    };

    let state = AppState::open(&data_dir, cli.threshold_ms, cli.debounce_ms)?;
    log::debug!("Using event store at {}", state.db.path().display());
    let segmentation = state.workflow.segmentation();

    match command {
        Commands::Record { input } => {
            let sink = CaptureSink::new(state.db.clone(), EventBus::new());
            let stats = record(&sink, input).await?;
            let total = state.db.count_events().await?;
            println!(
                "{} stored, {} rejected of {} received ({total} event(s) in store)",
                stats.stored, stats.rejected, stats.received
            );
        }
        Commands::Watch { input } => {
            dashboard_commands::record_with_dashboard(&state.db, &state.workflow, input).await?;
        }
        Commands::Workflows => {
            dashboard_commands::list_workflows(&state.db, segmentation).await?;
        }
        Commands::Show { index, expand } => {
            let options = if expand {
                DetailOptions::expanded()
            } else {
                DetailOptions::default()
            };
            dashboard_commands::show_workflow(&state.db, segmentation, index, options).await?;
        }
        Commands::Export { output } => {
            let path = export::export_events(&state.db, output).await?;
            println!("{}", path.display());
        }
        Commands::Automate {
            index,
            start_url,
            task,
            inputs,
            headless,
            output,
        } => {
            let args = AutomateArgs {
                start_url,
                task_description: task,
                input_values: automation::parse_input_values(&inputs)?,
                headless,
                output,
            };
            automation::commands::automate(
                &state.db,
                segmentation,
                &state.settings.automation(),
                index,
                args,
            )
            .await?;
        }
        Commands::Task {
            text,
            inputs,
            headless,
            output,
        } => {
            let input_values = automation::parse_input_values(&inputs)?;
            automation::commands::task(
                &state.settings.automation(),
                &text,
                input_values,
                headless,
                output,
            )
            .await?;
        }
        Commands::Config { action } => configure(&state.settings, action)?,
        Commands::Segment { .. } => {}
    }

    Ok(())
}

/// Segments an exported file with the stored threshold (or this run's override)
/// and returns the rendered list. Reads `settings.json` but never the store.
async fn segment_file(data_dir: &Path, file: &Path, threshold_ms: Option<u64>) -> Result<String> {
    let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;
    let workflow = settings.workflow().with_overrides(threshold_ms, None)?;
    let events = export::load_export(file).await?;
    let workflows = segmentation::segment_events(events, &workflow.segmentation())?;
    Ok(dashboard::render::render_list(&workflows))
}

fn configure(settings: &SettingsStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings.snapshot())?);
        }
        ConfigAction::Set {
            threshold_ms,
            debounce_ms,
            llm_model,
            analysis_model,
            headless,
        } => {
            if threshold_ms.is_some() || debounce_ms.is_some() {
                let mut workflow = settings.workflow();
                if let Some(value) = threshold_ms {
                    workflow.inactivity_threshold_ms = value;
                }
                if let Some(value) = debounce_ms {
                    workflow.debounce_ms = value;
                }
                settings.update_workflow(workflow)?;
            }

            if llm_model.is_some() || analysis_model.is_some() || headless.is_some() {
                let mut automation = settings.automation();
                if let Some(value) = llm_model {
                    automation.llm_model = value;
                }
                if let Some(value) = analysis_model {
                    automation.analysis_model = value;
                }
                if let Some(value) = headless {
                    automation.headless = value;
                }
                settings.update_automation(automation)?;
            }

            log::info!("Settings updated");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_events(path: &Path, timestamps: &[i64]) {
        let events: Vec<_> = timestamps
            .iter()
            .map(|ts| serde_json::json!({ "timestamp": ts, "event": "click", "url": "https://a.test" }))
            .collect();
        std::fs::write(path, serde_json::to_string(&events).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn offline_segmentation_uses_stored_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("events.json");
        write_events(&file, &[0, 100_000]);

        let frame = segment_file(dir.path(), &file, None).await.unwrap();
        assert!(frame.starts_with("Workflows (1)"));

        SettingsStore::new(dir.path().join(SETTINGS_FILE_NAME))
            .unwrap()
            .update_workflow(WorkflowSettings {
                inactivity_threshold_ms: 60_000,
                ..WorkflowSettings::default()
            })
            .unwrap();

        let frame = segment_file(dir.path(), &file, None).await.unwrap();
        assert!(frame.starts_with("Workflows (2)"));

        let frame = segment_file(dir.path(), &file, Some(200_000)).await.unwrap();
        assert!(frame.starts_with("Workflows (1)"));
        assert!(!dir.path().join(DB_FILE_NAME).exists());
    }

    #[test]
    fn zero_debounce_override_is_refused_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::open(dir.path(), None, Some(0)).is_err());

        let state = AppState::open(dir.path(), Some(1_000), Some(25)).unwrap();
        assert_eq!(state.workflow.inactivity_threshold_ms, 1_000);
        assert_eq!(state.workflow.debounce_ms, 25);
    }
}
