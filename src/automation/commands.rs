use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::dashboard::{DashboardPresenter, TerminalSurface};
use crate::db::Database;
use crate::segmentation::SegmentationConfig;
use crate::settings::AutomationSettings;

use super::request::{AutomateOptions, AutomateRequest, TaskRequest};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Default)]
pub struct AutomateArgs {
    pub start_url: Option<String>,
    pub task_description: Option<String>,
    pub input_values: BTreeMap<String, String>,
    /// Overrides the stored `headless` preference when set.
    pub headless: Option<bool>,
    pub output: Option<PathBuf>,
}

/// Builds the replay request for workflow `index` and writes it to `output`
/// (stdout when `None`).
pub async fn automate(
    db: &Database,
    config: SegmentationConfig,
    settings: &AutomationSettings,
    index: usize,
    args: AutomateArgs,
) -> Result<AutomateRequest> {
    let presenter = DashboardPresenter::new(db.clone(), config, Box::new(TerminalSurface::new()));
    let available = presenter.refresh_quietly().await?;
    let workflow = presenter
        .workflow(index)
        .await
        .ok_or_else(|| anyhow!("workflow {index} does not exist ({available} available)"))?;

    let request = AutomateRequest::from_workflow(
        &workflow,
        AutomateOptions {
            start_url: args.start_url,
            headless: args.headless.unwrap_or(settings.headless),
            task_description: args.task_description,
            input_values: args.input_values,
        },
    )?;

    emit(&request, args.output.as_deref()).await?;
    log_debug!("workflow {index} steps:\n{}", workflow.summary());
    log_info!(
        "prepared automation request for workflow {index} ({} event(s), model {})",
        request.events.len(),
        settings.llm_model
    );
    Ok(request)
}

pub async fn task(
    settings: &AutomationSettings,
    text: &str,
    input_values: BTreeMap<String, String>,
    headless: Option<bool>,
    output: Option<PathBuf>,
) -> Result<TaskRequest> {
    if text.trim().is_empty() {
        return Err(anyhow!("task description is empty"));
    }
    let request = TaskRequest::new(text, headless.unwrap_or(settings.headless), input_values);
    emit(&request, output.as_deref()).await?;
    Ok(request)
}

async fn emit<T: Serialize>(request: &T, output: Option<&Path>) -> Result<()> {
    let serialized =
        serde_json::to_string_pretty(request).context("failed to serialize automation request")?;
    match output {
        Some(path) => tokio::fs::write(path, serialized)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{serialized}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::presenter::tests::click_at;

    #[tokio::test]
    async fn automate_writes_request_for_selected_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        for ts in [0, 1_000, 900_000] {
            db.append_event(&click_at(ts)).await.unwrap();
        }

        let target = dir.path().join("request.json");
        let settings = AutomationSettings {
            headless: true,
            ..AutomationSettings::default()
        };
        let request = automate(
            &db,
            SegmentationConfig::default(),
            &settings,
            1,
            AutomateArgs {
                output: Some(target.clone()),
                ..AutomateArgs::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(request.workflow_id, "1");
        assert_eq!(request.events.len(), 1);
        assert!(request.headless);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(written["events"][0]["timestamp"], 900_000);
        assert_eq!(written["start_url"], "https://a.test");
    }

    #[tokio::test]
    async fn automate_rejects_unknown_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("events.sqlite3")).unwrap();
        let err = automate(
            &db,
            SegmentationConfig::default(),
            &AutomationSettings::default(),
            0,
            AutomateArgs::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn empty_task_is_rejected() {
        let err = task(&AutomationSettings::default(), "  ", BTreeMap::new(), None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
