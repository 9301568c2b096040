use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::segmentation::SegmentationConfig;

/// Models the automation backend knows how to drive.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-flash-latest",
    "gemini-pro-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-2.0-flash",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub inactivity_threshold_ms: u64,
    pub debounce_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: SegmentationConfig::DEFAULT_INACTIVITY_THRESHOLD_MS,
            debounce_ms: 150,
        }
    }
}

impl WorkflowSettings {
    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig::with_threshold_ms(self.inactivity_threshold_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            bail!("debounce_ms must be greater than zero");
        }
        Ok(())
    }

    /// Applies one-run overrides on top of the stored values.
    pub fn with_overrides(
        mut self,
        threshold_ms: Option<u64>,
        debounce_ms: Option<u64>,
    ) -> Result<Self> {
        if let Some(threshold_ms) = threshold_ms {
            self.inactivity_threshold_ms = threshold_ms;
        }
        if let Some(debounce_ms) = debounce_ms {
            self.debounce_ms = debounce_ms;
        }
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    pub llm_model: String,
    pub analysis_model: String,
    pub headless: bool,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            llm_model: "gemini-flash-latest".into(),
            analysis_model: "gemini-pro-latest".into(),
            headless: false,
        }
    }
}

impl AutomationSettings {
    pub fn validate(&self) -> Result<()> {
        for model in [&self.llm_model, &self.analysis_model] {
            if !AVAILABLE_MODELS.contains(&model.as_str()) {
                bail!(
                    "unknown model '{model}', expected one of: {}",
                    AVAILABLE_MODELS.join(", ")
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub workflow: WorkflowSettings,
    pub automation: AutomationSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}",
                        path.display()
                    );
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn workflow(&self) -> WorkflowSettings {
        self.snapshot().workflow
    }

    pub fn automation(&self) -> AutomationSettings {
        self.snapshot().automation
    }

    pub fn update_workflow(&self, settings: WorkflowSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.workflow = settings;
        self.persist(&guard)
    }

    pub fn update_automation(&self, settings: AutomationSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.automation = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
