// src/autofill.rs
//! Best-effort filler for application forms of unknown shape.
//!
//! The goal is a submittable form, not a correct one: empty text fields get an
//! innocuous placeholder, selects their first real option, radio groups a
//! "yes" answer when one is offered, checkboxes are ticked. Nothing here ever
//! invents salary figures or work history.

use crate::browser::JobPage;
use crate::pacing::Pacer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const AFFIRMATIVE_MARKER: &str = "yes";

/// Opaque handle the browser driver uses to find a control again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Text,
    Tel,
    TextArea,
    Select,
    Radio,
    Checkbox,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

/// Snapshot of one form control as the page reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormControl {
    pub id: ControlId,
    pub kind: ControlKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl FormControl {
    fn describe(&self) -> &str {
        self.label
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unnamed control")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillAction {
    Type { control: ControlId, text: String },
    Select { control: ControlId, value: String },
    Click { control: ControlId },
}

impl FillAction {
    pub fn control(&self) -> ControlId {
        match self {
            Self::Type { control, .. } | Self::Select { control, .. } | Self::Click { control } => *control,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FillDefaults {
    pub phone: String,
    pub text: String,
}

impl Default for FillDefaults {
    fn default() -> Self {
        Self {
            phone: "555-555-5555".to_string(),
            text: "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub planned: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Decide what to do with each control: text, then selects, radios, checkboxes.
pub fn plan(controls: &[FormControl], defaults: &FillDefaults) -> Vec<FillAction> {
    let mut actions = Vec::new();

    for control in controls {
        let placeholder = match control.kind {
            ControlKind::Tel => &defaults.phone,
            ControlKind::Text | ControlKind::TextArea => &defaults.text,
            _ => continue,
        };
        if !control.visible || !control.enabled || !control.value.trim().is_empty() {
            continue;
        }
        actions.push(FillAction::Type {
            control: control.id,
            text: placeholder.clone(),
        });
    }

    for control in controls.iter().filter(|c| c.kind == ControlKind::Select) {
        if !control.enabled {
            continue;
        }
        if let Some(option) = control
            .options
            .iter()
            .find(|opt| !opt.disabled && !opt.value.is_empty())
        {
            actions.push(FillAction::Select {
                control: control.id,
                value: option.value.clone(),
            });
        }
    }

    for group in radio_groups(controls) {
        let choice = group
            .iter()
            .find(|radio| {
                radio
                    .label
                    .as_deref()
                    .is_some_and(|label| label.to_lowercase().contains(AFFIRMATIVE_MARKER))
            })
            .or_else(|| group.first());
        if let Some(radio) = choice {
            actions.push(FillAction::Click { control: radio.id });
        }
    }

    for control in controls.iter().filter(|c| c.kind == ControlKind::Checkbox) {
        if control.enabled && !control.checked {
            actions.push(FillAction::Click { control: control.id });
        }
    }

    actions
}

/// Enabled radios grouped by name, groups in first-seen order.
fn radio_groups(controls: &[FormControl]) -> Vec<Vec<&FormControl>> {
    let mut groups: Vec<(Option<&str>, Vec<&FormControl>)> = Vec::new();
    for radio in controls
        .iter()
        .filter(|c| c.kind == ControlKind::Radio && c.enabled)
    {
        let name = radio.name.as_deref();
        match groups.iter_mut().find(|(group_name, _)| *group_name == name) {
            Some((_, members)) => members.push(radio),
            None => groups.push((name, vec![radio])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Snapshot the form, plan, and apply each action independently.
pub async fn autofill(page: &dyn JobPage, pacer: &Pacer, defaults: &FillDefaults) -> FillReport {
    let controls = match page.form_controls().await {
        Ok(controls) => controls,
        Err(e) => {
            warn!("Could not read form controls: {}", e);
            return FillReport::default();
        }
    };

    let actions = plan(&controls, defaults);
    let mut report = FillReport {
        planned: actions.len(),
        ..FillReport::default()
    };

    for action in &actions {
        let label = controls
            .iter()
            .find(|c| c.id == action.control())
            .map(FormControl::describe)
            .unwrap_or("unnamed control");

        if matches!(action, FillAction::Type { .. }) {
            pacer.pause().await;
        }

        match page.apply(action).await {
            Ok(()) => {
                debug!("Filled {}: {:?}", label, action);
                report.applied += 1;
            }
            Err(e) => {
                warn!("Skipped form element {}: {}", label, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Autofill applied {}/{} actions ({} failed)",
        report.applied, report.planned, report.failed
    );
    report
}
