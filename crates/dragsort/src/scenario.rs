//! Scripted reorder scenarios
//!
//! A scenario is a YAML list of steps replayed against a fresh
//! `MemoryPivotStore`. Failing steps are recorded in the report instead of
//! aborting the run, so stale ids and exhausted key spaces can be observed.
//!
//! ```yaml
//! relation: playlist
//! owner: p1
//! steps:
//!   - attach: { member: a }
//!   - attach: { member: b }
//!   - move: { member: b, after: a }
//!   - detach: { member: a }
//!   - rebalance
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::OrderingConfig;
use crate::ordering::SiblingOrdering;
use crate::pivot::DefaultPivot;
use crate::storage::MemoryPivotStore;
use dragsort_core::{AttachMethod, Position, Relation, SortError, SortErrorReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub relation: String,
    pub owner: String,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Attach {
        member: String,
        #[serde(default)]
        method: AttachMethod,
        #[serde(default)]
        position: Position,
    },
    Move {
        member: String,
        #[serde(default)]
        before: Option<String>,
        #[serde(default)]
        after: Option<String>,
    },
    Detach {
        member: String,
    },
    Rebalance,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SortErrorReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    /// Members in display order after the last step
    pub order: Vec<String>,
    pub sort_values: Vec<(String, i64)>,
}

impl Scenario {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse scenario YAML {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)?;
        Ok(scenario)
    }
}

/// Replay `scenario` on an empty in-memory relation.
pub async fn run_scenario(scenario: &Scenario, config: &OrderingConfig) -> Result<ScenarioReport> {
    let store: MemoryPivotStore<DefaultPivot, String> =
        MemoryPivotStore::new().with_atomic_batches(config.atomic_batches);
    let ordering = SiblingOrdering::new(Arc::new(store), config);
    let relation = Relation::new(scenario.relation.clone(), scenario.owner.clone());

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let outcome = run_step(&ordering, &relation, step).await;
        if let Err(e) = &outcome {
            tracing::warn!("[Scenario] Step {:?} failed: {}", step, e);
        }
        let (sort_value, error) = match outcome {
            Ok(sort_value) => (sort_value, None),
            Err(e) => (None, Some(SortErrorReport::from(&e))),
        };
        steps.push(StepReport {
            step: step.clone(),
            sort_value,
            error,
        });
    }

    let order = ordering
        .get_sorted(&relation)
        .await
        .context("Failed to read final order")?;
    let sort_values = ordering.store().sort_values(&relation)?;

    Ok(ScenarioReport {
        steps,
        order,
        sort_values,
    })
}

async fn run_step(
    ordering: &SiblingOrdering<MemoryPivotStore<DefaultPivot, String>, DefaultPivot>,
    relation: &Relation<String>,
    step: &Step,
) -> std::result::Result<Option<i64>, SortError> {
    match step {
        Step::Attach {
            member,
            method,
            position,
        } => {
            ordering
                .store()
                .upsert_member(member.clone(), member.clone())?;
            let pivot = DefaultPivot::new(relation.require_owner()?.clone(), member.clone());
            ordering.attach(relation, pivot, *method, *position).await
        }
        Step::Move {
            member,
            before,
            after,
        } => ordering
            .move_member(relation, member, before.as_ref(), after.as_ref())
            .await
            .map(Some),
        Step::Detach { member } => {
            let removed = ordering.store().detach(relation, member)?;
            if !removed {
                return Err(SortError::PivotNotFound {
                    member_id: member.clone(),
                });
            }
            Ok(None)
        }
        Step::Rebalance => ordering.resolve_conflict(relation).await.map(|_| None),
    }
}
