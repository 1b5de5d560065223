//! Frequency breakdowns of the qualitative bug data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::Grouping;
use crate::domain::Component;
use crate::error::{IacBugsError, Result};
use crate::metrics::BugRecord;
use crate::taxonomy::{
    REPORTED_TEST_INPUT_KINDS, normalize_component, normalize_system_state, root_cause_category,
    test_input_kinds,
};

/// Attribute of a bug being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    /// Observable symptom.
    Symptom,
    /// Root cause category.
    RootCause,
    /// System state requirement.
    SystemState,
    /// Data types of the test input.
    TestInput,
}

impl Dimension {
    /// Column heading of the counted attribute.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Symptom => "Symptom",
            Self::RootCause => "Root Cause Category",
            Self::SystemState => "System state",
            Self::TestInput => "Data type",
        }
    }
}

/// Occurrences of one value within one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRow {
    /// Group the value was counted in.
    pub group: String,
    /// Counted value.
    pub value: String,
    /// Number of bugs with the value.
    pub frequency: usize,
    /// Frequency relative to the group size, in percent.
    pub percentage: f64,
}

/// A frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Counted attribute.
    pub dimension: Dimension,
    /// Column the bugs were grouped by.
    pub group_label: String,
    /// Component the bugs were restricted to, if any.
    pub component: Option<Component>,
    /// Rows sorted by group, then value.
    pub rows: Vec<FrequencyRow>,
}

/// Symptoms per component or ecosystem.
pub fn symptoms(bugs: &[BugRecord], grouping: Grouping) -> Breakdown {
    let entries = bugs
        .iter()
        .map(|bug| (group_key(bug, grouping), Some(bug.symptom.trim().to_string())));
    Breakdown {
        dimension: Dimension::Symptom,
        group_label: grouping.label().to_string(),
        component: None,
        rows: tabulate(entries),
    }
}

/// Root cause categories per ecosystem, restricted to one component.
///
/// Root causes outside the category table are not counted but still belong
/// to their ecosystem's total.
pub fn root_causes(bugs: &[BugRecord], component: Component) -> Breakdown {
    let entries = bugs
        .iter()
        .filter(|bug| normalize_component(bug.component.trim()) == component.label())
        .map(|bug| {
            (
                bug.ecosystem.trim().to_string(),
                root_cause_category(&bug.root_cause).map(str::to_string),
            )
        });
    Breakdown {
        dimension: Dimension::RootCause,
        group_label: Grouping::Ecosystem.label().to_string(),
        component: Some(component),
        rows: tabulate(entries),
    }
}

/// System state requirements per component or ecosystem.
pub fn system_states(bugs: &[BugRecord], grouping: Grouping) -> Breakdown {
    let entries = bugs.iter().map(|bug| {
        let state = normalize_system_state(bug.system_state.trim()).to_string();
        (group_key(bug, grouping), Some(state))
    });
    Breakdown {
        dimension: Dimension::SystemState,
        group_label: grouping.label().to_string(),
        component: None,
        rows: tabulate(entries),
    }
}

/// Share of bugs whose test input involves each reported data type.
///
/// Percentages are relative to `population`, not to the number of bugs with
/// a recorded test input.
pub fn test_inputs(bugs: &[BugRecord], population: usize) -> Result<Breakdown> {
    if population == 0 {
        return Err(IacBugsError::DivisionByZero);
    }

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for description in bugs.iter().filter_map(|bug| bug.test_input.as_deref()) {
        for kind in test_input_kinds(description) {
            *counts.entry(kind).or_default() += 1;
        }
    }

    let rows = REPORTED_TEST_INPUT_KINDS
        .iter()
        .filter_map(|(kind, display)| {
            counts.get(kind).map(|frequency| FrequencyRow {
                group: "All".to_string(),
                value: (*display).to_string(),
                frequency: *frequency,
                percentage: *frequency as f64 / population as f64 * 100.0,
            })
        })
        .collect();

    Ok(Breakdown {
        dimension: Dimension::TestInput,
        group_label: "Population".to_string(),
        component: None,
        rows,
    })
}

fn group_key(bug: &BugRecord, grouping: Grouping) -> String {
    match grouping {
        Grouping::Component => normalize_component(bug.component.trim()).to_string(),
        Grouping::Ecosystem => bug.ecosystem.trim().to_string(),
    }
}

// Rows with an empty group are dropped. Rows with no value only count
// towards their group's size.
fn tabulate<I>(entries: I) -> Vec<FrequencyRow>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut group_sizes: BTreeMap<String, usize> = BTreeMap::new();
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for (group, value) in entries {
        if group.is_empty() {
            continue;
        }
        *group_sizes.entry(group.clone()).or_default() += 1;
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            *counts.entry((group, value)).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|((group, value), frequency)| {
            let size = group_sizes.get(&group).copied().unwrap_or(frequency).max(1);
            FrequencyRow {
                percentage: frequency as f64 / size as f64 * 100.0,
                group,
                value,
                frequency,
            }
        })
        .collect()
}
