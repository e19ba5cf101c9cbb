//! Aggregated status views over the MotoPick port space.
//!
//! Each view is one batched read, grouped by unit and field.

use crate::provider::{ReadResult, VariableProvider};
use crate::store::{conveyor_port, robot_port, system_port};
use crate::value::VariableValue;
use std::collections::BTreeMap;

/// Fields polled for the `System` view.
pub const SYSTEM_VIEW_FIELDS: [&str; 5] = [
    "Running",
    "Error",
    "PicksPerMinute",
    "TotalPicks",
    "MissedItems",
];

/// Fields polled for each robot.
pub const ROBOT_VIEW_FIELDS: [&str; 4] = ["Running", "Error", "PicksPerMinute", "TotalPicks"];

/// Fields polled for each conveyor.
pub const CONVEYOR_VIEW_FIELDS: [&str; 3] = ["Running", "Speed", "ActualSpeed"];

/// Unit key for port names without a unit segment.
const UNKNOWN_UNIT: &str = "Unknown";

/// `field -> value` for one unit.
pub type UnitFields = BTreeMap<String, Option<VariableValue>>;

/// Grouped result of a status view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveView {
    /// `unit -> field -> value`, keyed by the names the reply carried.
    pub units: BTreeMap<String, UnitFields>,
    /// `true` when the data came from the simulated port space.
    pub simulated: bool,
}

impl LiveView {
    pub fn unit(&self, unit: &str) -> Option<&UnitFields> {
        self.units.get(unit)
    }

    /// Value of `unit.field`, flattening "absent" and "not reported".
    pub fn value(&self, unit: &str, field: &str) -> Option<&VariableValue> {
        self.units.get(unit)?.get(field)?.as_ref()
    }
}

/// Splits `Arp.Plc.Eclr/MotoPick.Robot01.Running` into `("Robot01", "Running")`.
pub fn split_port_name(name: &str) -> (&str, &str) {
    let mut segments = name.rsplit('.');
    let field = segments.next().unwrap_or(name);
    let unit = segments.next().unwrap_or(UNKNOWN_UNIT);
    (unit, field)
}

/// Groups results by unit and field.
pub fn group_by_unit(results: Vec<ReadResult>, simulated: bool) -> LiveView {
    let mut units: BTreeMap<String, UnitFields> = BTreeMap::new();
    for result in results {
        let (unit, field) = split_port_name(&result.name);
        units
            .entry(unit.to_string())
            .or_default()
            .insert(field.to_string(), result.value);
    }
    LiveView { units, simulated }
}

async fn read_view(provider: &dyn VariableProvider, names: Vec<String>) -> LiveView {
    let results = provider.read_multiple(&names).await;
    group_by_unit(results, !provider.is_connected())
}

pub async fn read_system(provider: &dyn VariableProvider) -> LiveView {
    let names = SYSTEM_VIEW_FIELDS.iter().map(|f| system_port(f)).collect();
    read_view(provider, names).await
}

/// Robots `1..=count`. A count of zero issues an empty read.
pub async fn read_robots(provider: &dyn VariableProvider, count: usize) -> LiveView {
    let names = (1..=count)
        .flat_map(|i| ROBOT_VIEW_FIELDS.iter().map(move |f| robot_port(i, f)))
        .collect();
    read_view(provider, names).await
}

/// Conveyors `1..=count`.
pub async fn read_conveyors(provider: &dyn VariableProvider, count: usize) -> LiveView {
    let names = (1..=count)
        .flat_map(|i| CONVEYOR_VIEW_FIELDS.iter().map(move |f| conveyor_port(i, f)))
        .collect();
    read_view(provider, names).await
}
