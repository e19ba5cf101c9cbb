//! The simulated port space.
//!
//! Populated once with the cell's default topology and then mutated by
//! simulated writes. Never persisted.

use crate::value::VariableValue;
use std::collections::BTreeMap;

/// Namespace and program instance every MotoPick port lives under.
pub const PORT_PREFIX: &str = "Arp.Plc.Eclr/MotoPick";

/// Highest robot index in the default topology.
pub const MAX_ROBOTS: usize = 8;

/// Highest conveyor index in the default topology.
pub const MAX_CONVEYORS: usize = 16;

/// Units with an index up to this one start enabled.
pub const DEFAULT_ENABLED_UNITS: usize = 2;

/// Fields of the `System` group.
pub const SYSTEM_FIELDS: [&str; 7] = [
    "Running",
    "Connected",
    "Error",
    "ErrorCode",
    "PicksPerMinute",
    "TotalPicks",
    "MissedItems",
];

/// Fields of each `RobotNN` group.
pub const ROBOT_FIELDS: [&str; 10] = [
    "Enabled",
    "Running",
    "Error",
    "ErrorCode",
    "PicksPerMinute",
    "TotalPicks",
    "Efficiency",
    "X",
    "Y",
    "Z",
];

/// Fields of each `ConveyorNN` group.
pub const CONVEYOR_FIELDS: [&str; 6] = [
    "Enabled",
    "Running",
    "Speed",
    "ActualSpeed",
    "ItemsDetected",
    "ItemsLeft",
];

/// `Arp.Plc.Eclr/MotoPick.<unit>.<field>`
pub fn unit_port(unit: &str, field: &str) -> String {
    format!("{PORT_PREFIX}.{unit}.{field}")
}

pub fn system_port(field: &str) -> String {
    unit_port("System", field)
}

/// Robot indices are 1-based and rendered with two digits (`Robot01`).
pub fn robot_port(index: usize, field: &str) -> String {
    unit_port(&format!("Robot{index:02}"), field)
}

/// Conveyor indices are 1-based and rendered with two digits (`Conveyor01`).
pub fn conveyor_port(index: usize, field: &str) -> String {
    unit_port(&format!("Conveyor{index:02}"), field)
}

/// Default value of a field: flags are `false`, counters are integer zero,
/// rates and kinematics are floating zero.
fn default_value(field: &str, index: usize) -> VariableValue {
    match field {
        "Enabled" => VariableValue::Bool(index <= DEFAULT_ENABLED_UNITS),
        "Running" | "Connected" | "Error" => VariableValue::Bool(false),
        "ErrorCode" | "TotalPicks" | "MissedItems" | "ItemsDetected" | "ItemsLeft" => {
            VariableValue::I32(0)
        }
        _ => VariableValue::F64(0.0),
    }
}

/// In-memory mapping from port name to current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: BTreeMap<String, VariableValue>,
}

impl VariableStore {
    /// Builds the default topology: the system group, robots `01..=08`,
    /// conveyors `01..=16`.
    pub fn initialize() -> Self {
        let mut values = BTreeMap::new();

        for field in SYSTEM_FIELDS {
            values.insert(system_port(field), default_value(field, 0));
        }
        for index in 1..=MAX_ROBOTS {
            for field in ROBOT_FIELDS {
                values.insert(robot_port(index, field), default_value(field, index));
            }
        }
        for index in 1..=MAX_CONVEYORS {
            for field in CONVEYOR_FIELDS {
                values.insert(conveyor_port(index, field), default_value(field, index));
            }
        }

        tracing::debug!(count = values.len(), "Simulated port space initialized");
        Self { values }
    }

    /// A missing port is absent, not an error.
    pub fn get(&self, name: &str) -> Option<VariableValue> {
        self.values.get(name).cloned()
    }

    /// Inserts or overwrites.
    pub fn set(&mut self, name: impl Into<String>, value: VariableValue) {
        self.values.insert(name.into(), value);
    }

    /// An independent copy of every port and value.
    pub fn snapshot(&self) -> BTreeMap<String, VariableValue> {
        self.values.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology_counts() {
        let store = VariableStore::initialize();
        assert_eq!(store.len(), 7 + 8 * 10 + 16 * 6);

        let snapshot = store.snapshot();
        let system = snapshot.keys().filter(|k| k.contains(".System.")).count();
        let robots = snapshot.keys().filter(|k| k.contains(".Robot")).count();
        let conveyors = snapshot.keys().filter(|k| k.contains(".Conveyor")).count();
        assert_eq!(system, 7);
        assert_eq!(robots, 80);
        assert_eq!(conveyors, 96);
    }

    #[test]
    fn test_default_enabled_units() {
        let store = VariableStore::initialize();
        for index in 1..=MAX_ROBOTS {
            assert_eq!(
                store.get(&robot_port(index, "Enabled")),
                Some(VariableValue::Bool(index <= 2)),
                "robot {index}"
            );
        }
        for index in 1..=MAX_CONVEYORS {
            assert_eq!(
                store.get(&conveyor_port(index, "Enabled")),
                Some(VariableValue::Bool(index <= 2)),
                "conveyor {index}"
            );
        }
    }

    #[test]
    fn test_default_values_are_zero() {
        let store = VariableStore::initialize();
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.System.Running"),
            Some(VariableValue::Bool(false))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.System.ErrorCode"),
            Some(VariableValue::I32(0))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.System.PicksPerMinute"),
            Some(VariableValue::F64(0.0))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.Robot08.Z"),
            Some(VariableValue::F64(0.0))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.Robot03.TotalPicks"),
            Some(VariableValue::I32(0))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.Conveyor16.ItemsLeft"),
            Some(VariableValue::I32(0))
        );
        assert_eq!(
            store.get("Arp.Plc.Eclr/MotoPick.Conveyor16.ActualSpeed"),
            Some(VariableValue::F64(0.0))
        );
    }

    #[test]
    fn test_index_formatting_is_zero_padded() {
        assert_eq!(
            robot_port(1, "Running"),
            "Arp.Plc.Eclr/MotoPick.Robot01.Running"
        );
        assert_eq!(
            conveyor_port(16, "Speed"),
            "Arp.Plc.Eclr/MotoPick.Conveyor16.Speed"
        );
        let store = VariableStore::initialize();
        assert!(store.get("Arp.Plc.Eclr/MotoPick.Robot1.Running").is_none());
        assert!(store.get("Arp.Plc.Eclr/MotoPick.Robot09.Running").is_none());
        assert!(store.get("Arp.Plc.Eclr/MotoPick.Conveyor17.Running").is_none());
    }

    #[test]
    fn test_get_missing_is_absent() {
        let store = VariableStore::initialize();
        assert_eq!(store.get("X.Y"), None);
    }

    #[test]
    fn test_set_inserts_and_overwrites() {
        let mut store = VariableStore::initialize();
        let before = store.len();

        store.set("X.Y", VariableValue::I32(42));
        assert_eq!(store.get("X.Y"), Some(VariableValue::I32(42)));
        assert_eq!(store.len(), before + 1);

        // A different kind replaces the old one.
        store.set("X.Y", VariableValue::String("done".into()));
        assert_eq!(store.get("X.Y"), Some(VariableValue::String("done".into())));
        assert_eq!(store.len(), before + 1);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = VariableStore::initialize();
        let mut snapshot = store.snapshot();
        snapshot.insert(system_port("Running"), VariableValue::Bool(true));
        snapshot.clear();

        assert_eq!(store.get(&system_port("Running")), Some(VariableValue::Bool(false)));
        assert_eq!(store.len(), 183);
    }
}
