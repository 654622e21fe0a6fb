use rapid_time::Duration;

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use crate::base_types::{InspectorIdx, StationIdx};

pub struct Inspectors {
    inspectors: Vec<Inspector>,
}

pub struct Inspector {
    idx: InspectorIdx,
    name: String, // external id from the roster file
    depot: StationIdx,
    max_working_time: Duration,
}

/////////////////////////////////////////////////////////////////////
//////////////////////////// Inspectors /////////////////////////////
/////////////////////////////////////////////////////////////////////

// static functions
impl Inspectors {
    pub fn new(inspectors: Vec<Inspector>) -> Inspectors {
        Inspectors { inspectors }
    }
}

// methods
impl Inspectors {
    pub fn iter(&self) -> impl Iterator<Item = InspectorIdx> + '_ {
        self.inspectors.iter().map(|i| i.idx)
    }

    pub fn get(&self, idx: InspectorIdx) -> &Inspector {
        &self.inspectors[idx.idx()]
    }

    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }

    /// depot -> inspectors based there, sorted by descending working-hour
    /// budget (ties broken by index). The scheduler drains these lists as
    /// inspectors become known.
    pub fn grouped_by_depot(&self) -> BTreeMap<StationIdx, Vec<InspectorIdx>> {
        let mut groups: BTreeMap<StationIdx, Vec<InspectorIdx>> = BTreeMap::new();
        for inspector in self.inspectors.iter() {
            groups.entry(inspector.depot).or_default().push(inspector.idx);
        }
        for ids in groups.values_mut() {
            ids.sort_by_key(|&idx| (Reverse(self.get(idx).max_working_time()), idx));
        }
        groups
    }
}

/////////////////////////////////////////////////////////////////////
//////////////////////////// Inspector //////////////////////////////
/////////////////////////////////////////////////////////////////////

// static functions
impl Inspector {
    pub fn new(
        idx: InspectorIdx,
        name: String,
        depot: StationIdx,
        max_working_time: Duration,
    ) -> Inspector {
        Inspector {
            idx,
            name,
            depot,
            max_working_time,
        }
    }
}

// methods
impl Inspector {
    pub fn idx(&self) -> InspectorIdx {
        self.idx
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depot(&self) -> StationIdx {
        self.depot
    }

    pub fn max_working_time(&self) -> Duration {
        self.max_working_time
    }

    /// working-hour budget in whole seconds
    pub fn max_working_seconds(&self) -> u64 {
        self.max_working_time
            .in_sec()
            .expect("working-hour budgets are finite")
    }
}

impl fmt::Display for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "inspector {} (budget: {})", self.name, self.max_working_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_types::InspectorIdx;

    fn inspector(idx: u32, depot: u32, hours: &str) -> Inspector {
        Inspector::new(
            InspectorIdx::from(idx),
            format!("I{}", idx),
            StationIdx::from(depot),
            Duration::new(hours),
        )
    }

    #[test]
    fn display_names_the_inspector_without_raw_indices() {
        let shown = inspector(0, 0, "06:00").to_string();
        assert!(shown.contains("I0"));
        assert!(!shown.contains("st0"));
    }

    #[test]
    fn budget_is_available_in_seconds() {
        assert_eq!(inspector(0, 0, "06:30").max_working_seconds(), 6 * 3600 + 1800);
    }

    #[test]
    fn depot_groups_are_sorted_by_descending_hours() {
        let inspectors = Inspectors::new(vec![
            inspector(0, 0, "06:00"),
            inspector(1, 1, "08:00"),
            inspector(2, 0, "08:00"),
            inspector(3, 0, "07:30"),
            inspector(4, 1, "05:00"),
        ]);

        let groups = inspectors.grouped_by_depot();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[&StationIdx::from(0)],
            vec![
                InspectorIdx::from(2),
                InspectorIdx::from(3),
                InspectorIdx::from(0)
            ]
        );
        assert_eq!(
            groups[&StationIdx::from(1)],
            vec![InspectorIdx::from(1), InspectorIdx::from(4)]
        );
    }
}
