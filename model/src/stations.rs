use std::collections::HashMap;

use crate::base_types::StationIdx;

/// Interner for station names.
///
/// Station names from the timetable are dynamic strings; all other
/// components work with the compact `StationIdx` instead. Indices are
/// assigned in order of first appearance.
#[derive(Debug)]
pub struct Stations {
    names: Vec<String>,
    lookup: HashMap<String, StationIdx>,
}

// static functions
impl Stations {
    pub fn new() -> Stations {
        Stations {
            names: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl Default for Stations {
    fn default() -> Self {
        Self::new()
    }
}

// methods
impl Stations {
    pub fn intern(&mut self, name: &str) -> StationIdx {
        match self.lookup.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = StationIdx::from(self.names.len() as u32);
                self.names.push(String::from(name));
                self.lookup.insert(String::from(name), idx);
                idx
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<StationIdx> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, station: StationIdx) -> &str {
        &self.names[station.idx()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StationIdx> + '_ {
        (0..self.names.len() as u32).map(StationIdx::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut stations = Stations::new();
        let a = stations.intern("MainStation");
        let b = stations.intern("Harbour");
        assert_eq!(stations.intern("MainStation"), a);
        assert_ne!(a, b);
        assert_eq!(stations.name(b), "Harbour");
        assert_eq!(stations.get("Harbour"), Some(b));
        assert_eq!(stations.get("Airport"), None);
        assert_eq!(stations.len(), 2);
    }
}
