//! Age-distribution records consumed by the spatial rollback.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::classifier::ClassifierSet;

/// One age distribution for a classifier subset of a distribution sheet.
///
/// Serializes to the rollback's JSON shape:
///
/// ```json
/// {"disturbance_type": ["Wildfire"], "LdSpp": ["BF"], "distribution": [[0, 0.25], [20, 0.75]]}
/// ```
///
/// `disturbance_type` is omitted when the sheet declares none and each
/// classifier value is wrapped in a one-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRecord {
    pub disturbance_types: Vec<String>,
    pub classifiers: ClassifierSet,
    /// `(age, proportion)` pairs, strictly ascending by age.
    pub distribution: Vec<(i64, f64)>,
}

impl DistributionRecord {
    /// Returns true if ages are strictly ascending (and therefore unique).
    pub fn is_strictly_ascending(&self) -> bool {
        self.distribution
            .windows(2)
            .all(|pair| pair[0].0 < pair[1].0)
    }
}

impl Serialize for DistributionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_types = !self.disturbance_types.is_empty();
        let len = usize::from(has_types) + self.classifiers.len() + 1;
        let mut map = serializer.serialize_map(Some(len))?;
        if has_types {
            map.serialize_entry("disturbance_type", &self.disturbance_types)?;
        }
        for (name, value) in self.classifiers.iter() {
            map.serialize_entry(name, &[value])?;
        }
        map.serialize_entry("distribution", &self.distribution)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_full_record() {
        let record = DistributionRecord {
            disturbance_types: vec!["Wildfire".to_string(), "Clearcut".to_string()],
            classifiers: ClassifierSet::new([("LdSpp", "BF")]),
            distribution: vec![(0, 0.25), (20, 0.75)],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "disturbance_type": ["Wildfire", "Clearcut"],
                "LdSpp": ["BF"],
                "distribution": [[0, 0.25], [20, 0.75]]
            })
        );
    }

    #[test]
    fn omits_empty_disturbance_types() {
        let record = DistributionRecord {
            disturbance_types: Vec::new(),
            classifiers: ClassifierSet::default(),
            distribution: vec![(10, 1.0)],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"distribution": [[10, 1.0]]}));
    }

    #[test]
    fn ascending_check() {
        let mut record = DistributionRecord {
            disturbance_types: Vec::new(),
            classifiers: ClassifierSet::default(),
            distribution: vec![(0, 0.5), (10, 0.5)],
        };
        assert!(record.is_strictly_ascending());
        record.distribution.push((10, 0.1));
        assert!(!record.is_strictly_ascending());
    }
}
