//! Gauge types backing the exporter's metric snapshot.

use std::collections::BTreeMap;

/// Static description of one metric family: fully qualified name, help text
/// and label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricDesc {
    /// Create a metric description.
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// A single gauge: holds the last value it was set to.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    desc: MetricDesc,
    value: f64,
}

impl Gauge {
    /// Create a gauge starting at zero.
    pub fn new(desc: MetricDesc) -> Self {
        Self { desc, value: 0.0 }
    }

    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    pub fn set(&mut self, value: f64) {
        self.value = value;
    }

    pub fn get(&self) -> f64 {
        self.value
    }
}

/// A family of gauges partitioned by label values.
///
/// Samples are keyed by the ordered tuple of label values and iterate in
/// sorted order, so rendering the same state twice gives the same output.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeVec {
    desc: MetricDesc,
    values: BTreeMap<Vec<String>, f64>,
}

impl GaugeVec {
    /// Create an empty gauge vector.
    pub fn new(desc: MetricDesc) -> Self {
        Self {
            desc,
            values: BTreeMap::new(),
        }
    }

    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    /// Set the gauge identified by `labels`, creating it if needed.
    ///
    /// `labels` must hold one value per label name, in declaration order.
    pub fn set(&mut self, labels: &[&str], value: f64) {
        debug_assert_eq!(
            labels.len(),
            self.desc.label_names.len(),
            "label cardinality mismatch for {}",
            self.desc.name
        );
        let key = labels.iter().map(|l| l.to_string()).collect();
        self.values.insert(key, value);
    }

    /// Value of the gauge identified by `labels`, if it exists.
    pub fn get(&self, labels: &[&str]) -> Option<f64> {
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        self.values.get(&key).copied()
    }

    /// Drop every label combination.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(label values, value)` pairs in sorted label order.
    pub fn samples(&self) -> impl Iterator<Item = (&[String], f64)> {
        self.values.iter().map(|(k, v)| (k.as_slice(), *v))
    }
}
