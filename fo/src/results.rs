//! Result aggregation
//!
//! Outcomes are written to the slot of the task that produced them, so the
//! final container does not depend on completion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collection::{Shape, TaskKey};

/// Success values signalled by one task
///
/// Exactly one value collapses to `Single`; any other count stays a `Tuple`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskValue<T> {
    Single(T),
    Tuple(Vec<T>),
}

impl<T> From<Vec<T>> for TaskValue<T> {
    fn from(mut values: Vec<T>) -> Self {
        match values.len() {
            1 => TaskValue::Single(values.remove(0)),
            _ => TaskValue::Tuple(values),
        }
    }
}

impl<T> TaskValue<T> {
    /// The single value, if exactly one was signalled
    pub fn as_single(&self) -> Option<&T> {
        match self {
            TaskValue::Single(value) => Some(value),
            TaskValue::Tuple(_) => None,
        }
    }

    /// All values in signalled order
    pub fn into_vec(self) -> Vec<T> {
        match self {
            TaskValue::Single(value) => vec![value],
            TaskValue::Tuple(values) => values,
        }
    }
}

/// Aggregated results, shaped like the input collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Results<T> {
    Absent,
    Sequence(Vec<TaskValue<T>>),
    Mapping(IndexMap<String, TaskValue<T>>),
}

impl<T> Results<T> {
    /// Empty results for a shape
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Absent => Results::Absent,
            Shape::Sequence => Results::Sequence(Vec::new()),
            Shape::Mapping => Results::Mapping(IndexMap::new()),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Results::Absent => Shape::Absent,
            Results::Sequence(_) => Shape::Sequence,
            Results::Mapping(_) => Shape::Mapping,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Results::Absent => 0,
            Results::Sequence(values) => values.len(),
            Results::Mapping(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the value for a key
    pub fn get(&self, key: &TaskKey) -> Option<&TaskValue<T>> {
        match (self, key) {
            (Results::Sequence(values), TaskKey::Index(index)) => values.get(*index),
            (Results::Mapping(values), TaskKey::Name(name)) => values.get(name),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Vec<TaskValue<T>>> {
        match self {
            Results::Sequence(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_mapping(self) -> Option<IndexMap<String, TaskValue<T>>> {
        match self {
            Results::Mapping(values) => Some(values),
            _ => None,
        }
    }
}

/// Per-invocation result store, indexed by admission position
pub(crate) struct Aggregator<T> {
    shape: Shape,
    keys: Vec<TaskKey>,
    slots: Vec<Option<TaskValue<T>>>,
}

impl<T> Aggregator<T> {
    pub(crate) fn new(shape: Shape, keys: Vec<TaskKey>) -> Self {
        let slots = keys.iter().map(|_| None).collect();
        Self { shape, keys, slots }
    }

    /// Store a task's values at its slot
    pub(crate) fn record(&mut self, index: usize, values: Vec<T>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(TaskValue::from(values));
        }
    }

    pub(crate) fn recorded(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Materialize the caller-facing container
    ///
    /// Only called once every slot has been recorded.
    pub(crate) fn finish(self) -> Results<T> {
        debug_assert_eq!(self.recorded(), self.keys.len());
        let entries = self
            .keys
            .into_iter()
            .zip(self.slots)
            .filter_map(|(key, slot)| slot.map(|value| (key, value)));

        match self.shape {
            Shape::Absent => Results::Absent,
            Shape::Sequence => Results::Sequence(entries.map(|(_, value)| value).collect()),
            Shape::Mapping => Results::Mapping(entries.map(|(key, value)| (key.to_string(), value)).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_value_collapses_by_arity() {
        assert_eq!(TaskValue::from(vec![4]), TaskValue::Single(4));
        assert_eq!(TaskValue::from(vec![5, 5]), TaskValue::Tuple(vec![5, 5]));
        assert_eq!(TaskValue::<u32>::from(vec![]), TaskValue::Tuple(vec![]));
        // Arity, not element type, decides
        assert_eq!(TaskValue::from(vec![vec![1, 2]]), TaskValue::Single(vec![1, 2]));
    }

    #[test]
    fn test_task_value_accessors() {
        assert_eq!(TaskValue::Single(3).as_single(), Some(&3));
        assert_eq!(TaskValue::Tuple(vec![3, 4]).as_single(), None);
        assert_eq!(TaskValue::Single(3).into_vec(), vec![3]);
        assert_eq!(TaskValue::<u32>::Tuple(vec![]).into_vec(), Vec::<u32>::new());
    }

    #[test]
    fn test_aggregator_sequence_out_of_order() {
        let keys = (0..3).map(TaskKey::Index).collect();
        let mut agg = Aggregator::new(Shape::Sequence, keys);
        agg.record(2, vec![30]);
        agg.record(0, vec![10]);
        agg.record(1, vec![20, 21]);

        let results = agg.finish();
        assert_eq!(
            results,
            Results::Sequence(vec![
                TaskValue::Single(10),
                TaskValue::Tuple(vec![20, 21]),
                TaskValue::Single(30),
            ])
        );
    }

    #[test]
    fn test_aggregator_mapping_keeps_input_order() {
        let keys = vec![TaskKey::from("b"), TaskKey::from("a")];
        let mut agg = Aggregator::new(Shape::Mapping, keys);
        agg.record(1, vec![1]);
        agg.record(0, vec![2]);

        let results = agg.finish();
        let map = results.clone().into_mapping().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(results.get(&TaskKey::from("a")), Some(&TaskValue::Single(1)));
    }

    #[test]
    fn test_empty_results_per_shape() {
        assert_eq!(Results::<u32>::empty(Shape::Absent), Results::Absent);
        assert_eq!(Results::<u32>::empty(Shape::Sequence).shape(), Shape::Sequence);
        assert_eq!(Results::<u32>::empty(Shape::Mapping).shape(), Shape::Mapping);
        assert!(Results::<u32>::empty(Shape::Mapping).is_empty());
    }

    #[test]
    fn test_results_json() {
        let results = Results::Sequence(vec![TaskValue::Single(2), TaskValue::Tuple(vec![5, 5])]);
        assert_eq!(serde_json::to_string(&results).unwrap(), "[2,[5,5]]");

        let mut map = IndexMap::new();
        map.insert("a".to_string(), TaskValue::Single(8));
        assert_eq!(serde_json::to_string(&Results::Mapping(map)).unwrap(), "{\"a\":8}");

        assert_eq!(serde_json::to_string(&Results::<u32>::Absent).unwrap(), "null");
    }
}
