//! Keyed collection adapter
//!
//! Normalizes the caller's input (absent, a sequence, or a string-keyed
//! mapping) into an ordered list of `(TaskKey, Task)` pairs, remembering which
//! shape the results must be materialized in.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Shape of the caller's input, mirrored by the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// No collection was supplied
    Absent,
    /// Ordered sequence, keyed by position
    Sequence,
    /// String-keyed mapping, keyed by name
    Mapping,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}

/// Key of a task within one invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskKey {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{}", index),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for TaskKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for TaskKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TaskKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Ordered `(key, task)` pairs plus the shape they came from
///
/// Entry order is admission order. Keys are unique.
pub struct TaskCollection<T, E, C = ()> {
    shape: Shape,
    entries: Vec<(TaskKey, Task<T, E, C>)>,
}

impl<T, E, C> TaskCollection<T, E, C> {
    /// No collection at all; results are [`Results::Absent`](crate::results::Results::Absent)
    pub fn absent() -> Self {
        Self {
            shape: Shape::Absent,
            entries: Vec::new(),
        }
    }

    /// Sequence input, keyed by position
    pub fn sequence(tasks: impl IntoIterator<Item = Task<T, E, C>>) -> Self {
        Self {
            shape: Shape::Sequence,
            entries: tasks
                .into_iter()
                .enumerate()
                .map(|(index, task)| (TaskKey::Index(index), task))
                .collect(),
        }
    }

    /// Mapping input in iteration order
    ///
    /// A repeated key keeps the position of its first occurrence and the last task given for it.
    pub fn mapping<K: Into<String>>(tasks: impl IntoIterator<Item = (K, Task<T, E, C>)>) -> Self {
        let tasks: IndexMap<String, Task<T, E, C>> = tasks.into_iter().map(|(key, task)| (key.into(), task)).collect();
        Self {
            shape: Shape::Mapping,
            entries: tasks.into_iter().map(|(key, task)| (TaskKey::Name(key), task)).collect(),
        }
    }

    /// Shape the results will take
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to run
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in admission order
    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub(crate) fn into_parts(self) -> (Shape, Vec<(TaskKey, Task<T, E, C>)>) {
        (self.shape, self.entries)
    }
}

impl<T, E, C> From<Vec<Task<T, E, C>>> for TaskCollection<T, E, C> {
    fn from(tasks: Vec<Task<T, E, C>>) -> Self {
        Self::sequence(tasks)
    }
}

impl<T, E, C> From<IndexMap<String, Task<T, E, C>>> for TaskCollection<T, E, C> {
    fn from(tasks: IndexMap<String, Task<T, E, C>>) -> Self {
        Self::mapping(tasks)
    }
}

impl<T, E, C> From<BTreeMap<String, Task<T, E, C>>> for TaskCollection<T, E, C> {
    fn from(tasks: BTreeMap<String, Task<T, E, C>>) -> Self {
        Self::mapping(tasks)
    }
}

impl<T, E, C, X> From<Option<X>> for TaskCollection<T, E, C>
where
    X: Into<TaskCollection<T, E, C>>,
{
    fn from(tasks: Option<X>) -> Self {
        match tasks {
            Some(tasks) => tasks.into(),
            None => Self::absent(),
        }
    }
}

impl<T, E, C, K: Into<String>> FromIterator<(K, Task<T, E, C>)> for TaskCollection<T, E, C> {
    fn from_iter<I: IntoIterator<Item = (K, Task<T, E, C>)>>(iter: I) -> Self {
        Self::mapping(iter)
    }
}

impl<T, E, C> std::fmt::Debug for TaskCollection<T, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCollection")
            .field("shape", &self.shape)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Task<u32, String> {
        Task::new(|done| async move { done.ok(0) })
    }

    #[test]
    fn test_absent() {
        let tasks: TaskCollection<u32, String> = TaskCollection::absent();
        assert_eq!(tasks.shape(), Shape::Absent);
        assert!(tasks.is_empty());

        let tasks: TaskCollection<u32, String> = None::<Vec<Task<u32, String>>>.into();
        assert_eq!(tasks.shape(), Shape::Absent);
    }

    #[test]
    fn test_empty_sequence_and_mapping() {
        let tasks: TaskCollection<u32, String> = Vec::new().into();
        assert_eq!(tasks.shape(), Shape::Sequence);
        assert_eq!(tasks.len(), 0);

        let tasks: TaskCollection<u32, String> = IndexMap::new().into();
        assert_eq!(tasks.shape(), Shape::Mapping);
        assert_eq!(tasks.len(), 0);
    }

    #[test]
    fn test_sequence_keys_are_positions() {
        let tasks: TaskCollection<u32, String> = vec![noop(), noop(), noop()].into();
        assert_eq!(tasks.shape(), Shape::Sequence);
        let keys: Vec<_> = tasks.keys().cloned().collect();
        assert_eq!(keys, vec![TaskKey::Index(0), TaskKey::Index(1), TaskKey::Index(2)]);
    }

    #[test]
    fn test_mapping_keeps_iteration_order() {
        let tasks: TaskCollection<u32, String> = [("b", noop()), ("a", noop()), ("c", noop())].into_iter().collect();
        assert_eq!(tasks.shape(), Shape::Mapping);
        let keys: Vec<_> = tasks.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_mapping_duplicate_key_keeps_first_position() {
        let tasks: TaskCollection<u32, String> =
            TaskCollection::mapping([("a", noop()), ("b", noop()), ("a", noop())]);
        let keys: Vec<_> = tasks.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_btreemap_is_sorted() {
        let mut map = BTreeMap::new();
        map.insert("z".to_string(), noop());
        map.insert("m".to_string(), noop());
        let tasks: TaskCollection<u32, String> = map.into();
        let keys: Vec<_> = tasks.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["m", "z"]);
    }

    #[test]
    fn test_task_key_display_and_serde() {
        assert_eq!(TaskKey::Index(3).to_string(), "3");
        assert_eq!(TaskKey::from("a").to_string(), "a");
        assert_eq!(serde_json::to_string(&TaskKey::Index(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&TaskKey::from("a")).unwrap(), "\"a\"");
    }
}
