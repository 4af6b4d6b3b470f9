//! Collection kinds the sequence and map adapters know how to take apart and rebuild.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;

use indexmap::IndexMap;

/// A last-in-first-out stack. Iteration starts at the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Stack { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Top first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter().rev()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Stack::new()
    }
}

impl<T> FromIterator<T> for Stack<T> {
    /// Pushes items in iteration order, so the last item ends on top.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Stack {
            items: iter.into_iter().collect(),
        }
    }
}

/// A collection encoded as an array.
///
/// `elements` enumerates in the collection's own order and `rebuild` must
/// accept that same order, so encode followed by decode is the identity.
pub trait SequenceAdapter: Sized + Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    fn elements(&self) -> Box<dyn Iterator<Item = &Self::Item> + '_>;

    fn rebuild(items: Vec<Self::Item>) -> Self;
}

impl<T: Send + Sync + 'static> SequenceAdapter for Vec<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items
    }
}

impl<T: Send + Sync + 'static> SequenceAdapter for Box<[T]> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items.into_boxed_slice()
    }
}

impl<T: Send + Sync + 'static> SequenceAdapter for VecDeque<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items.into()
    }
}

impl<T: Send + Sync + 'static> SequenceAdapter for LinkedList<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Send + Sync + 'static> SequenceAdapter for Stack<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        // items arrive top first
        items.into_iter().rev().collect()
    }
}

impl<T: Eq + Hash + Send + Sync + 'static> SequenceAdapter for HashSet<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Ord + Send + Sync + 'static> SequenceAdapter for BTreeSet<T> {
    type Item = T;

    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

/// A key-value map encoded as a document or an array of pairs.
pub trait MapAdapter: Sized + Send + Sync + 'static {
    type Key: Send + Sync + 'static;
    type Value: Send + Sync + 'static;

    fn entries(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;

    fn rebuild(entries: Vec<(Self::Key, Self::Value)>) -> Self;
}

impl<K, V> MapAdapter for HashMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> MapAdapter for BTreeMap<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> MapAdapter for IndexMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }

    fn rebuild(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}
