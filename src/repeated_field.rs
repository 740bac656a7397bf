use std::fmt;
use std::ops::{Deref, DerefMut};

/// Growable storage behind every repeated field of a dynamic message.
///
/// Dereferences to a slice of the live elements. Elements can also be
/// retired instead of dropped; retired elements are invisible to readers,
/// comparisons and clones, and [`reuse_retired`](Self::reuse_retired) hands
/// them out again so repeated sub-messages keep their allocations.
pub struct RepeatedField<T> {
    items: Vec<T>,
    retired: Vec<T>,
}

impl<T> Default for RepeatedField<T> {
    fn default() -> Self {
        RepeatedField {
            items: Vec::new(),
            retired: Vec::new(),
        }
    }
}

impl<T: Clone> Clone for RepeatedField<T> {
    fn clone(&self) -> Self {
        self.items.clone().into()
    }
}

impl<T: PartialEq> PartialEq for RepeatedField<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: fmt::Debug> fmt::Debug for RepeatedField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<T> RepeatedField<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, elem: T) {
        self.items.push(elem);
    }

    /// Appends `elem` and returns a reference to it in place.
    pub fn push_mut(&mut self, elem: T) -> &mut T {
        self.items.push(elem);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn insert(&mut self, index: usize, elem: T) {
        self.items.insert(index, elem);
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.items.drain(..)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    /// Drops the last element, if any.
    pub fn remove_last(&mut self) {
        self.items.pop();
    }

    /// Swaps two elements; out-of-range indices leave the field untouched
    /// and return false.
    pub fn swap_elements(&mut self, a: usize, b: usize) -> bool {
        if a >= self.items.len() || b >= self.items.len() {
            return false;
        }
        self.items.swap(a, b);
        true
    }

    /// Moves the last element aside for later reuse.
    pub fn retire_last(&mut self) -> bool {
        match self.items.pop() {
            Some(last) => {
                self.retired.push(last);
                true
            }
            None => false,
        }
    }

    /// Moves every element aside for later reuse.
    pub fn retire_all(&mut self) {
        self.retired.append(&mut self.items);
    }

    /// Brings back a retired element as the new last element. The caller
    /// is responsible for resetting its contents.
    pub fn reuse_retired(&mut self) -> Option<&mut T> {
        let elem = self.retired.pop()?;
        Some(self.push_mut(elem))
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Drops retired elements.
    pub fn shrink_retired(&mut self) {
        self.retired.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Clone> RepeatedField<T> {
    /// Replaces the contents with a copy of `slice`.
    pub fn assign(&mut self, slice: &[T]) {
        self.items.clear();
        self.items.extend_from_slice(slice);
    }
}

impl<T> Deref for RepeatedField<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for RepeatedField<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> From<Vec<T>> for RepeatedField<T> {
    fn from(items: Vec<T>) -> Self {
        RepeatedField {
            items,
            retired: Vec::new(),
        }
    }
}

impl<T> FromIterator<T> for RepeatedField<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<T>>().into()
    }
}

impl<T> Extend<T> for RepeatedField<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> IntoIterator for RepeatedField<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a RepeatedField<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop() {
        let mut field = RepeatedField::new();
        for i in 0..10 {
            field.push(i);
        }
        assert_eq!(field.len(), 10);
        assert_eq!(field.pop(), Some(9));
        assert_eq!(field[3], 3);
    }

    #[test]
    fn insert_remove_drain() {
        let mut field: RepeatedField<i32> = vec![1, 3].into();
        field.insert(1, 2);
        assert_eq!(&*field, &[1, 2, 3]);
        assert_eq!(field.remove(0), 1);
        let drained: Vec<i32> = field.drain().collect();
        assert_eq!(drained, vec![2, 3]);
        assert!(field.is_empty());
    }

    #[test]
    fn swap_out_of_range_is_rejected() {
        let mut field: RepeatedField<&str> = vec!["a", "b"].into();
        assert!(field.swap_elements(0, 1));
        assert_eq!(&*field, &["b", "a"]);
        assert!(!field.swap_elements(0, 2));
        field.remove_last();
        assert_eq!(&*field, &["b"]);
    }

    #[test]
    fn assign_replaces_contents() {
        let mut field: RepeatedField<String> = vec!["x".to_owned()].into();
        field.assign(&["a".to_owned(), "b".to_owned()]);
        assert_eq!(field.len(), 2);
        *field.push_mut(String::new()) = "c".to_owned();
        assert_eq!(field[2], "c");
    }

    #[test]
    fn retired_elements_are_hidden_and_reused() {
        let mut field: RepeatedField<Vec<u8>> = vec![vec![1], vec![2]].into();
        field.retire_all();
        assert!(field.is_empty());
        assert_eq!(field.retired_count(), 2);
        assert_eq!(field, RepeatedField::new());
        let reused = field.reuse_retired().unwrap();
        assert_eq!(reused, &vec![2]);
        reused.clear();
        assert_eq!(field.len(), 1);
        assert_eq!(field.clone().retired_count(), 0);
    }
}
