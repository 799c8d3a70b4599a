use runs_model::natural_cmp;

/// Items whose identity within a queue is a string key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Pending items of one sub-transaction, unique by key.
#[derive(Debug)]
pub struct Queue<T> {
    items: Vec<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> Queue<T> {
    /// Enqueue `item`, replacing an earlier item with the same key.
    pub fn push(&mut self, item: T) {
        match self.items.iter_mut().find(|queued| queued.key() == item.key()) {
            Some(queued) => *queued = item,
            None => self.items.push(item),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    /// Order items naturally by key.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| natural_cmp(a.key(), b.key()));
    }
}

impl<T> Queue<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(&'static str, u32);

    impl Keyed for Item {
        fn key(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_push_replaces_same_key() {
        let mut queue = Queue::default();
        queue.push(Item("a", 1));
        queue.push(Item("b", 2));
        queue.push(Item("a", 3));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![&Item("a", 3), &Item("b", 2)]);
    }

    #[test]
    fn test_sort_is_natural() {
        let mut queue = Queue::default();
        for key in ["run10", "run2", "run1"] {
            queue.push(Item(key, 0));
        }
        queue.sort();
        let keys: Vec<&str> = queue.iter().map(|i| i.0).collect();
        assert_eq!(keys, vec!["run1", "run2", "run10"]);
    }
}
