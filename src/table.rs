use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Index;

struct Entry<T> {
    value: T,
    next: usize,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    fn new(value: T) -> Self {
        Self { value, next: 0 }
    }
}

/// Interning (hash-consing) table.
///
/// Every distinct value is stored exactly once and addressed by a stable slot
/// index. Slot indices start at 1; index 0 terminates bucket chains.
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T> {
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_size = 1 << bits;
        Self {
            data: Vec::new(),
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }

    /// Get the number of stored values.
    pub fn len(&self) -> usize {
        self.data.len()
    }
    /// Check whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index - 1].value
    }
    /// Get the index of the next cell in the same bucket.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index - 1].next
    }
    fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index - 1].next = next;
    }

    /// Remove all values, keeping the bucket array.
    pub fn clear(&mut self) {
        self.data.clear();
        self.buckets.fill(0);
    }

    /// Iterate over `(index, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.data.iter().enumerate().map(|(i, e)| (i + 1, &e.value))
    }

    /// Consume the table, returning the values in index order.
    pub fn into_values(self) -> Vec<T> {
        self.data.into_iter().map(|e| e.value).collect()
    }

    /// Add a new value to the table and return its index.
    fn add(&mut self, value: T) -> usize {
        self.data.push(Entry::new(value));
        self.data.len()
    }
}

impl<T> Table<T>
where
    T: Hash + Eq,
{
    fn hash(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn bucket_index(&self, value: &T) -> usize {
        (Self::hash(value) & self.bitmask) as usize
    }

    /// Find the index of an equal value.
    pub fn get(&self, value: &T) -> Option<usize> {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != 0 {
            if self.value(index) == value {
                return Some(index);
            }
            index = self.next(index);
        }
        None
    }

    /// Put a value into the table and return its index, reusing an existing
    /// equal value. The flag tells whether the value was newly added.
    pub fn put(&mut self, value: T) -> (usize, bool) {
        if self.data.len() >= 2 * self.buckets.len() {
            self.grow();
        }

        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new value and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return (i, true);
        }

        loop {
            if &value == self.value(index) {
                // The value already exists.
                return (index, false);
            }

            let next = self.next(index);

            if next == 0 {
                // Create new value and append it to the bucket.
                let i = self.add(value);
                self.set_next(index, i);
                return (i, true);
            } else {
                // Go to the next value in the bucket.
                index = next;
            }
        }
    }

    /// Double the bucket array and rechain every value.
    fn grow(&mut self) {
        let buckets_size = self.buckets.len() * 2;
        self.buckets = vec![0; buckets_size];
        self.bitmask = (buckets_size - 1) as u64;

        for i in 1..=self.data.len() {
            self.set_next(i, 0);
            let bucket_index = self.bucket_index(self.value(i));
            // Prepend: chain order inside a bucket is irrelevant for lookups.
            let head = self.buckets[bucket_index];
            self.set_next(i, head);
            self.buckets[bucket_index] = i;
        }
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table::new(10)
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put() {
        let mut table = Table::new(2);
        let (index1, new1) = table.put(5);
        let (index2, new2) = table.put(-5);
        let (index3, new3) = table.put(5);
        assert!(new1 && new2 && !new3);
        assert_ne!(index1, index2);
        assert_eq!(index1, index3);
        assert_eq!(table[index1], 5);
        assert_eq!(table[index2], -5);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_indices_start_at_one() {
        let mut table = Table::new(2);
        assert_eq!(table.put("a").0, 1);
        assert_eq!(table.put("b").0, 2);
        assert_eq!(table.put("c").0, 3);
    }

    #[test]
    #[should_panic(expected = "Index is 0")]
    fn test_sentry_index() {
        let mut table = Table::new(2);
        table.put(1);
        table.value(0);
    }

    #[test]
    fn test_grow_keeps_indices() {
        let mut table = Table::new(1);
        let indices: Vec<usize> = (0..1000).map(|i| table.put(i).0).collect();
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(table.get(&i), Some(index));
            assert_eq!(table[index], i);
        }
        assert_eq!(table.get(&1000), None);
    }

    #[test]
    fn test_clear() {
        let mut table = Table::new(2);
        table.put("x");
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.get(&"x"), None);
        assert_eq!(table.put("y").0, 1);
    }
}
