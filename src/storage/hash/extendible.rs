use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

/// Extendible hash table with a doubling directory and bounded buckets.
///
/// The directory holds `2^global_depth` slots, each pointing at a bucket;
/// several slots may share one bucket (its `local_depth` says how many low
/// hash bits it discriminates). An insert into a full bucket splits it: if
/// the bucket's local depth equals the global depth the directory doubles
/// first, otherwise the bucket splits in place by rewriting half of the
/// slots that point at it.
pub struct ExtendibleHashTable<K, V> {
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    global_depth: u32,
    bucket_size: usize,
    /// directory[i] indexes into `buckets`
    directory: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
    free_slots: Vec<usize>,
}

struct Bucket<K, V> {
    local_depth: u32,
    items: Vec<(K, V)>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a table whose buckets hold at most `bucket_size` entries.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size > 0);
        Self {
            inner: Mutex::new(Inner {
                global_depth: 0,
                bucket_size,
                directory: vec![0],
                buckets: vec![Bucket {
                    local_depth: 0,
                    items: Vec::with_capacity(bucket_size),
                }],
                free_slots: Vec::new(),
            }),
        }
    }

    /// Look up the value for `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let bucket = &inner.buckets[inner.bucket_of(key)];
        bucket
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert `key -> value`, updating in place on a duplicate key.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();

        let b = inner.bucket_of(&key);
        if let Some(slot) = inner.buckets[b].items.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }

        let mut pending = Some((key, value));
        loop {
            let b = inner.bucket_of(&pending.as_ref().unwrap().0);
            if inner.buckets[b].items.len() < inner.bucket_size {
                inner.buckets[b].items.push(pending.take().unwrap());
                return;
            }
            inner.split_bucket(b);
        }
    }

    /// Remove `key`, compacting the bucket by swapping with the last slot.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let b = inner.bucket_of(key);
        let bucket = &mut inner.buckets[b];
        if let Some(pos) = bucket.items.iter().position(|(k, _)| k == key) {
            bucket.items.swap_remove(pos);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        let mut seen = vec![false; inner.buckets.len()];
        let mut count = 0;
        for &b in &inner.directory {
            if !seen[b] {
                seen[b] = true;
                count += inner.buckets[b].items.len();
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn global_depth(&self) -> u32 {
        self.inner.lock().global_depth
    }
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn hash(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn dir_index(&self, key: &K) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (Self::hash(key) & mask) as usize
    }

    fn bucket_of(&self, key: &K) -> usize {
        self.directory[self.dir_index(key)]
    }

    fn alloc_bucket(&mut self, local_depth: u32) -> usize {
        let bucket = Bucket {
            local_depth,
            items: Vec::with_capacity(self.bucket_size),
        };
        if let Some(slot) = self.free_slots.pop() {
            self.buckets[slot] = bucket;
            slot
        } else {
            self.buckets.push(bucket);
            self.buckets.len() - 1
        }
    }

    /// Split bucket `b`, doubling the directory first if it is at full depth.
    fn split_bucket(&mut self, b: usize) {
        if self.buckets[b].local_depth == self.global_depth {
            // Double the directory. Slots are indexed by the low
            // `global_depth` hash bits, so new slot i inherits the bucket of
            // old slot i & (old_len - 1).
            let old = std::mem::take(&mut self.directory);
            let old_len = old.len();
            let mut doubled = Vec::with_capacity(old_len * 2);
            for i in 0..old_len * 2 {
                doubled.push(old[i & (old_len - 1)]);
            }
            self.directory = doubled;
            self.global_depth += 1;
        }

        let local_depth = self.buckets[b].local_depth;
        debug_assert!(local_depth < self.global_depth);

        let new_b = self.alloc_bucket(local_depth + 1);
        self.buckets[b].local_depth = local_depth + 1;

        // Slots pointing at b agree on the low `local_depth` bits; the next
        // bit decides which of the two buckets they now reference.
        for i in 0..self.directory.len() {
            if self.directory[i] == b && (i >> local_depth) & 1 == 1 {
                self.directory[i] = new_b;
            }
        }

        // Re-place the split bucket's items; each lands in b or new_b.
        let items = std::mem::take(&mut self.buckets[b].items);
        for (k, v) in items {
            let target = self.bucket_of(&k);
            self.buckets[target].items.push((k, v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let table: ExtendibleHashTable<i32, String> = ExtendibleHashTable::new(2);
        table.insert(1, "a".to_string());
        table.insert(2, "b".to_string());

        assert_eq!(table.find(&1), Some("a".to_string()));
        assert_eq!(table.find(&2), Some("b".to_string()));
        assert_eq!(table.find(&3), None);
    }

    #[test]
    fn test_duplicate_key_updates_in_place() {
        let table: ExtendibleHashTable<i32, i32> = ExtendibleHashTable::new(2);
        table.insert(1, 10);
        table.insert(1, 20);
        assert_eq!(table.find(&1), Some(20));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_splits_grow_directory() {
        let table: ExtendibleHashTable<i32, i32> = ExtendibleHashTable::new(1);
        for i in 0..64 {
            table.insert(i, i * 10);
        }
        for i in 0..64 {
            assert_eq!(table.find(&i), Some(i * 10), "key {} lost after splits", i);
        }
        assert!(table.global_depth() > 0);
        assert_eq!(table.len(), 64);
    }

    #[test]
    fn test_remove() {
        let table: ExtendibleHashTable<i32, i32> = ExtendibleHashTable::new(4);
        for i in 0..16 {
            table.insert(i, i);
        }
        assert!(table.remove(&7));
        assert!(!table.remove(&7));
        assert_eq!(table.find(&7), None);
        for i in (0..16).filter(|&i| i != 7) {
            assert_eq!(table.find(&i), Some(i));
        }
    }
}
