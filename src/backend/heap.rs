use std::collections::HashMap;

use crate::common::value::{HeapHandle, Value};

/// Field name -> value of one struct instance.
pub type Record = HashMap<String, Value>;

/// Arena of struct records. Handles are indices into the arena and grow
/// monotonically; records are never freed.
#[derive(Debug, Default)]
pub struct Heap {
    records: Vec<Record>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn allocate(&mut self, record: Record) -> HeapHandle {
        let handle = HeapHandle(self.records.len());
        self.records.push(record);
        handle
    }

    pub fn get(&self, handle: HeapHandle) -> Option<&Record> {
        self.records.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: HeapHandle) -> Option<&mut Record> {
        self.records.get_mut(handle.0)
    }

    pub fn field(&self, handle: HeapHandle, name: &str) -> Option<&Value> {
        self.get(handle)?.get(name)
    }

    /// Overwrites an existing field. Returns false if the record has no such
    /// field.
    pub fn set_field(&mut self, handle: HeapHandle, name: &str, value: Value) -> bool {
        match self.get_mut(handle).and_then(|record| record.get_mut(name)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
