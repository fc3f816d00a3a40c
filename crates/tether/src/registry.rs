//! Name-based controller lookup.
//!
//! Injected into controllers so master-binding resolution never reaches for
//! ambient/global state. Hosts may bring their own implementation;
//! [`MapRegistry`] is a ready-made one.

use crate::dataset::DataSet;
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

///
/// Registry
///

pub trait Registry {
    fn resolve(&self, name: &str) -> Option<DataSet>;
}

///
/// MapRegistry
///

#[derive(Default)]
pub struct MapRegistry {
    entries: RefCell<BTreeMap<String, DataSet>>,
}

impl MapRegistry {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register a controller under its name; the latest registration wins.
    pub fn register(&self, dataset: &DataSet) {
        self.entries
            .borrow_mut()
            .insert(dataset.name().to_string(), dataset.clone());
    }

    pub fn remove(&self, name: &str) {
        self.entries.borrow_mut().remove(name);
    }
}

impl Registry for MapRegistry {
    fn resolve(&self, name: &str) -> Option<DataSet> {
        self.entries.borrow().get(name).cloned()
    }
}
