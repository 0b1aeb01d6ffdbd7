use std::collections::HashMap;

/// Turns text-segment addresses into subroutine labels.
pub trait SymbolResolver: Send + Sync {
    fn label_for(&self, address: u32) -> Option<String>;
}

/// Address to label map, the usual resolver for assembled programs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    labels: HashMap<u32, String>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u32, label: impl Into<String>) {
        self.labels.insert(address, label.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn label_for(&self, address: u32) -> Option<String> {
        self.labels.get(&address).cloned()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(address, label)| (address, label.into()))
                .collect(),
        }
    }
}

/// Resolves nothing; every call degrades to an unlabeled frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn label_for(&self, _address: u32) -> Option<String> {
        None
    }
}
