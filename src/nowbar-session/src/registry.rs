use indexmap::IndexSet;

/// Instance bus names believed to be registered, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    names: IndexSet<String>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the name was already present; its position is kept.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Most recently inserted first.
    pub fn recent_first(&self) -> impl Iterator<Item = &str> {
        self.names.iter().rev().map(String::as_str)
    }
}
