/// Files to write and files to delete after one playlist mutation.
///
/// Every name in `to_add` receives the payload of the fragment that produced
/// the changeset. The changeset must be applied completely before any manifest
/// describing it is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkChangeset {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl ChunkChangeset {
    pub fn add(name: impl Into<String>) -> Self {
        Self {
            to_add: vec![name.into()],
            to_remove: Vec::new(),
        }
    }

    pub fn with_removed(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.to_remove.extend(names);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
