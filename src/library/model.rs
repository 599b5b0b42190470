use std::path::PathBuf;

/// One playable audio file reference.
///
/// Identity is the stable `id`; `path` serves as a secondary matching key
/// when comparing tracks across playlist replacements.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub category: String,
}

impl Track {
    /// Whether `other` refers to the same underlying audio file, matching
    /// by id first and falling back to the path.
    pub fn is_same(&self, other: &Track) -> bool {
        if !self.id.is_empty() && !other.id.is_empty() {
            if self.id == other.id {
                return true;
            }
        }
        !self.path.as_os_str().is_empty() && self.path == other.path
    }
}
