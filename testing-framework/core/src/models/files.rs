use serde::{Deserialize, Serialize};

/// Entry of a remote directory listing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub lookup_hash: String,
}

impl FileRef {
    pub const FILE: &'static str = "f";
    pub const DIRECTORY: &'static str = "d";

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == Self::FILE
    }
}

/// Remote directory listing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    #[serde(default)]
    pub allocation_id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub list: Vec<FileRef>,
}

impl ListResult {
    #[must_use]
    pub fn files(&self) -> impl Iterator<Item = &FileRef> {
        self.list.iter().filter(|entry| entry.is_file())
    }

    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.list.iter().map(|entry| entry.path.as_str()).collect()
    }
}
