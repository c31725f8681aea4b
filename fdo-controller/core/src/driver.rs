use serde::Serialize;

/// Storage backend of an FDO server store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum StoreDriver {
    Directory { path: String },
}

impl StoreDriver {
    pub fn directory(path: impl ToString) -> Self {
        Self::Directory {
            path: path.to_string(),
        }
    }
}
