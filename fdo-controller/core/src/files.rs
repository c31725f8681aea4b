use crate::{Error, Result};
use std::collections::BTreeMap;

pub const NAME_ANNOTATION: &str = "fdo.serviceinfo.file/name";
pub const PATH_ANNOTATION: &str = "fdo.serviceinfo.file/path";
pub const PERMISSIONS_ANNOTATION: &str = "fdo.serviceinfo.file/permissions";

/// Directory under which each file's ConfigMap is mounted, one subdirectory
/// per ConfigMap.
pub const FILES_DIR: &str = "/etc/fdo/files";

/// A file delivered to devices during onboarding, sourced from a ConfigMap.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceInfoFile {
    pub config_map: String,
    /// Destination path on the device.
    pub path: String,
    pub permissions: Option<String>,
    /// Location of the file inside the service-info API container.
    pub source_path: String,
}

impl ServiceInfoFile {
    /// Reads a file descriptor from a ConfigMap's annotations.
    ///
    /// `keys` holds the keys present in the ConfigMap's `data` and
    /// `binaryData`.
    pub fn from_config_map<'k>(
        config_map: &str,
        annotations: &BTreeMap<String, String>,
        mut keys: impl Iterator<Item = &'k str>,
    ) -> Result<Self> {
        let annotation = |key: &str| {
            annotations
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let (file, path) = match (annotation(NAME_ANNOTATION), annotation(PATH_ANNOTATION)) {
            (Some(file), Some(path)) => (file, path),
            _ => return Err(Error::IncompleteFile(config_map.to_string())),
        };
        if !keys.any(|k| k == file) {
            return Err(Error::MissingFileData {
                config_map: config_map.to_string(),
                file: file.to_string(),
            });
        }

        Ok(Self {
            config_map: config_map.to_string(),
            path: path.to_string(),
            permissions: annotation(PERMISSIONS_ANNOTATION).map(ToString::to_string),
            source_path: format!("{FILES_DIR}/{config_map}/{file}"),
        })
    }

    /// The directory the file's ConfigMap is mounted at.
    pub fn mount_path(&self) -> String {
        format!("{FILES_DIR}/{}", self.config_map)
    }
}

/// Orders files by ConfigMap name so that generated objects stay stable
/// across reconciles.
pub fn sort(files: &mut [ServiceInfoFile]) {
    files.sort_by(|a, b| a.config_map.cmp(&b.config_map));
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_annotations() {
        let annotations = btreemap! {
            NAME_ANNOTATION.to_string() => "motd".to_string(),
            PATH_ANNOTATION.to_string() => "/etc/motd".to_string(),
            PERMISSIONS_ANNOTATION.to_string() => "0644".to_string(),
        };
        let file = ServiceInfoFile::from_config_map("welcome", &annotations, ["motd"].into_iter())
            .expect("file must be valid");
        assert_eq!(
            file,
            ServiceInfoFile {
                config_map: "welcome".to_string(),
                path: "/etc/motd".to_string(),
                permissions: Some("0644".to_string()),
                source_path: "/etc/fdo/files/welcome/motd".to_string(),
            }
        );
        assert_eq!(file.mount_path(), "/etc/fdo/files/welcome");
    }

    #[test]
    fn requires_name_and_path() {
        let annotations = btreemap! {
            NAME_ANNOTATION.to_string() => "motd".to_string(),
        };
        assert_eq!(
            ServiceInfoFile::from_config_map("welcome", &annotations, ["motd"].into_iter()),
            Err(Error::IncompleteFile("welcome".to_string()))
        );
    }

    #[test]
    fn requires_file_data() {
        let annotations = btreemap! {
            NAME_ANNOTATION.to_string() => "motd".to_string(),
            PATH_ANNOTATION.to_string() => "/etc/motd".to_string(),
        };
        assert_eq!(
            ServiceInfoFile::from_config_map("welcome", &annotations, ["issue"].into_iter()),
            Err(Error::MissingFileData {
                config_map: "welcome".to_string(),
                file: "motd".to_string(),
            })
        );
    }

    #[test]
    fn sorts_by_config_map() {
        let file = |cm: &str| ServiceInfoFile {
            config_map: cm.to_string(),
            path: "/tmp/f".to_string(),
            permissions: None,
            source_path: format!("/etc/fdo/files/{cm}/f"),
        };
        let mut files = vec![file("c"), file("a"), file("b")];
        sort(&mut files);
        let names = files.iter().map(|f| f.config_map.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
