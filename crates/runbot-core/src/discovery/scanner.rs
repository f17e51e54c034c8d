//! Filesystem scanner for profiles and test classes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use super::descriptor::parse_profile_ids;
use super::{DiscoveredUnit, ScanError};
use crate::config::DiscoveryConfig;

/// Scans a framework checkout for runnable units.
///
/// Scanning has no side effects and nothing is cached, so it is safe to
/// call repeatedly.
#[derive(Debug, Clone, Default)]
pub struct TestSuiteScanner {
    config: DiscoveryConfig,
}

/// A test class file found under the test source tree.
struct ClassFile {
    class_name: String,
    /// Path components between the test root and the file.
    parents: Vec<String>,
}

impl TestSuiteScanner {
    /// Creates a scanner with the default layout and exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner with custom configuration.
    pub fn with_config(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Discover every profile unit and class unit under `root`.
    ///
    /// Profiles come first, in descriptor order, followed by classes in
    /// path order. A missing root yields an empty list.
    pub fn scan(&self, root: &Path) -> Vec<DiscoveredUnit> {
        if !root.is_dir() {
            warn!(path = %root.display(), "framework path does not exist");
            return Vec::new();
        }

        let mut units = self.scan_profiles(root);
        let profile_count = units.len();

        units.extend(
            self.scan_class_files(root)
                .into_iter()
                .map(|file| DiscoveredUnit::from_test_class(file.class_name)),
        );

        info!(
            total = units.len(),
            profiles = profile_count,
            test_classes = units.len() - profile_count,
            "discovered runnable units"
        );

        units
    }

    /// Discover class units bucketed by their immediate parent directory.
    ///
    /// Classes directly under the test root have no group and are skipped.
    /// Within a group, units keep path order.
    pub fn scan_grouped(&self, root: &Path) -> BTreeMap<String, Vec<DiscoveredUnit>> {
        let mut groups: BTreeMap<String, Vec<DiscoveredUnit>> = BTreeMap::new();

        for file in self.scan_class_files(root) {
            let Some(group) = file.parents.last() else {
                debug!(class = %file.class_name, "test class at test root, no group");
                continue;
            };

            let unit = DiscoveredUnit::from_test_class(&file.class_name);
            debug!(
                class = %file.class_name,
                group = %group,
                sub_command = %unit.command_name,
                "discovered grouped test"
            );
            groups.entry(group.clone()).or_default().push(unit);
        }

        info!(
            groups = groups.len(),
            test_classes = groups.values().map(Vec::len).sum::<usize>(),
            "discovered test groups"
        );

        groups
    }

    fn test_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.config.test_source_dir)
    }

    /// Read profile ids from the build descriptor.
    fn scan_profiles(&self, root: &Path) -> Vec<DiscoveredUnit> {
        let descriptor = root.join(&self.config.descriptor_file);
        if !descriptor.is_file() {
            warn!(path = %descriptor.display(), "build descriptor not found");
            return Vec::new();
        }

        let ids = fs::read_to_string(&descriptor)
            .map_err(|e| ScanError::io(&descriptor, e))
            .and_then(|xml| parse_profile_ids(&xml));

        match ids {
            Ok(ids) => ids
                .into_iter()
                .inspect(|id| debug!(profile = %id, "discovered profile"))
                .map(DiscoveredUnit::from_profile)
                .collect(),
            Err(e) => {
                warn!(path = %descriptor.display(), error = %e, "failed to read profiles");
                Vec::new()
            }
        }
    }

    /// Walk the test source tree and keep every runnable test class file.
    fn scan_class_files(&self, root: &Path) -> Vec<ClassFile> {
        let test_dir = self.test_dir(root);
        if !test_dir.is_dir() {
            warn!(path = %test_dir.display(), "test directory not found");
            return Vec::new();
        }

        let walker = WalkBuilder::new(&test_dir)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %ScanError::from(e), "skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if let Some(file) = self.class_file(&test_dir, path) {
                files.push(file);
            }
        }

        files
    }

    /// Apply the naming convention and exclusions to one file.
    fn class_file(&self, test_dir: &Path, path: &Path) -> Option<ClassFile> {
        let file_name = path.file_name()?.to_str()?;
        if !file_name.ends_with(&self.config.test_file_suffix) {
            return None;
        }

        let class_name = path.file_stem()?.to_str()?.to_string();
        if self.config.excluded_classes.contains(&class_name) {
            debug!(class = %class_name, "excluded base class");
            return None;
        }

        let relative = path.strip_prefix(test_dir).ok()?;
        let parents: Vec<String> = relative
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(name) => name.to_str().map(str::to_string),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(dir) = parents
            .iter()
            .find(|dir| self.config.excluded_dirs.contains(dir))
        {
            debug!(class = %class_name, dir = %dir, "excluded directory");
            return None;
        }

        Some(ClassFile {
            class_name,
            parents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let scanner = TestSuiteScanner::new();
        assert!(scanner.scan(Path::new("/definitely/not/here")).is_empty());
        assert!(scanner.scan_grouped(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_only_suffix_matches() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/test/java/com/app/ui/LoginTest.java");
        touch(temp.path(), "src/test/java/com/app/ui/LoginPage.java");
        touch(temp.path(), "src/test/java/com/app/ui/LoginTest.kt");

        let units = TestSuiteScanner::new().scan(temp.path());
        let names: Vec<_> = units.iter().map(|u| u.command_name.as_str()).collect();
        assert_eq!(names, vec!["login"]);
    }

    #[test]
    fn test_hidden_directories_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/test/java/.cache/GhostTest.java");
        touch(temp.path(), "src/test/java/ui/HomeTest.java");

        let units = TestSuiteScanner::new().scan(temp.path());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].command_name, "home");
    }

    #[test]
    fn test_custom_layout() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "tests/suite/CheckoutSpec.groovy");

        let config = DiscoveryConfig {
            test_source_dir: "tests".to_string(),
            test_file_suffix: "Spec.groovy".to_string(),
            ..DiscoveryConfig::default()
        };
        let units = TestSuiteScanner::with_config(config).scan(temp.path());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].test_class.as_deref(), Some("CheckoutSpec"));
        assert_eq!(units[0].command_name, "checkoutspec");
    }
}
