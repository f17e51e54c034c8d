//! Discovery of runnable test units.
//!
//! A framework checkout exposes two kinds of units:
//! - build profiles declared in the build descriptor (`pom.xml`)
//! - test classes under the test source tree (`src/test/java/**/*Test.java`)
//!
//! Command names derived here are what operators type in the chat, so the
//! derivation rule is stable: profile ids are used as-is, class names lose a
//! trailing `Test` and are lower-cased.

mod descriptor;
mod registrar;
mod scanner;

pub use descriptor::parse_profile_ids;
pub use registrar::{flat_commands, group_commands, DynamicCommandRegistrar};
pub use scanner::TestSuiteScanner;

use std::path::PathBuf;
use thiserror::Error;

use crate::run::RunTarget;

/// One discoverable thing to run.
///
/// Exactly one of `profile` and `test_class` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUnit {
    pub command_name: String,
    pub description: String,
    pub profile: Option<String>,
    pub test_class: Option<String>,
}

impl DiscoveredUnit {
    /// A unit backed by a build profile.
    pub fn from_profile(profile_id: impl Into<String>) -> Self {
        let profile_id = profile_id.into();
        Self {
            command_name: profile_id.clone(),
            description: format!("Run {} test suite (profile)", profile_id),
            profile: Some(profile_id),
            test_class: None,
        }
    }

    /// A unit backed by a single test class.
    pub fn from_test_class(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            command_name: derive_command_name(&class_name),
            description: format!("Run {}", class_name),
            profile: None,
            test_class: Some(class_name),
        }
    }

    pub fn is_profile(&self) -> bool {
        self.profile.is_some()
    }

    /// What the runner is asked to execute for this unit.
    pub fn target(&self) -> Option<RunTarget> {
        match (&self.profile, &self.test_class) {
            (Some(profile), None) => Some(RunTarget::Profile(profile.clone())),
            (None, Some(class)) => Some(RunTarget::Class(class.clone())),
            _ => None,
        }
    }
}

/// Derive a command name from a test class name.
///
/// `CreateProductTest` → `createproduct`, `HomePageTest` → `homepage`,
/// `AuthApiTest` → `authapi`. Names without the suffix are only lower-cased.
pub fn derive_command_name(class_name: &str) -> String {
    class_name
        .strip_suffix("Test")
        .unwrap_or(class_name)
        .to_lowercase()
}

/// Errors raised while reading discovery sources.
///
/// The scanner never lets these escape: a broken source yields no units.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed build descriptor: {0}")]
    Descriptor(String),

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}
