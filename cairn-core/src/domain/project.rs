//! SCM project domain types

use serde::{Deserialize, Serialize};

/// Kind of SCM project configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKind {
    /// Regular development line
    Normal,
    /// Variant (branch) development line
    Variant,
    /// Build configuration pinned to a checkpoint; cannot be checkpointed
    Build,
}

impl ProjectKind {
    /// Maps the server's `projectType` field value
    pub fn from_project_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "build" => ProjectKind::Build,
            "variant" => ProjectKind::Variant,
            _ => ProjectKind::Normal,
        }
    }
}

/// Handle to one SCM project configuration
///
/// The configuration path is what the server knows the project by and is
/// used in every diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub configuration_name: String,
    pub configuration_path: String,
    pub kind: ProjectKind,
}

impl ProjectHandle {
    pub fn new(
        configuration_name: impl Into<String>,
        configuration_path: impl Into<String>,
        kind: ProjectKind,
    ) -> Self {
        Self {
            configuration_name: configuration_name.into(),
            configuration_path: configuration_path.into(),
            kind,
        }
    }

    pub fn is_build_configuration(&self) -> bool {
        self.kind == ProjectKind::Build
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_kind_from_type() {
        assert_eq!(ProjectKind::from_project_type("Build"), ProjectKind::Build);
        assert_eq!(ProjectKind::from_project_type("variant"), ProjectKind::Variant);
        assert_eq!(ProjectKind::from_project_type("Normal"), ProjectKind::Normal);
        assert_eq!(ProjectKind::from_project_type(""), ProjectKind::Normal);
    }

    #[test]
    fn test_build_configuration_flag() {
        let build = ProjectHandle::new("release", "#/repo/project.pj#b=1.4", ProjectKind::Build);
        assert!(build.is_build_configuration());

        let normal = ProjectHandle::new("main", "/repo/project.pj", ProjectKind::Normal);
        assert!(!normal.is_build_configuration());
    }
}
