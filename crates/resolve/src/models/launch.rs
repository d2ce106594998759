use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::{convert::Infallible, str::FromStr};

use super::{CpuArch, Platforms, sanitize};

/// How the store labels a launch option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaunchType {
    /// No `type` key.
    #[default]
    Unspecified,
    /// The option the store client starts when asked to "play".
    Default,
    /// One of the numbered alternatives (`option1`, `option2`, ...).
    Option,
    /// Explicitly hidden from the launch menu.
    None,
    Server,
    Editor,
    Manual,
    /// Any of the VR flavours.
    Vr,
    Config,
    Other,
}
impl LaunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Default => "default",
            Self::Option => "option",
            Self::None => "none",
            Self::Server => "server",
            Self::Editor => "editor",
            Self::Manual => "manual",
            Self::Vr => "vr",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}
impl FromStr for LaunchType {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sanitized = sanitize(s);
        Ok(match sanitized.as_str() {
            "" => Self::Unspecified,
            "default" => Self::Default,
            "none" => Self::None,
            "server" => Self::Server,
            "editor" => Self::Editor,
            "manual" => Self::Manual,
            "vr" | "othervr" | "openvroverlay" | "osvr" => Self::Vr,
            "config" => Self::Config,
            s if s.starts_with("option") => Self::Option,
            _ => Self::Other,
        })
    }
}
impl From<&str> for LaunchType {
    fn from(value: &str) -> Self {
        let Ok(launch_type) = value.parse::<Self>();
        launch_type
    }
}

impl Display for LaunchType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// One way of starting an application.
///
/// Built during resolution and read-only afterwards. The launch collaborator
/// only needs [`executable`](Self::executable), [`arguments`](Self::arguments)
/// and [`working_dir`](Self::working_dir), all relative to the install
/// directory as the store writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaunchConfig {
    /// Dense display id, equal to this config's key in
    /// [`ApplicationMetadata::launch_configs`](super::ApplicationMetadata::launch_configs).
    pub id: u32,
    /// The store's own (sparse) number for this config.
    pub source_id: u32,
    pub launch_type: LaunchType,
    pub description: String,
    pub executable: String,
    pub arguments: String,
    pub working_dir: String,
    pub platforms: Platforms,
    pub cpu_arch: CpuArch,
    /// Branches this config is restricted to; empty for all branches.
    pub required_branches: BTreeSet<String>,
    /// Points at a Windows executable and supports Windows.
    pub valid: bool,
    /// An earlier config starts the same executable.
    pub duplicate_exe: bool,
    /// An earlier config starts the same executable with the same arguments.
    pub duplicate_exe_args: bool,
}
impl LaunchConfig {
    pub fn requires_branch(&self) -> bool {
        !self.required_branches.is_empty()
    }

    /// Whether this config applies when `branch` is installed.
    pub fn is_available_on(&self, branch: &str) -> bool {
        !self.requires_branch() || self.required_branches.iter().any(|b| b.eq_ignore_ascii_case(branch))
    }

    /// Executable with forward slashes and lowercased, for comparing entries.
    pub(crate) fn normalized_executable(&self) -> String {
        self.executable.trim().replace('\\', "/").to_lowercase()
    }
}
