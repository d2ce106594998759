use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of operating systems.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Platforms(u8);
impl Platforms {
    pub const NONE: Self = Self(0);
    pub const WINDOWS: Self = Self(1);
    pub const MACOS: Self = Self(1 << 1);
    pub const LINUX: Self = Self(1 << 2);
    pub const ALL: Self = Self(Self::WINDOWS.0 | Self::MACOS.0 | Self::LINUX.0);

    const NAMES: [(Self, &'static str); 3] =
        [(Self::WINDOWS, "windows"), (Self::MACOS, "macos"), (Self::LINUX, "linux")];

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parses a comma-separated OS list such as `windows,macos` by substring
    /// match. Operating systems that aren't mentioned are unsupported.
    pub fn from_os_list(list: &str) -> Self {
        let list = list.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .filter(|(_, name)| list.contains(name))
            .fold(Self::NONE, |acc, (platform, _)| acc | *platform)
    }

    /// Maps one platform name as used by cloud save rules (`Windows`,
    /// `MacOS`, `Linux`, `all`).
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "all" => Self::ALL,
            "osx" => Self::MACOS,
            _ => Self::from_os_list(&name),
        }
    }
}
impl BitOr for Platforms {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
impl BitOrAssign for Platforms {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for Platforms {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let names: Vec<_> =
            Self::NAMES.iter().filter(|(platform, _)| self.contains(*platform)).map(|(_, name)| *name).collect();
        write!(f, "{}", names.join(","))
    }
}
impl Debug for Platforms {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Platforms({self})")
    }
}
