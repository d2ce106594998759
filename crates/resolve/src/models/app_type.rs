use std::fmt::{Display, Formatter, Result as FmtResult};
use std::{convert::Infallible, str::FromStr};

use super::sanitize;

/// Application type from the `common` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AppType {
    Game,
    Application,
    Tool,
    Demo,
    Dlc,
    Music,
    Video,
    Config,
    Beta,
    Driver,
    Media,
    /// Missing or not one of the above.
    #[default]
    Unknown,
}
impl AppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "Game",
            Self::Application => "Application",
            Self::Tool => "Tool",
            Self::Demo => "Demo",
            Self::Dlc => "DLC",
            Self::Music => "Music",
            Self::Video => "Video",
            Self::Config => "Config",
            Self::Beta => "Beta",
            Self::Driver => "Driver",
            Self::Media => "Media",
            Self::Unknown => "Unknown",
        }
    }

    /// Types that can be launched on their own.
    pub fn is_launchable(&self) -> bool {
        matches!(self, Self::Game | Self::Application | Self::Tool | Self::Demo | Self::Beta)
    }
}
impl FromStr for AppType {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "game" => Self::Game,
            "application" => Self::Application,
            "tool" => Self::Tool,
            "demo" => Self::Demo,
            "dlc" => Self::Dlc,
            "music" => Self::Music,
            "video" | "series" | "episode" => Self::Video,
            "config" => Self::Config,
            "beta" => Self::Beta,
            "driver" => Self::Driver,
            "media" => Self::Media,
            _ => Self::Unknown,
        })
    }
}
impl From<&str> for AppType {
    fn from(value: &str) -> Self {
        let Ok(app_type) = value.parse::<Self>();
        app_type
    }
}

impl Display for AppType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Game", AppType::Game)]
    #[case("game", AppType::Game)]
    #[case(" DLC ", AppType::Dlc)]
    #[case("Series", AppType::Video)]
    #[case("Screensaver", AppType::Unknown)]
    #[case("", AppType::Unknown)]
    fn from_str(#[case] input: &str, #[case] expected: AppType) {
        assert_eq!(AppType::from(input), expected);
    }

    #[rstest]
    #[case(AppType::Game, true)]
    #[case(AppType::Tool, true)]
    #[case(AppType::Dlc, false)]
    #[case(AppType::Config, false)]
    #[case(AppType::Unknown, false)]
    fn is_launchable(#[case] app_type: AppType, #[case] expected: bool) {
        assert_eq!(app_type.is_launchable(), expected);
    }
}
