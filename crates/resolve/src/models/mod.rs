mod app_type;
mod arch;
mod branch;
mod cloud;
mod launch;
mod metadata;
mod platform;

pub use self::app_type::AppType;
pub use self::arch::CpuArch;
pub use self::branch::BranchRecord;
pub use self::cloud::CloudSaveRecord;
pub use self::launch::{LaunchConfig, LaunchType};
pub use self::metadata::ApplicationMetadata;
pub use self::platform::Platforms;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['-', '_', ' '], "")
}
