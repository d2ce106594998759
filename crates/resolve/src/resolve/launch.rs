//! Launch option collection and the post-pass that turns the store's sparse,
//! unordered list into what a launcher shows.

use crate::models::{CpuArch, LaunchConfig, LaunchType, Platforms};
use appmeta_vdf::Section;
use std::collections::BTreeMap;
use std::path::Path;

use super::normalize_cpu_arch;

/// `config.launch.<N>`
pub(super) fn apply_launch(config: &mut LaunchConfig, section: &Section) {
    for (key, value) in section.pairs() {
        let text = value.to_string();
        match key.to_ascii_lowercase().as_str() {
            "executable" => config.executable = text,
            "arguments" => config.arguments = text,
            "workingdir" => config.working_dir = text,
            "type" => config.launch_type = LaunchType::from(text.as_str()),
            "description" => config.description = text,
            _ => tracing::trace!(key = %key, "Ignoring launch key"),
        }
    }
}

/// `config.launch.<N>.config`
pub(super) fn apply_restrictions(config: &mut LaunchConfig, section: &Section) {
    for (key, value) in section.pairs() {
        match key.to_ascii_lowercase().as_str() {
            "oslist" => config.platforms = Platforms::from_os_list(&value.to_string()),
            "osarch" => config.cpu_arch = normalize_cpu_arch(Some(value)),
            "betakey" => {
                config.required_branches = value.to_string().split_whitespace().map(str::to_string).collect();
            },
            _ => tracing::trace!(key = %key, "Ignoring launch restriction"),
        }
    }
}

/// A fresh config before any keys are applied. Without an `oslist` the
/// option runs everywhere.
pub(super) fn blank(source_id: u32) -> LaunchConfig {
    LaunchConfig {
        source_id,
        platforms: Platforms::ALL,
        cpu_arch: CpuArch::Unspecified,
        ..Default::default()
    }
}

fn is_valid(config: &LaunchConfig) -> bool {
    let executable = config.executable.trim();
    let is_exe = Path::new(&executable.replace('\\', "/"))
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
    !executable.is_empty() && is_exe && config.platforms.contains(Platforms::WINDOWS)
}

/// Validates, compacts, flags duplicates and picks the primary option.
///
/// `collected` is keyed by the store's own ids. The result is keyed by dense
/// display ids `0..N`, in source order except that the first unrestricted
/// `default` option is moved to the front.
pub(super) fn finish(collected: BTreeMap<u32, LaunchConfig>, retain_invalid: bool) -> BTreeMap<u32, LaunchConfig> {
    let mut configs: Vec<LaunchConfig> = collected
        .into_values()
        .map(|mut config| {
            config.valid = is_valid(&config);
            config
        })
        .filter(|config| {
            if !config.valid && !retain_invalid {
                tracing::debug!(source_id = config.source_id, executable = %config.executable, "Dropping unsupported launch option");
                return false;
            }
            true
        })
        .collect();

    mark_duplicates(&mut configs);

    if let Some(index) = configs
        .iter()
        .position(|config| config.launch_type == LaunchType::Default && !config.requires_branch())
    {
        configs.swap(0, index);
    }

    configs
        .into_iter()
        .enumerate()
        .map(|(index, mut config)| {
            let id = u32::try_from(index).unwrap_or(u32::MAX);
            config.id = id;
            (id, config)
        })
        .collect()
}

/// Flags every config that repeats the executable (and possibly arguments)
/// of one earlier in source order.
fn mark_duplicates(configs: &mut [LaunchConfig]) {
    for index in 1..configs.len() {
        let (earlier, rest) = configs.split_at_mut(index);
        let current = &mut rest[0];
        let executable = current.normalized_executable();
        let arguments = current.arguments.trim();
        let mut same_exe = earlier.iter().filter(|other| other.normalized_executable() == executable).peekable();
        if same_exe.peek().is_none() {
            continue;
        }
        let same_args = same_exe.any(|other| other.arguments.trim() == arguments);
        current.duplicate_exe = true;
        current.duplicate_exe_args = same_args;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(source_id: u32, executable: &str) -> LaunchConfig {
        LaunchConfig {
            executable: executable.to_string(),
            ..blank(source_id)
        }
    }

    #[rstest]
    #[case("game.exe", Platforms::ALL, true)]
    #[case("Bin\\Game.EXE", Platforms::WINDOWS, true)]
    #[case("game.exe", Platforms::LINUX, false)]
    #[case("game.sh", Platforms::ALL, false)]
    #[case("", Platforms::ALL, false)]
    #[case("game", Platforms::ALL, false)]
    fn validity(#[case] executable: &str, #[case] platforms: Platforms, #[case] expected: bool) {
        let config = LaunchConfig {
            platforms,
            ..config(0, executable)
        };
        assert_eq!(is_valid(&config), expected);
    }

    #[test]
    fn compaction_is_dense_and_stable() {
        let collected = BTreeMap::from([(0, config(0, "a.exe")), (3, config(3, "b.exe")), (7, config(7, "a.exe"))]);
        let configs = finish(collected, false);
        assert_eq!(configs.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(configs[&0].executable, "a.exe");
        assert_eq!(configs[&1].executable, "b.exe");
        assert_eq!(configs[&2].source_id, 7);
        assert!(configs[&2].duplicate_exe);
        assert!(configs[&2].duplicate_exe_args);
        assert!(!configs[&0].duplicate_exe);
        assert!(!configs[&1].duplicate_exe);
    }

    #[test]
    fn duplicates_compare_normalized_executables() {
        let mut later = config(1, "BIN/Game.exe");
        later.arguments = "-windowed".to_string();
        let collected = BTreeMap::from([(0, config(0, "bin\\game.exe")), (1, later)]);
        let configs = finish(collected, false);
        assert!(configs[&1].duplicate_exe);
        assert!(!configs[&1].duplicate_exe_args);
    }

    #[test]
    fn invalid_options_are_dropped_or_retained() {
        let mut linux = config(1, "game.exe");
        linux.platforms = Platforms::LINUX;
        let collected = BTreeMap::from([(0, config(0, "game.exe")), (1, linux), (2, config(2, "tool.exe"))]);

        let dropped = finish(collected.clone(), false);
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[&1].source_id, 2);

        let retained = finish(collected, true);
        assert_eq!(retained.len(), 3);
        assert!(!retained[&1].valid);
    }

    #[test]
    fn first_unrestricted_default_becomes_primary() {
        let mut beta_default = config(1, "beta.exe");
        beta_default.launch_type = LaunchType::Default;
        beta_default.required_branches.insert("beta".to_string());
        let mut default = config(2, "game.exe");
        default.launch_type = LaunchType::Default;
        let collected = BTreeMap::from([(0, config(0, "launcher.exe")), (1, beta_default), (2, default)]);

        let configs = finish(collected, false);
        assert_eq!(configs[&0].executable, "game.exe");
        assert_eq!(configs[&0].id, 0);
        assert_eq!(configs[&2].executable, "launcher.exe");
        assert_eq!(configs[&2].id, 2);
        assert_eq!(configs[&1].executable, "beta.exe");
    }

    #[test]
    fn restrictions() {
        let section = Section::new("1.config.launch.0.config")
            .with("oslist", "windows,macos")
            .with("osarch", "64")
            .with("betakey", "beta  experimental");
        let mut config = blank(0);
        apply_restrictions(&mut config, &section);
        assert_eq!(config.platforms, Platforms::WINDOWS | Platforms::MACOS);
        assert_eq!(config.cpu_arch, CpuArch::X64);
        assert_eq!(config.required_branches.len(), 2);
        assert!(config.is_available_on("experimental"));
    }
}
