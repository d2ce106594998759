use crate::models::BranchRecord;
use appmeta_appinfo::AppId;
use appmeta_vdf::Section;

/// `depots.branches.<name>`. Returns `None` when the section has none of the
/// branch keys.
pub(super) fn read_branch(app: AppId, section: &Section) -> Option<BranchRecord> {
    let mut branch = BranchRecord::new(app, section.name());
    let mut recognized = 0usize;
    for (key, value) in section.pairs() {
        match key.to_ascii_lowercase().as_str() {
            "buildid" => branch.build_id = value.to_integer().and_then(|id| u64::try_from(id).ok()),
            "pwdrequired" => branch.password_required = value.to_integer().is_some_and(|flag| flag != 0),
            "timeupdated" => branch.last_updated = value.to_integer(),
            "description" => branch.description = value.to_string(),
            _ => {
                tracing::trace!(key = %key, branch = %branch.name, "Ignoring branch key");
                continue;
            },
        }
        recognized += 1;
    }
    (recognized > 0).then_some(branch)
}
