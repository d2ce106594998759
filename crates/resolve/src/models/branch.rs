use appmeta_appinfo::AppId;
use time::UtcDateTime;

/// A named build channel of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchRecord {
    pub name: String,
    /// The owning application. For display only; look the owner up by id.
    pub app: AppId,
    pub build_id: Option<u64>,
    pub password_required: bool,
    /// Unix timestamp of the last build pushed to this branch.
    pub last_updated: Option<i64>,
    pub description: String,
}
impl BranchRecord {
    pub fn new(app: AppId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app,
            ..Default::default()
        }
    }

    pub fn updated_at(&self) -> Option<UtcDateTime> {
        self.last_updated.and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
    }
}
