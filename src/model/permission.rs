use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Visibility scope of a roster permission label.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionLevel {
    SystemAdmin,
    Approver,
    ApproverAndUser,
    GeneralUser,
}

impl PermissionLevel {
    pub fn default_label(self) -> &'static str {
        match self {
            PermissionLevel::SystemAdmin => "2. システム管理者",
            PermissionLevel::ApproverAndUser => "3. 利用者・承認者",
            PermissionLevel::Approver => "4. 承認者",
            PermissionLevel::GeneralUser => "5. 一般利用者",
        }
    }

    pub fn is_approver(self) -> bool {
        matches!(
            self,
            PermissionLevel::Approver | PermissionLevel::ApproverAndUser
        )
    }
}

/// Maps roster labels to levels, and records which levels may log in.
#[derive(Debug, Clone)]
pub struct PermissionSet {
    labels: HashMap<String, PermissionLevel>,
    login: BTreeSet<PermissionLevel>,
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            labels: PermissionLevel::iter()
                .map(|level| (level.default_label().to_string(), level))
                .collect(),
            login: PermissionLevel::iter().collect(),
        }
    }
}

impl PermissionSet {
    /// `labels` is `level=label;level=label`, `login` is `level,level`.
    /// Empty strings keep the defaults.
    pub fn from_config(labels: &str, login: &str) -> Result<Self> {
        let mut set = Self::default();

        if !labels.trim().is_empty() {
            set.labels.clear();
            for entry in labels.split(';').map(str::trim).filter(|e| !e.is_empty()) {
                let (level, label) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("PERMISSION_LABELS entry without '=': {entry}"))?;
                let level = PermissionLevel::from_str(level.trim())
                    .map_err(|_| anyhow!("unknown permission level: {}", level.trim()))?;
                set.labels.insert(label.trim().to_string(), level);
            }
        }

        if !login.trim().is_empty() {
            set.login = login
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| {
                    PermissionLevel::from_str(l)
                        .map_err(|_| anyhow!("unknown permission level: {l}"))
                })
                .collect::<Result<_>>()?;
        }

        Ok(set)
    }

    /// Unknown or blank labels resolve to `None`.
    pub fn level_of(&self, label: &str) -> Option<PermissionLevel> {
        self.labels.get(label.trim()).copied()
    }

    pub fn can_login(&self, label: &str) -> bool {
        self.level_of(label)
            .is_some_and(|level| self.login.contains(&level))
    }
}
