use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Role slugs seeded by the initial migration.
pub const SUPER_ADMIN: &str = "super-admin";
pub const EDITOR: &str = "editor";
pub const VIEWER: &str = "viewer";

/// Roles allowed to write content (posts, taxonomy, portfolio, careers, media).
pub const CONTENT_WRITERS: &[&str] = &[SUPER_ADMIN, EDITOR];

/// A content area guarded by the permission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Users,
    Blog,
    Services,
    Careers,
    Media,
    Settings,
}

/// An operation within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Publish,
    Upload,
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("unknown permission module `{0}`")]
    UnknownModule(String),
    #[error("unknown permission action `{0}`")]
    UnknownAction(String),
    #[error("permission map is not a module -> action -> bool object: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Blog => "blog",
            Self::Services => "services",
            Self::Careers => "careers",
            Self::Media => "media",
            Self::Settings => "settings",
        }
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Upload => "upload",
        }
    }
}

impl FromStr for Module {
    type Err = PermissionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "users" => Ok(Self::Users),
            "blog" => Ok(Self::Blog),
            "services" => Ok(Self::Services),
            "careers" => Ok(Self::Careers),
            "media" => Ok(Self::Media),
            "settings" => Ok(Self::Settings),
            other => Err(PermissionError::UnknownModule(other.to_string())),
        }
    }
}

impl FromStr for Action {
    type Err = PermissionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "publish" => Ok(Self::Publish),
            "upload" => Ok(Self::Upload),
            other => Err(PermissionError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PermissionMap
///
/// Typed `module × action → bool` lookup table. Built from the role's JSONB column
/// when the role is loaded; unknown module or action names are a load error, so a
/// typo in the stored map can never silently grant or hide access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, BTreeMap<String, bool>>")]
pub struct PermissionMap(BTreeMap<Module, BTreeMap<Action, bool>>);

impl PermissionMap {
    /// allows
    ///
    /// True only when the map holds an explicit `true` for the pair.
    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.0
            .get(&module)
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(false)
    }

    /// Builder used by seeds and tests: grants each listed action on `module`.
    pub fn grant(mut self, module: Module, actions: &[Action]) -> Self {
        let entry = self.0.entry(module).or_default();
        for action in actions {
            entry.insert(*action, true);
        }
        self
    }

    /// Records an explicit denial, mirroring the `false` entries of the seeded maps.
    pub fn deny(mut self, module: Module, actions: &[Action]) -> Self {
        let entry = self.0.entry(module).or_default();
        for action in actions {
            entry.insert(*action, false);
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl TryFrom<BTreeMap<String, BTreeMap<String, bool>>> for PermissionMap {
    type Error = PermissionError;

    fn try_from(raw: BTreeMap<String, BTreeMap<String, bool>>) -> Result<Self, Self::Error> {
        let mut map = BTreeMap::new();
        for (module, actions) in raw {
            let module: Module = module.parse()?;
            let mut parsed = BTreeMap::new();
            for (action, allowed) in actions {
                parsed.insert(action.parse::<Action>()?, allowed);
            }
            map.insert(module, parsed);
        }
        Ok(Self(map))
    }
}

/// Used by `#[sqlx(try_from = "serde_json::Value")]` when a role row is decoded.
impl TryFrom<serde_json::Value> for PermissionMap {
    type Error = PermissionError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let raw: BTreeMap<String, BTreeMap<String, bool>> = serde_json::from_value(value)?;
        raw.try_into()
    }
}

// --- Seeded role maps ---

/// Full access to every module.
pub fn super_admin_permissions() -> PermissionMap {
    use Action::*;
    PermissionMap::default()
        .grant(Module::Users, &[Create, Read, Update, Delete])
        .grant(Module::Blog, &[Create, Read, Update, Delete, Publish])
        .grant(Module::Services, &[Create, Read, Update, Delete, Publish])
        .grant(Module::Careers, &[Create, Read, Update, Delete, Publish])
        .grant(Module::Media, &[Upload, Read, Update, Delete])
        .grant(Module::Settings, &[Read, Update])
}

/// Content management without destructive actions or user administration.
pub fn editor_permissions() -> PermissionMap {
    use Action::*;
    PermissionMap::default()
        .grant(Module::Users, &[Read])
        .deny(Module::Users, &[Create, Update, Delete])
        .grant(Module::Blog, &[Create, Read, Update, Publish])
        .deny(Module::Blog, &[Delete])
        .grant(Module::Services, &[Create, Read, Update, Publish])
        .deny(Module::Services, &[Delete])
        .grant(Module::Careers, &[Create, Read, Update, Publish])
        .deny(Module::Careers, &[Delete])
        .grant(Module::Media, &[Upload, Read, Update])
        .deny(Module::Media, &[Delete])
        .grant(Module::Settings, &[Read])
        .deny(Module::Settings, &[Update])
}

/// Read-only access to content.
pub fn viewer_permissions() -> PermissionMap {
    use Action::*;
    PermissionMap::default()
        .deny(Module::Users, &[Read])
        .grant(Module::Blog, &[Read])
        .grant(Module::Services, &[Read])
        .grant(Module::Careers, &[Read])
        .grant(Module::Media, &[Read])
        .grant(Module::Settings, &[Read])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_stored_json_and_checks_pairs() {
        let map = PermissionMap::try_from(json!({
            "blog": { "create": true, "delete": false },
            "media": { "upload": true }
        }))
        .unwrap();

        assert!(map.allows(Module::Blog, Action::Create));
        assert!(!map.allows(Module::Blog, Action::Delete));
        assert!(map.allows(Module::Media, Action::Upload));
        // Absent entries deny.
        assert!(!map.allows(Module::Users, Action::Read));
    }

    #[test]
    fn rejects_unknown_names_at_load_time() {
        let err = PermissionMap::try_from(json!({ "blgo": { "read": true } })).unwrap_err();
        assert!(matches!(err, PermissionError::UnknownModule(m) if m == "blgo"));

        let err = PermissionMap::try_from(json!({ "blog": { "erase": true } })).unwrap_err();
        assert!(matches!(err, PermissionError::UnknownAction(a) if a == "erase"));

        assert!(PermissionMap::try_from(json!({ "blog": ["read"] })).is_err());
    }

    #[test]
    fn json_round_trip_keeps_lowercase_names() {
        let value = editor_permissions().to_json();
        assert_eq!(value["blog"]["update"], json!(true));
        assert_eq!(value["blog"]["delete"], json!(false));
        assert_eq!(PermissionMap::try_from(value).unwrap(), editor_permissions());
    }

    #[test]
    fn seeded_roles_differ_where_expected() {
        assert!(super_admin_permissions().allows(Module::Media, Action::Delete));
        assert!(!editor_permissions().allows(Module::Media, Action::Delete));
        assert!(editor_permissions().allows(Module::Blog, Action::Publish));
        assert!(!viewer_permissions().allows(Module::Blog, Action::Create));
        assert!(!viewer_permissions().allows(Module::Users, Action::Read));
    }
}
