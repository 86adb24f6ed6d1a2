use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ClassifyError;

/// The fixed set of role names utterances are labeled with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TargetRoles(Vec<String>);

impl TargetRoles {
    /// Build a role set. Needs at least two distinct, non-empty roles that
    /// can stand in for a tag (no colon, no line break).
    pub fn new<I, S>(roles: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: Vec<String> = roles.into_iter().map(|r| r.into().trim().to_string()).collect();

        if roles.len() < 2 {
            return Err(invalid(format!(
                "at least two roles are required, got {}",
                roles.len()
            )));
        }
        for (i, role) in roles.iter().enumerate() {
            if role.is_empty() {
                return Err(invalid("roles must not be empty".to_string()));
            }
            if role.contains(':') || role.contains('\n') {
                return Err(invalid(format!(
                    "role '{}' must not contain a colon or line break",
                    role
                )));
            }
            if roles[..i].contains(role) {
                return Err(invalid(format!("role '{}' is listed twice", role)));
            }
        }

        Ok(Self(roles))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// "Agent and Customer", "A, B and C"
    pub fn describe(&self) -> String {
        match self.0.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }

    /// Roles as a quoted, comma separated list
    pub fn quoted(&self) -> String {
        self.0
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for TargetRoles {
    fn default() -> Self {
        Self(vec!["Agent".to_string(), "Customer".to_string()])
    }
}

impl FromStr for TargetRoles {
    type Err = ClassifyError;

    /// Parse a comma separated list such as `Sales,Lead`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(','))
    }
}

fn invalid(detail: String) -> ClassifyError {
    ClassifyError::InvalidTargetRoles { detail }
}

/// Speaker tag to role assignment, ordered by tag for stable output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleMapping(BTreeMap<String, String>);

impl RoleMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, role: impl Into<String>) {
        self.0.insert(tag.into(), role.into());
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RoleMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let roles = TargetRoles::default();
        assert_eq!(roles.as_slice(), ["Agent", "Customer"]);
        assert_eq!(roles.describe(), "Agent and Customer");
        assert_eq!(roles.quoted(), "\"Agent\", \"Customer\"");
    }

    #[test]
    fn test_parse_roles_from_str() {
        let roles: TargetRoles = " Sales , Lead ".parse().unwrap();
        assert_eq!(roles.as_slice(), ["Sales", "Lead"]);

        let three: TargetRoles = "Doctor,Patient,Nurse".parse().unwrap();
        assert_eq!(three.describe(), "Doctor, Patient and Nurse");
    }

    #[test]
    fn test_rejects_bad_roles() {
        assert!("Agent".parse::<TargetRoles>().is_err());
        assert!("Agent,".parse::<TargetRoles>().is_err());
        assert!("Agent,Agent".parse::<TargetRoles>().is_err());
        assert!("Agent:1,Customer".parse::<TargetRoles>().is_err());
    }

    #[test]
    fn test_mapping_serializes_sorted() {
        let mapping: RoleMapping = [("Speaker 1", "Customer"), ("Speaker 0", "Agent")]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&mapping).unwrap(),
            r#"{"Speaker 0":"Agent","Speaker 1":"Customer"}"#
        );
        assert_eq!(mapping.get("Speaker 1"), Some("Customer"));
    }
}
