//! Binary group-membership authorization.
//!
//! Both authentication strategies layer the same gate on top of identity
//! establishment: the user's group memberships are checked against a
//! configured allow-list. An empty allow-list means no restriction.

use serde::{Deserialize, Serialize};

/// A configured set of allowed group identifiers.
///
/// For the federated strategy the entries are provider group IDs and matching
/// is exact. For the directory strategy the entries are common names or DN
/// fragments and matching is a case-insensitive substring test: the directory
/// group list carries both the extracted CN and the full distinguished name
/// per group, so a short allowed CN like `Admins` matches
/// `CN=Admins,OU=Groups,DC=example,DC=com`. This is deliberately looser than
/// the federated exact match and can over-authorize when a short allowed name
/// happens to occur inside an unrelated group's DN; it is preserved for
/// compatibility with existing deployments rather than silently tightened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAllowList {
    groups: Vec<String>,
}

impl GroupAllowList {
    /// Creates an allow-list, trimming whitespace and dropping empty entries.
    #[must_use]
    pub fn new(groups: Vec<String>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated allow-list as configured in the environment.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    /// Returns true when no restriction is configured: any authenticated
    /// identity passes.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the configured entries.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Exact-match authorization used by the federated strategy.
    ///
    /// Returns true on the first user group that equals an allowed entry.
    #[must_use]
    pub fn permits_exact(&self, user_groups: &[String]) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        user_groups
            .iter()
            .any(|g| self.groups.iter().any(|allowed| allowed == g))
    }

    /// Substring authorization used by the directory strategy.
    ///
    /// Each user group is checked for containing an allowed entry,
    /// case-insensitively. See the type docs for why this is looser than
    /// [`permits_exact`](Self::permits_exact).
    #[must_use]
    pub fn permits_contains(&self, user_groups: &[String]) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        self.groups.iter().any(|allowed| {
            let needle = allowed.to_lowercase();
            user_groups
                .iter()
                .any(|g| g.to_lowercase().contains(&needle))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_allow_list_permits_anything() {
        let list = GroupAllowList::default();
        assert!(list.is_unrestricted());
        assert!(list.permits_exact(&groups(&["anything"])));
        assert!(list.permits_exact(&[]));
        assert!(list.permits_contains(&groups(&["anything"])));
        assert!(list.permits_contains(&[]));
    }

    #[test]
    fn from_csv_trims_and_drops_empty_entries() {
        let list = GroupAllowList::from_csv(" Admins , , Operators ");
        assert_eq!(list.groups(), &["Admins", "Operators"]);
    }

    #[test]
    fn exact_match_requires_equality() {
        let list = GroupAllowList::from_csv("group-id-1,group-id-2");
        assert!(list.permits_exact(&groups(&["group-id-2"])));
        assert!(!list.permits_exact(&groups(&["group-id-20"])));
        assert!(!list.permits_exact(&[]));
    }

    #[test]
    fn contains_match_is_case_insensitive_substring() {
        let list = GroupAllowList::from_csv("Admins");
        assert!(list.permits_contains(&groups(&["CN=admins,OU=Groups,DC=x"])));
        assert!(list.permits_contains(&groups(&["Admins"])));
        assert!(!list.permits_contains(&groups(&["CN=Users,OU=Groups,DC=x"])));
    }

    #[test]
    fn contains_match_short_circuits_on_any_pair() {
        let list = GroupAllowList::from_csv("Nope,Admins");
        let user = groups(&["CN=Users,DC=x", "CN=Admins,OU=Groups,DC=x"]);
        assert!(list.permits_contains(&user));
    }

    #[test]
    fn directory_scenario_cn_in_full_dn() {
        // A user carrying both CN fragments and full DNs matches a short
        // allowed CN against the full DN entry.
        let list = GroupAllowList::from_csv("Admins");
        let user = groups(&["CN=Admins,OU=Groups,DC=x", "CN=Users,OU=Groups,DC=x"]);
        assert!(list.permits_contains(&user));
    }
}
