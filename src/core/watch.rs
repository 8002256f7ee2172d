use crate::core::config::WatchConfig;

/// The three allow-list categories, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Owner,
    Repository,
    Branch,
}

impl WatchKind {
    pub const ALL: [WatchKind; 3] = [WatchKind::Owner, WatchKind::Repository, WatchKind::Branch];

    pub fn key(&self) -> &'static str {
        match self {
            WatchKind::Owner => "owners",
            WatchKind::Repository => "repositories",
            WatchKind::Branch => "branches",
        }
    }

    /// Domain error code returned to the webhook sender when the value is not watched.
    pub fn error_code(&self) -> u16 {
        match self {
            WatchKind::Owner => 1001,
            WatchKind::Repository => 1002,
            WatchKind::Branch => 1003,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WatchKind::Owner => "Owner",
            WatchKind::Repository => "Repository",
            WatchKind::Branch => "Branch",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchList {
    owners: Vec<String>,
    repositories: Vec<String>,
    branches: Vec<String>,
}

impl WatchList {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            owners: split_watched(&config.owners),
            repositories: split_watched(&config.repositories),
            branches: split_watched(&config.branches),
        }
    }

    pub fn entries(&self, kind: WatchKind) -> &[String] {
        match kind {
            WatchKind::Owner => &self.owners,
            WatchKind::Repository => &self.repositories,
            WatchKind::Branch => &self.branches,
        }
    }

    /// Exact, case-sensitive membership. An empty list matches nothing.
    pub fn is_watched(&self, value: &str, kind: WatchKind) -> bool {
        self.entries(kind).iter().any(|e| e == value)
    }

    /// First category (owner, repository, branch) whose value is not watched.
    pub fn first_unwatched<'a>(
        &self,
        owner: &'a str,
        repository: &'a str,
        branch: &'a str,
    ) -> Option<(WatchKind, &'a str)> {
        [owner, repository, branch]
            .into_iter()
            .zip(WatchKind::ALL)
            .find(|(value, kind)| !self.is_watched(value, *kind))
            .map(|(value, kind)| (kind, value))
    }
}

fn split_watched(raw: &str) -> Vec<String> {
    raw.split(';')
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(owners: &str, repositories: &str, branches: &str) -> WatchList {
        WatchList::from_config(&WatchConfig {
            owners: owners.to_string(),
            repositories: repositories.to_string(),
            branches: branches.to_string(),
        })
    }

    #[test]
    fn exact_match_only() {
        let list = watch("acme;globex", "", "");
        assert!(list.is_watched("acme", WatchKind::Owner));
        assert!(list.is_watched("globex", WatchKind::Owner));
        assert!(!list.is_watched("Acme", WatchKind::Owner));
        assert!(!list.is_watched("acm", WatchKind::Owner));
        assert!(!list.is_watched("acme;globex", WatchKind::Owner));
        assert!(!list.is_watched("*", WatchKind::Owner));
    }

    #[test]
    fn order_does_not_matter() {
        let a = watch("", "", "prod;staging;dev");
        let b = watch("", "", "dev;prod;staging");
        for branch in ["prod", "staging", "dev", "main"] {
            assert_eq!(
                a.is_watched(branch, WatchKind::Branch),
                b.is_watched(branch, WatchKind::Branch)
            );
        }
    }

    #[test]
    fn empty_list_matches_nothing() {
        let list = watch("", "", "");
        assert!(!list.is_watched("x", WatchKind::Owner));
        assert!(!list.is_watched("", WatchKind::Owner));
        assert!(!list.is_watched("", WatchKind::Branch));
    }

    #[test]
    fn categories_are_independent() {
        let list = watch("acme", "site", "prod");
        assert!(!list.is_watched("site", WatchKind::Owner));
        assert!(!list.is_watched("acme", WatchKind::Branch));
        assert!(list.is_watched("site", WatchKind::Repository));
    }

    #[test]
    fn first_unwatched_checks_owner_then_repository_then_branch() {
        let list = watch("acme", "site", "prod");
        assert_eq!(list.first_unwatched("acme", "site", "prod"), None);
        assert_eq!(
            list.first_unwatched("initech", "other", "dev"),
            Some((WatchKind::Owner, "initech"))
        );
        assert_eq!(
            list.first_unwatched("acme", "other", "dev"),
            Some((WatchKind::Repository, "other"))
        );
        assert_eq!(
            list.first_unwatched("acme", "site", "dev"),
            Some((WatchKind::Branch, "dev"))
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(WatchKind::Owner.error_code(), 1001);
        assert_eq!(WatchKind::Repository.error_code(), 1002);
        assert_eq!(WatchKind::Branch.error_code(), 1003);
    }
}
