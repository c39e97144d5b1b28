//! Assignee grouping.
//!
//! Named assignees appear in the order they are first seen in the search
//! result; issues without an owner are collected under
//! [`UNASSIGNED`](nudge_common::types::UNASSIGNED), which always comes last.
//! Within a group issues keep their tracker order.

use std::collections::HashMap;

use nudge_common::types::{Issue, UNASSIGNED};

/// Issues owned by one assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeGroup {
    pub assignee: String,
    pub issues: Vec<Issue>,
}

/// Group issues by [`Issue::assignee`] (exact, case-sensitive match).
pub fn group_by_assignee(issues: &[Issue]) -> Vec<AssigneeGroup> {
    let mut groups: Vec<AssigneeGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut unassigned: Vec<Issue> = Vec::new();

    for issue in issues {
        let name = issue.assignee();
        if name == UNASSIGNED {
            unassigned.push(issue.clone());
            continue;
        }

        match positions.get(name) {
            Some(&pos) => groups[pos].issues.push(issue.clone()),
            None => {
                positions.insert(name, groups.len());
                groups.push(AssigneeGroup {
                    assignee: name.to_string(),
                    issues: vec![issue.clone()],
                });
            }
        }
    }

    if !unassigned.is_empty() {
        groups.push(AssigneeGroup {
            assignee: UNASSIGNED.to_string(),
            issues: unassigned,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn issue(key: &str, assignee: Option<&str>) -> Issue {
        Issue {
            key: key.to_string(),
            summary: format!("Summary of {key}"),
            status: "Open".to_string(),
            assignee: assignee.map(str::to_string),
        }
    }

    fn shape(groups: &[AssigneeGroup]) -> Vec<(&str, Vec<&str>)> {
        groups
            .iter()
            .map(|g| {
                (
                    g.assignee.as_str(),
                    g.issues.iter().map(|i| i.key.as_str()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_first_seen_order_with_unassigned_last() {
        let issues = vec![
            issue("X-1", None),
            issue("X-2", Some("Bob")),
            issue("X-3", Some("Alice")),
            issue("X-4", Some("")),
            issue("X-5", Some("Bob")),
        ];

        let groups = group_by_assignee(&issues);

        assert_eq!(
            shape(&groups),
            vec![
                ("Bob", vec!["X-2", "X-5"]),
                ("Alice", vec!["X-3"]),
                ("Unassigned", vec!["X-1", "X-4"]),
            ]
        );
    }

    #[test]
    fn test_case_sensitive_names() {
        let issues = vec![issue("X-1", Some("alice")), issue("X-2", Some("Alice"))];
        let groups = group_by_assignee(&issues);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].assignee, "alice");
        assert_eq!(groups[1].assignee, "Alice");
    }

    #[test]
    fn test_no_unassigned_group_when_everyone_owned() {
        let groups = group_by_assignee(&[issue("X-1", Some("Alice"))]);
        assert_eq!(shape(&groups), vec![("Alice", vec!["X-1"])]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_assignee(&[]).is_empty());
    }

    #[test]
    fn test_every_issue_in_exactly_one_group() {
        let names = [Some("Alice"), None, Some("Bob"), Some(""), Some("Carol")];
        let issues: Vec<Issue> = (0..40)
            .map(|n| issue(&format!("X-{n}"), names[(n * 7) % names.len()]))
            .collect();

        let groups = group_by_assignee(&issues);

        let grouped: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.issues.iter().map(|i| i.key.as_str()))
            .collect();
        let unique: HashSet<&str> = grouped.iter().copied().collect();
        assert_eq!(grouped.len(), issues.len());
        assert_eq!(unique.len(), issues.len());

        for group in &groups {
            assert!(group.issues.iter().all(|i| i.assignee() == group.assignee));
        }
        assert_eq!(groups.last().map(|g| g.assignee.as_str()), Some(UNASSIGNED));
    }
}
