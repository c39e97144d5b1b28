//! Digest rendering.
//!
//! Layout of a rendered message:
//!
//! ```text
//! section   *<rule label>*: N issues need attention
//! section   (plain) Showing R of T matching issues...        only for partial results
//! divider
//! section   *Alice*
//!           • <https://jira/issues/X-1|X-1> — Fix login (Open)
//! divider
//! section   *Unassigned*
//!           • <https://jira/issues/X-2|X-2> — Flaky test (To Do)
//! section   _<config link>_                                  only when configured
//! ```
//!
//! A group whose lines do not fit into one section continues in further
//! sections without a divider; only the first carries the assignee line.
//!
//! A message never exceeds [`MAX_BLOCKS`]. When the groups do not fit, the
//! named groups that come after the budget runs out are folded into one
//! `_…and N more assignees (M issues)_` section placed before the
//! Unassigned group, which stays last.

use nudge_common::types::{Rule, SearchResult, UNASSIGNED};
use nudge_notifier::message::{MAX_BLOCKS, MAX_SECTION_TEXT_LEN, escape_mrkdwn};
use nudge_notifier::{Message, Text};

use crate::grouping::AssigneeGroup;

/// Builds chat messages from grouped search results.
#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    /// Where the rule set lives, linked from the message footer
    config_url: Option<String>,
}

impl MessageRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_url(mut self, config_url: Option<String>) -> Self {
        self.config_url = config_url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Render one rule's digest. `issue_url` maps an issue key to its link.
    pub fn render<F>(
        &self,
        rule: &Rule,
        result: &SearchResult,
        groups: &[AssigneeGroup],
        issue_url: F,
    ) -> Message
    where
        F: Fn(&str) -> String,
    {
        let mut message = Message::new().section(Text::markdown(Self::header(rule, result)));

        if result.is_partial() {
            message = message.section(Text::plain(format!(
                "Showing {} of {} matching issues. Narrow the query to see the rest.",
                result.returned_count(),
                result.total
            )));
        }

        let reserved = message.blocks.len() + usize::from(self.config_url.is_some());
        let rendered: Vec<(&AssigneeGroup, Vec<String>)> = groups
            .iter()
            .map(|group| (group, Self::group_sections(group, &issue_url)))
            .collect();
        for chunks in Self::fit(rendered, MAX_BLOCKS.saturating_sub(reserved)) {
            message = message.divider();
            for chunk in chunks {
                message = message.section(Text::markdown(chunk));
            }
        }

        if let Some(url) = &self.config_url {
            message = message.section(Text::markdown(format!(
                "_Sent by jira-slack-nudge · <{url}|edit these notifications>_"
            )));
        }

        message
    }

    /// Pick the group sections that fit into `budget` blocks.
    ///
    /// Each group costs one divider plus its sections. On overflow, named
    /// groups are kept in order until the budget runs out and the rest are
    /// summarized in one section; the Unassigned group keeps its place at
    /// the end whenever it fits on its own.
    fn fit(rendered: Vec<(&AssigneeGroup, Vec<String>)>, budget: usize) -> Vec<Vec<String>> {
        let cost = |chunks: &Vec<String>| 1 + chunks.len();
        if rendered.iter().map(|(_, chunks)| cost(chunks)).sum::<usize>() <= budget {
            return rendered.into_iter().map(|(_, chunks)| chunks).collect();
        }

        // Divider plus the summary section
        let mut budget = budget.saturating_sub(2);
        let mut named = rendered;
        let mut unassigned = match named.last() {
            Some((group, _)) if group.assignee == UNASSIGNED => named.pop(),
            _ => None,
        };

        let mut hidden_groups = 0;
        let mut hidden_issues = 0;
        let unassigned_cost = unassigned.as_ref().map_or(0, |(_, chunks)| cost(chunks));
        if unassigned_cost <= budget {
            budget -= unassigned_cost;
        } else if let Some((group, _)) = unassigned.take() {
            hidden_groups += 1;
            hidden_issues += group.issues.len();
        }

        let mut kept = Vec::new();
        let mut overflowed = false;
        for (group, chunks) in named {
            overflowed = overflowed || cost(&chunks) > budget;
            if overflowed {
                hidden_groups += 1;
                hidden_issues += group.issues.len();
            } else {
                budget -= cost(&chunks);
                kept.push(chunks);
            }
        }

        kept.push(vec![format!(
            "_…and {} more {} ({} {})_",
            hidden_groups,
            if hidden_groups == 1 { "assignee" } else { "assignees" },
            hidden_issues,
            if hidden_issues == 1 { "issue" } else { "issues" }
        )]);
        kept.extend(unassigned.map(|(_, chunks)| chunks));
        kept
    }

    fn header(rule: &Rule, result: &SearchResult) -> String {
        let count = result.total;
        let noun = if count == 1 { "issue needs" } else { "issues need" };
        format!("*{}*: {} {} attention", escape_mrkdwn(rule.label()), count, noun)
    }

    /// Lines of one group, split into section-sized chunks.
    fn group_sections<F>(group: &AssigneeGroup, issue_url: &F) -> Vec<String>
    where
        F: Fn(&str) -> String,
    {
        let mut lines = Vec::with_capacity(group.issues.len() + 1);
        lines.push(format!("*{}*", escape_mrkdwn(&group.assignee)));
        for issue in &group.issues {
            lines.push(format!(
                "• <{}|{}> — {} ({})",
                issue_url(&issue.key),
                issue.key,
                escape_mrkdwn(&issue.summary),
                escape_mrkdwn(&issue.status)
            ));
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        for line in lines {
            let line = clamp_line(line);
            if !current.is_empty() && current.len() + 1 + line.len() > MAX_SECTION_TEXT_LEN {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&line);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Cut a single line down to the section limit.
fn clamp_line(line: String) -> String {
    const ELLIPSIS: &str = "…";
    if line.len() <= MAX_SECTION_TEXT_LEN {
        return line;
    }
    let mut end = MAX_SECTION_TEXT_LEN - ELLIPSIS.len();
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &line[..end], ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use nudge_common::types::Issue;
    use nudge_notifier::{Block, TextFormat};

    use super::*;
    use crate::grouping::group_by_assignee;

    fn issue(key: &str, summary: &str, assignee: Option<&str>) -> Issue {
        Issue {
            key: key.to_string(),
            summary: summary.to_string(),
            status: "Open".to_string(),
            assignee: assignee.map(str::to_string),
        }
    }

    fn url(key: &str) -> String {
        format!("https://jira.example.com/issues/{key}")
    }

    fn render(rule: &Rule, issues: Vec<Issue>, total: u64) -> Message {
        let result = SearchResult::new(issues, total);
        let groups = group_by_assignee(&result.issues);
        MessageRenderer::new().render(rule, &result, &groups, url)
    }

    #[test]
    fn test_layout() {
        let rule = Rule::new("project = X AND status = Open").with_name("Open in X");
        let msg = render(
            &rule,
            vec![
                issue("X-1", "Fix login", Some("Alice")),
                issue("X-2", "Flaky test", None),
            ],
            2,
        );

        assert_eq!(
            msg.blocks,
            vec![
                Block::Section {
                    text: Text::markdown("*Open in X*: 2 issues need attention")
                },
                Block::Divider,
                Block::Section {
                    text: Text::markdown(
                        "*Alice*\n• <https://jira.example.com/issues/X-1|X-1> — Fix login (Open)"
                    )
                },
                Block::Divider,
                Block::Section {
                    text: Text::markdown(
                        "*Unassigned*\n• <https://jira.example.com/issues/X-2|X-2> — Flaky test (Open)"
                    )
                },
            ]
        );
    }

    #[test]
    fn test_singular_header_uses_query_label() {
        let rule = Rule::new("project = X");
        let msg = render(&rule, vec![issue("X-1", "a", None)], 1);
        let header = msg.section_texts().next().unwrap();
        assert_eq!(header.text, "*project = X*: 1 issue needs attention");
    }

    #[test]
    fn test_partial_result_note() {
        let rule = Rule::new("project = X");
        let msg = render(&rule, vec![issue("X-1", "a", None)], 120);
        let texts: Vec<&Text> = msg.section_texts().collect();
        assert_eq!(texts[0].text, "*project = X*: 120 issues need attention");
        assert_eq!(texts[1].format, TextFormat::Plain);
        assert!(texts[1].text.starts_with("Showing 1 of 120"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let rule = Rule::new("q");
        let msg = render(&rule, vec![issue("X-1", "<script> & co", Some("A <B>"))], 1);
        let group = msg.section_texts().nth(1).unwrap();
        assert!(group.text.starts_with("*A &lt;B&gt;*\n"));
        assert!(group.text.contains("— &lt;script&gt; &amp; co (Open)"));
    }

    #[test]
    fn test_footer_link() {
        let rule = Rule::new("q");
        let result = SearchResult::new(vec![issue("X-1", "a", None)], 1);
        let groups = group_by_assignee(&result.issues);
        let msg = MessageRenderer::new()
            .with_config_url(Some("https://git.example.com/nudge.yaml".to_string()))
            .render(&rule, &result, &groups, url);
        let footer = msg.section_texts().last().unwrap();
        assert_eq!(
            footer.text,
            "_Sent by jira-slack-nudge · <https://git.example.com/nudge.yaml|edit these notifications>_"
        );
    }

    #[test]
    fn test_large_group_is_split_into_sections() {
        let rule = Rule::new("q");
        let long_summary = "x".repeat(200);
        let issues: Vec<Issue> = (0..40)
            .map(|n| issue(&format!("X-{n}"), &long_summary, Some("Alice")))
            .collect();
        let msg = render(&rule, issues, 40);

        let group_sections: Vec<&Text> = msg.section_texts().skip(1).collect();
        assert!(group_sections.len() > 1);
        assert!(group_sections.iter().all(|t| t.text.len() <= MAX_SECTION_TEXT_LEN));
        assert!(group_sections[0].text.starts_with("*Alice*\n"));
        assert!(group_sections[1].text.starts_with("• <"));
        // One divider for the single group; continuations are not separated
        let dividers = msg.blocks.iter().filter(|b| **b == Block::Divider).count();
        assert_eq!(dividers, 1);
        let bullets: usize = group_sections
            .iter()
            .map(|t| t.text.lines().filter(|l| l.starts_with("• ")).count())
            .sum();
        assert_eq!(bullets, 40);
    }

    #[test]
    fn test_many_assignees_stay_within_block_limit() {
        let rule = Rule::new("q");
        let mut issues: Vec<Issue> = (0..30)
            .map(|n| issue(&format!("X-{n}"), "a", Some(format!("User {n}").as_str())))
            .collect();
        issues.push(issue("X-30", "b", None));
        issues.push(issue("X-31", "c", Some("User 29")));
        let result = SearchResult::new(issues, 32);
        let groups = group_by_assignee(&result.issues);
        let msg = MessageRenderer::new()
            .with_config_url(Some("https://git.example.com/nudge.yaml".to_string()))
            .render(&rule, &result, &groups, url);

        assert_eq!(msg.blocks.len(), MAX_BLOCKS);
        let texts: Vec<&Text> = msg.section_texts().collect();
        // header, 22 named groups, summary, Unassigned, footer
        assert!(texts[22].text.starts_with("*User 21*\n"));
        assert_eq!(texts[23].text, "_…and 8 more assignees (9 issues)_");
        assert!(texts[24].text.starts_with("*Unassigned*\n"));
        assert!(texts[25].text.starts_with("_Sent by"));

        let shown: usize = texts
            .iter()
            .map(|t| t.text.lines().filter(|l| l.starts_with("• ")).count())
            .sum();
        assert_eq!(shown, 32 - 9);
    }

    #[test]
    fn test_groups_that_fit_are_not_summarized() {
        let rule = Rule::new("q");
        let issues: Vec<Issue> = (0..24)
            .map(|n| issue(&format!("X-{n}"), "a", Some(format!("User {n}").as_str())))
            .collect();
        let msg = render(&rule, issues, 24);

        // header plus 24 divider/section pairs is 49 blocks
        assert_eq!(msg.blocks.len(), 49);
        assert!(!msg.section_texts().any(|t| t.text.contains("more assignee")));
    }

    #[test]
    fn test_overlong_line_is_clamped() {
        let line = "é".repeat(MAX_SECTION_TEXT_LEN);
        let clamped = clamp_line(line);
        assert!(clamped.len() <= MAX_SECTION_TEXT_LEN);
        assert!(clamped.ends_with('…'));
    }
}
