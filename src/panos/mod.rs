//! PAN-OS XML API wire format
//!
//! This module never opens a connection. It knows how to spell requests
//! ([`encode`]), how to read responses ([`decode`]) and how to follow a
//! commit job ([`commit`]); transport is the caller's business.

pub mod commit;
pub mod decode;
pub mod encode;

use crate::core::rule::{FirewallRule, Position};
use encode::{ApiRequest, rule_element, rule_xpath};

/// One API call of a deployment, with a human-readable title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub title: &'static str,
    pub request: ApiRequest,
}

/// Ordered calls that deploy one rule and commit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub rule_name: String,
    pub xpath: String,
    pub steps: Vec<PlanStep>,
}

impl DeploymentPlan {
    /// Builds the call sequence for `rule` in `vsys`: connection test,
    /// existing-rule lookup, rule creation, an optional move to the top of
    /// the rulebase, and the commit.
    pub fn new(rule: &FirewallRule, vsys: &str, commit_description: &str) -> Self {
        let xpath = rule_xpath(vsys, &rule.rule_name);

        let mut steps = vec![
            PlanStep {
                title: "Connection test",
                request: ApiRequest::system_info(),
            },
            PlanStep {
                title: "Check existing rule",
                request: ApiRequest::config_get(xpath.clone()),
            },
            PlanStep {
                title: "Create security rule",
                request: ApiRequest::config_set(xpath.clone(), rule_element(rule)),
            },
        ];

        if rule.position() == Position::Top {
            steps.push(PlanStep {
                title: "Move rule to top",
                request: ApiRequest::move_rule(xpath.clone(), Position::Top),
            });
        }

        steps.push(PlanStep {
            title: "Commit configuration",
            request: ApiRequest::commit(Some(commit_description)),
        });

        Self {
            rule_name: rule.rule_name.clone(),
            xpath,
            steps,
        }
    }

    /// Attaches the API key to every step.
    pub fn with_key(mut self, key: &str) -> Self {
        for step in &mut self.steps {
            step.request = step.request.clone().with_key(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{rule, sample_allow_rule};
    use encode::RequestType;

    #[test]
    fn test_plan_bottom_rule() {
        let plan = DeploymentPlan::new(&rule(&sample_allow_rule()), "vsys1", "GitOps deployment");

        let titles: Vec<&str> = plan.steps.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Connection test",
                "Check existing rule",
                "Create security rule",
                "Commit configuration"
            ]
        );
        assert_eq!(plan.steps[2].request.get("xpath"), Some(plan.xpath.as_str()));
        assert!(plan.xpath.ends_with("entry[@name='Test-Allow-Rule']"));
        assert_eq!(plan.steps[3].request.request_type(), RequestType::Commit);
    }

    #[test]
    fn test_plan_top_rule_moves() {
        let mut document = sample_allow_rule();
        document["position"] = serde_json::json!("top");
        let plan = DeploymentPlan::new(&rule(&document), "vsys2", "deploy");

        assert_eq!(plan.steps.len(), 5);
        assert_eq!(plan.steps[3].request.get("where"), Some("top"));
        assert!(plan.xpath.contains("entry[@name='vsys2']"));
    }

    #[test]
    fn test_plan_with_key() {
        let plan = DeploymentPlan::new(&rule(&sample_allow_rule()), "vsys1", "deploy").with_key("k");
        assert!(plan.steps.iter().all(|s| s.request.get("key") == Some("k")));
    }
}
