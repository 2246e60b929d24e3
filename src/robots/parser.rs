//! Robots.txt policy evaluation
//!
//! Permission checks are delegated to the robotstxt crate; `Crawl-delay`
//! is read directly since that crate does not expose it.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// The robots.txt rules of one site, bound to our user agent
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    agent: String,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str, agent: &str) -> Self {
        Self {
            content: content.to_string(),
            agent: agent.to_string(),
        }
    }

    /// Creates a permissive policy that allows everything
    pub fn allow_all(agent: &str) -> Self {
        Self::from_content("", agent)
    }

    /// Checks whether `url` may be fetched
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL of the page
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }

    /// Returns the `Crawl-delay` that applies to our agent, if any
    ///
    /// A group naming our agent takes precedence over the `*` group.
    pub fn crawl_delay(&self) -> Option<Duration> {
        let agent = self.agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent = None;
        let mut for_wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // a user-agent line after rules starts a new group
                if in_rules {
                    group.clear();
                    in_rules = false;
                }
                group.push(value.to_lowercase());
                continue;
            }

            in_rules = true;
            if key != "crawl-delay" {
                continue;
            }

            let Ok(seconds) = value.parse::<f64>() else {
                continue;
            };
            if !seconds.is_finite() || seconds < 0.0 {
                continue;
            }

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                for_agent = Some(seconds);
            } else if group.iter().any(|ua| ua == "*") {
                for_wildcard = Some(seconds);
            }
        }

        for_agent.or(for_wildcard).map(Duration::from_secs_f64)
    }
}
