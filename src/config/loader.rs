//! Rules file loading
//!
//! Turns a rules document into a [`RuleSet`]. Every regex is compiled before
//! anything is returned, so a single bad rule rejects the whole document and
//! callers never see a partial list. No locking happens here.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use super::error::{ConfigError, Result};
use super::types::{RuleTemplate, RulesDocument};
use crate::rules::{Rule, RuleSet};

/// Load and compile the rules file at `path`
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let rules = load_rules_from_str(&content)?;

    debug!("Loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// Parse and compile a rules document held in memory
pub fn load_rules_from_str(content: &str) -> Result<RuleSet> {
    if content.trim().is_empty() {
        return Ok(RuleSet::new());
    }

    // String fields receive the scalar text as written (`007` stays `007`)
    let document: RulesDocument = serde_yaml::from_str(content)?;

    compile(document.rules)
}

fn compile(templates: Vec<RuleTemplate>) -> Result<RuleSet> {
    templates
        .into_iter()
        .enumerate()
        .map(|(index, template)| {
            let rule = Rule::new(
                template.name.clone(),
                template.pattern.as_deref(),
                template.contains.as_deref(),
                template.response,
            )
            .map_err(|source| ConfigError::RuleCompile {
                index,
                name: template.name,
                source,
            })?;

            if !rule.has_condition() {
                warn!(
                    "Rule #{} ({}) has no match condition and never applies",
                    index,
                    rule.display_name()
                );
            }
            Ok(rule)
        })
        .collect()
}
