//! Rule definition and matching
//!
//! A rule pairs a condition on the received bytes with a canned response.
//! The condition is a regular expression, a literal substring, or both; when
//! both are present the regex is tried first and the literal is the fallback.

use std::fmt;

use regex::bytes::Regex;

/// A compiled matcher plus the bytes sent back on a match
#[derive(Clone)]
pub struct Rule {
    name: Option<String>,
    pattern: Option<Regex>,
    literal: Option<Vec<u8>>,
    response: Vec<u8>,
}

impl Rule {
    /// Build a rule, compiling the regex if one is given
    ///
    /// Empty strings count as absent. A rule with neither a regex nor a
    /// literal is valid but never matches.
    pub fn new(
        name: Option<String>,
        pattern: Option<&str>,
        literal: Option<&str>,
        response: impl Into<Vec<u8>>,
    ) -> Result<Self, regex::Error> {
        let pattern = match pattern.filter(|p| !p.is_empty()) {
            Some(p) => Some(Regex::new(p)?),
            None => None,
        };

        Ok(Self {
            name: name.filter(|n| !n.is_empty()),
            pattern,
            literal: literal
                .filter(|l| !l.is_empty())
                .map(|l| l.as_bytes().to_vec()),
            response: response.into(),
        })
    }

    /// Rule matching a regular expression anywhere in the input
    pub fn regex(pattern: &str, response: impl Into<Vec<u8>>) -> Result<Self, regex::Error> {
        Self::new(None, Some(pattern), None, response)
    }

    /// Rule matching a literal substring, case-sensitively
    pub fn contains(literal: &str, response: impl Into<Vec<u8>>) -> Self {
        Self {
            name: None,
            pattern: None,
            literal: Some(literal.as_bytes().to_vec()).filter(|l| !l.is_empty()),
            response: response.into(),
        }
    }

    /// Attach a label used in log lines
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Test the rule against one chunk of received bytes
    pub fn matches(&self, input: &[u8]) -> bool {
        if let Some(pattern) = &self.pattern {
            if pattern.is_match(input) {
                return true;
            }
        }

        match &self.literal {
            Some(literal) => contains_bytes(input, literal),
            None => false,
        }
    }

    /// Label of the rule, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Label for log lines, falling back to the condition text
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (&self.pattern, &self.literal) {
            (Some(pattern), _) => format!("match {}", pattern.as_str()),
            (None, Some(literal)) => {
                format!("match-contains {}", String::from_utf8_lossy(literal))
            }
            (None, None) => "unnamed".to_string(),
        }
    }

    /// Bytes returned to the client on a match
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Whether the rule has any condition at all
    pub fn has_condition(&self) -> bool {
        self.pattern.is_some() || self.literal.is_some()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("match", &self.pattern.as_ref().map(Regex::as_str))
            .field(
                "match_contains",
                &self.literal.as_deref().map(String::from_utf8_lossy),
            )
            .field("response", &String::from_utf8_lossy(&self.response))
            .finish()
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
