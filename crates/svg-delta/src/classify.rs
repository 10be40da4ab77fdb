//! Id classification: volatile ids, major regions, owner groups, legends and text groups.

use crate::config::DeltaConfig;
use crate::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Classifier {
    volatile: Vec<Regex>,
    region: Option<Regex>,
    legend: Option<Regex>,
    owner: Option<Regex>,
    text_group: Option<Regex>,
    skip_auto_id_tags: BTreeSet<String>,
    auto_id_prefix: String,
    ignored_attributes: BTreeSet<String>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// `^(k1|k2)_\d+$`, with the kind captured. `None` when no kinds are configured.
fn kind_pattern(kinds: &[String]) -> Result<Option<Regex>> {
    if kinds.is_empty() {
        return Ok(None);
    }
    let alternatives = kinds
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    compile(&format!(r"^({alternatives})_\d+$")).map(Some)
}

fn re_id_reference() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"^\s*(?:url\(\s*#([^)\s]+)\s*\)|#(\S+))\s*$").unwrap())
}

impl Classifier {
    pub fn new(config: &DeltaConfig) -> Result<Self> {
        let volatile = config
            .volatile_id_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            volatile,
            region: kind_pattern(&config.region_kinds)?,
            legend: kind_pattern(&config.legend_kinds)?,
            owner: kind_pattern(&config.owner_kinds)?,
            text_group: kind_pattern(&config.text_group_kinds)?,
            skip_auto_id_tags: config.skip_auto_id_tags.iter().cloned().collect(),
            auto_id_prefix: config.auto_id_prefix.clone(),
            ignored_attributes: config.ignored_attributes.iter().cloned().collect(),
        })
    }

    pub fn is_volatile(&self, id: &str) -> bool {
        self.volatile.iter().any(|re| re.is_match(id))
    }

    pub fn is_region(&self, id: &str) -> bool {
        self.region.as_ref().is_some_and(|re| re.is_match(id))
    }

    pub fn is_legend(&self, id: &str) -> bool {
        self.legend.as_ref().is_some_and(|re| re.is_match(id))
    }

    pub fn is_text_group(&self, id: &str) -> bool {
        self.text_group.as_ref().is_some_and(|re| re.is_match(id))
    }

    /// Artist kind of an owner group id (`line2d_3` -> `line2d`).
    pub fn owner_kind<'a>(&self, id: &'a str) -> Option<&'a str> {
        let caps = self.owner.as_ref()?.captures(id)?;
        caps.get(1).map(|m| m.as_str())
    }

    pub fn skips_auto_id(&self, tag: &str) -> bool {
        self.skip_auto_id_tags.contains(tag)
    }

    pub fn auto_id_prefix(&self) -> &str {
        &self.auto_id_prefix
    }

    pub fn is_ignored_attribute(&self, clark_key: &str) -> bool {
        self.ignored_attributes.contains(clark_key)
    }

    /// True when `value` is `#id` or `url(#id)` pointing at a volatile id.
    pub fn references_volatile(&self, value: &str) -> bool {
        let Some(caps) = re_id_reference().captures(value) else {
            return false;
        };
        caps.get(1)
            .or_else(|| caps.get(2))
            .is_some_and(|m| self.is_volatile(m.as_str()))
    }
}
