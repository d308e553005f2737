// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::interpreter::error::RenderError;

use std::rc::Rc;

use anyhow::Result;
use indexmap::IndexSet;

/// One configuration statement together with the sections enclosing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    /// Statement text without indentation.
    pub text: Rc<str>,
    /// Source line with its indentation, as emitted by block queries.
    pub raw: Rc<str>,
    /// Enclosing section names, outermost first.
    pub parents: Vec<Rc<str>>,
}

impl ConfigLine {
    pub fn new(text: &str, parents: &[&str]) -> Self {
        let indent = " ".repeat(parents.len());
        Self {
            text: text.into(),
            raw: format!("{indent}{text}").into(),
            parents: parents.iter().map(|p| Rc::from(*p)).collect(),
        }
    }

    /// Whether this line is the entry at `path` or one of its descendants.
    pub fn is_within(&self, path: &[&str]) -> bool {
        if path.len() > self.parents.len() + 1 {
            return false;
        }
        path.iter()
            .zip(self.parents.iter().chain(core::iter::once(&self.text)))
            .all(|(want, have)| *want == have.as_ref())
    }
}

/// Hierarchical view of device configuration text.
#[derive(Debug, Clone, Default)]
pub struct ConfigModel {
    lines: Vec<ConfigLine>,
    sections: IndexSet<Rc<str>>,
}

impl ConfigModel {
    /// Parses indented configuration text. A line belongs to the nearest
    /// preceding line with less indentation. Blank lines and `!` comments are
    /// skipped.
    pub fn parse(text: &str) -> Self {
        let mut stack: Vec<(usize, Rc<str>)> = vec![];
        let mut lines = vec![];

        for raw in text.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('!') {
                continue;
            }

            let indent = raw.len() - raw.trim_start().len();
            while matches!(stack.last(), Some((level, _)) if *level >= indent) {
                stack.pop();
            }

            let text: Rc<str> = trimmed.into();
            lines.push(ConfigLine {
                text: text.clone(),
                raw: raw.trim_end().into(),
                parents: stack.iter().map(|(_, t)| t.clone()).collect(),
            });
            stack.push((indent, text));
        }

        Self::from_entries(lines)
    }

    /// Builds a model from entries parsed elsewhere.
    pub fn from_entries(lines: Vec<ConfigLine>) -> Self {
        let sections = lines
            .iter()
            .flat_map(|l| l.parents.iter().cloned())
            .collect();
        Self { lines, sections }
    }

    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    /// Every name that encloses at least one other line, in first-appearance
    /// order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.as_ref())
    }

    /// Full path of the first line whose text is `name`.
    pub fn section_path(&self, name: &str) -> Option<Vec<&str>> {
        self.lines.iter().find(|l| l.text.as_ref() == name).map(|l| {
            l.parents
                .iter()
                .map(|p| p.as_ref())
                .chain(core::iter::once(l.text.as_ref()))
                .collect()
        })
    }

    /// Source text of the line at `path` and everything nested beneath it.
    pub fn get_block(&self, path: &[&str]) -> Result<String> {
        let block: Vec<&str> = self
            .lines
            .iter()
            .filter(|l| l.is_within(path))
            .map(|l| l.raw.as_ref())
            .collect();

        if path.is_empty() || block.is_empty() {
            return Err(RenderError::SectionNotFound {
                path: path.join(" > "),
            }
            .into());
        }
        Ok(block.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
hostname leaf1
!
interface Ethernet1
   description uplink
   mtu 9214
interface Ethernet2
   shutdown
router bgp 65001
   neighbor 10.0.0.1 remote-as 65000
   address-family ipv4
      neighbor 10.0.0.1 activate
";

    #[test]
    fn sections_in_first_appearance_order() {
        let model = ConfigModel::parse(CONFIG);
        let sections: Vec<&str> = model.sections().collect();
        assert_eq!(
            sections,
            vec![
                "interface Ethernet1",
                "interface Ethernet2",
                "router bgp 65001",
                "address-family ipv4"
            ]
        );
    }

    #[test]
    fn block_includes_descendants() -> Result<()> {
        let model = ConfigModel::parse(CONFIG);
        assert_eq!(
            model.get_block(&["router bgp 65001"])?,
            "router bgp 65001\n   neighbor 10.0.0.1 remote-as 65000\n   address-family ipv4\n      neighbor 10.0.0.1 activate"
        );

        let path = model.section_path("address-family ipv4").unwrap();
        assert_eq!(path, vec!["router bgp 65001", "address-family ipv4"]);
        assert_eq!(
            model.get_block(&path)?,
            "   address-family ipv4\n      neighbor 10.0.0.1 activate"
        );
        Ok(())
    }

    #[test]
    fn unknown_path() {
        let model = ConfigModel::parse(CONFIG);
        let err = model.get_block(&["interface Ethernet9"]).unwrap_err();
        assert_eq!(
            RenderError::of(&err),
            Some(&RenderError::SectionNotFound {
                path: "interface Ethernet9".to_string()
            })
        );
    }

    #[test]
    fn entries_from_external_parser() -> Result<()> {
        let model = ConfigModel::from_entries(vec![
            ConfigLine::new("vlan 10", &[]),
            ConfigLine::new("name users", &["vlan 10"]),
        ]);
        assert_eq!(model.sections().collect::<Vec<_>>(), vec!["vlan 10"]);
        assert_eq!(model.get_block(&["vlan 10"])?, "vlan 10\n name users");
        Ok(())
    }
}
