use serde::{Deserialize, Serialize};

/// One subtype row of the races page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceListEntry {
    pub race_name: String,
    pub race_icon: String,
    pub race_background: String,
    pub subtype_name: String,
    pub subtype_background: String,
    pub subtype_link: String,
    pub chronicle: String,
    pub server_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDetails {
    pub race_name: String,
    pub subtype_name: String,
    pub class_name: String,
    pub race_icon: String,
    pub class_image: String,
    pub description: String,
    pub role: String,
    pub weapon: String,
    pub armor: String,
    #[serde(rename = "STR")]
    pub str_: Option<u32>,
    #[serde(rename = "DEX")]
    pub dex: Option<u32>,
    #[serde(rename = "CON")]
    pub con: Option<u32>,
    #[serde(rename = "INT")]
    pub int: Option<u32>,
    #[serde(rename = "WIT")]
    pub wit: Option<u32>,
    #[serde(rename = "MEN")]
    pub men: Option<u32>,
    pub class_data: serde_json::Value,
    pub chronicle: String,
    pub server_id: u32,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassTree {
    pub races: Vec<Race>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    pub icon: String,
    pub subtypes: Vec<Subtype>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtype {
    pub name: String,
    pub link: String,
    pub classes: Vec<ClassNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub link: String,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_summary: Option<SkillsSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<LevelSkills>>,
    #[serde(default)]
    pub children: Vec<ClassNode>,
}

/// Skills of a class grouped by tab (`active`, `passive`) and category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsSummary {
    pub active: Vec<SkillCategory>,
    pub passive: Vec<SkillCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub name: String,
    pub skills: Vec<SummarySkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySkill {
    pub id: String,
    pub name: String,
    pub level: String,
    pub icon: String,
    pub icon_panel: String,
    pub url: String,
    pub description: String,
}

/// Skills learned at one character level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSkills {
    pub number: String,
    pub skills: Vec<ClassLevelSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLevelSkill {
    pub id: String,
    pub name: String,
    pub level: String,
    pub icon_name: String,
    pub url: String,
    pub icon: String,
    pub note: String,
}

/// A class together with where it sits in the tree.
#[derive(Debug, Clone, Copy)]
pub struct ClassPlacement<'a> {
    pub race: &'a str,
    pub subtype: &'a str,
    pub parent: Option<&'a str>,
    pub class: &'a ClassNode,
}

impl ClassTree {
    pub fn truncate(&mut self, races: usize) {
        self.races.truncate(races);
    }

    /// Every class in document order, parents before their children.
    pub fn placements(&self) -> Vec<ClassPlacement<'_>> {
        fn walk<'a>(
            race: &'a str,
            subtype: &'a str,
            parent: Option<&'a str>,
            nodes: &'a [ClassNode],
            out: &mut Vec<ClassPlacement<'a>>,
        ) {
            for node in nodes {
                out.push(ClassPlacement {
                    race,
                    subtype,
                    parent,
                    class: node,
                });
                walk(race, subtype, Some(&node.name), &node.children, out);
            }
        }

        let mut out = Vec::new();
        for race in &self.races {
            for subtype in &race.subtypes {
                walk(&race.name, &subtype.name, None, &subtype.classes, &mut out);
            }
        }
        out
    }

    pub fn class_count(&self) -> usize {
        self.placements().len()
    }

    pub fn for_each_class_mut(&mut self, mut f: impl FnMut(&mut ClassNode)) {
        fn walk(nodes: &mut [ClassNode], f: &mut impl FnMut(&mut ClassNode)) {
            for node in nodes {
                f(node);
                walk(&mut node.children, f);
            }
        }

        for race in &mut self.races {
            for subtype in &mut race.subtypes {
                walk(&mut subtype.classes, &mut f);
            }
        }
    }

    /// Drops every class (and its subtree) whose link matches.
    pub fn remove_class(&mut self, link: &str) -> bool {
        fn prune(nodes: &mut Vec<ClassNode>, link: &str) -> bool {
            let before = nodes.len();
            nodes.retain(|n| n.link != link);
            let mut removed = nodes.len() != before;
            for node in nodes.iter_mut() {
                removed |= prune(&mut node.children, link);
            }
            removed
        }

        let mut removed = false;
        for race in &mut self.races {
            for subtype in &mut race.subtypes {
                removed |= prune(&mut subtype.classes, link);
            }
        }
        removed
    }
}
