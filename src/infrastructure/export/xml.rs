use crate::domain::{ClassNode, ClassPlacement, ClassTree, LevelSkills, SkillsSummary};
use crate::error::Result;
use crate::infrastructure::scrapers::text::safe_filename;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

type XmlWriter = Writer<Vec<u8>>;

fn writer() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

fn open(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
    writer.write_event(Event::Start(start))?;
    Ok(())
}

fn close(writer: &mut XmlWriter, tag: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn empty(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

fn write_summary(writer: &mut XmlWriter, summary: &SkillsSummary) -> Result<()> {
    open(writer, "skills_summary", &[])?;
    for (tab, categories) in [("active", &summary.active), ("passive", &summary.passive)] {
        open(writer, "skills", &[("type", tab)])?;
        for category in categories {
            open(writer, "category", &[("name", category.name.as_str())])?;
            for skill in &category.skills {
                empty(
                    writer,
                    "skill",
                    &[
                        ("id", skill.id.as_str()),
                        ("name", skill.name.as_str()),
                        ("level", skill.level.as_str()),
                        ("icon", skill.icon.as_str()),
                        ("icon_panel", skill.icon_panel.as_str()),
                        ("url", skill.url.as_str()),
                    ],
                )?;
            }
            close(writer, "category")?;
        }
        close(writer, "skills")?;
    }
    close(writer, "skills_summary")
}

fn write_levels(writer: &mut XmlWriter, levels: &[LevelSkills]) -> Result<()> {
    open(writer, "skills", &[])?;
    for level in levels {
        open(writer, "level", &[("number", level.number.as_str())])?;
        for skill in &level.skills {
            empty(
                writer,
                "skill",
                &[
                    ("id", skill.id.as_str()),
                    ("name", skill.name.as_str()),
                    ("level", skill.level.as_str()),
                    ("icon_name", skill.icon_name.as_str()),
                    ("url", skill.url.as_str()),
                    ("icon", skill.icon.as_str()),
                    ("note", skill.note.as_str()),
                ],
            )?;
        }
        close(writer, "level")?;
    }
    close(writer, "skills")
}

/// Skills of a class, summary first.
fn write_class_skills(writer: &mut XmlWriter, class: &ClassNode) -> Result<()> {
    if let Some(summary) = &class.skills_summary {
        write_summary(writer, summary)?;
    }
    if let Some(levels) = &class.skills {
        write_levels(writer, levels)?;
    }
    Ok(())
}

fn write_class(writer: &mut XmlWriter, class: &ClassNode, last_child: bool) -> Result<()> {
    let mut attrs = vec![("name", class.name.as_str()), ("link", class.link.as_str())];
    if last_child {
        attrs.push(("last_child", "true"));
    }

    let has_body =
        class.skills_summary.is_some() || class.skills.is_some() || !class.children.is_empty();
    if !has_body {
        return empty(writer, "class", &attrs);
    }

    open(writer, "class", &attrs)?;
    write_class_skills(writer, class)?;
    let last = class.children.len().saturating_sub(1);
    for (i, child) in class.children.iter().enumerate() {
        write_class(writer, child, i == last)?;
    }
    close(writer, "class")
}

/// `<classes>` document with races, subtypes and nested classes.
pub fn class_tree_xml(tree: &ClassTree) -> Result<Vec<u8>> {
    let mut writer = writer()?;
    open(&mut writer, "classes", &[])?;
    for race in &tree.races {
        open(
            &mut writer,
            "race",
            &[("name", race.name.as_str()), ("icon", race.icon.as_str())],
        )?;
        for subtype in &race.subtypes {
            open(
                &mut writer,
                "subtype",
                &[("name", subtype.name.as_str()), ("link", subtype.link.as_str())],
            )?;
            for class in &subtype.classes {
                write_class(&mut writer, class, false)?;
            }
            close(&mut writer, "subtype")?;
        }
        close(&mut writer, "race")?;
    }
    close(&mut writer, "classes")?;
    Ok(writer.into_inner())
}

/// Standalone document for one class with its place in the hierarchy.
pub fn class_xml(placement: &ClassPlacement<'_>) -> Result<Vec<u8>> {
    let class = placement.class;
    let parent_of = class
        .children
        .first()
        .map_or("none", |child| child.name.as_str());

    let mut writer = writer()?;
    open(
        &mut writer,
        "class",
        &[
            ("race", placement.race),
            ("subtype", placement.subtype),
            ("name", class.name.as_str()),
            ("child_of", placement.parent.unwrap_or("none")),
            ("parent_of", parent_of),
        ],
    )?;
    write_class_skills(&mut writer, class)?;
    close(&mut writer, "class")?;
    Ok(writer.into_inner())
}

pub fn write_xml(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Writes one file per class into `dir`, returning the written paths.
pub fn split_classes(tree: &ClassTree, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for placement in tree.placements() {
        let path = dir.join(format!("{}.xml", safe_filename(&placement.class.name)));
        write_xml(&path, &class_xml(&placement)?)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassLevelSkill, Race, SkillCategory, Subtype, SummarySkill};
    use tempfile::TempDir;

    fn class(name: &str, children: Vec<ClassNode>) -> ClassNode {
        ClassNode {
            name: name.to_string(),
            link: format!("https://wiki.mw2.wiki/class/{}", name.to_lowercase()),
            is_final: children.is_empty(),
            skills_summary: None,
            skills: None,
            children,
        }
    }

    fn tree() -> ClassTree {
        let mut warrior = class(
            "Warrior",
            vec![class("Gladiator", vec![]), class("Warlord", vec![])],
        );
        warrior.skills_summary = Some(SkillsSummary {
            active: vec![SkillCategory {
                name: "Physical & Magic".into(),
                skills: vec![SummarySkill {
                    id: "3".into(),
                    name: "Power Strike".into(),
                    level: "1".into(),
                    icon: "skill0003".into(),
                    icon_panel: String::new(),
                    url: "https://wiki.mw2.wiki/skill/3-power-strike".into(),
                    description: "Strikes hard.".into(),
                }],
            }],
            passive: Vec::new(),
        });
        warrior.skills = Some(vec![LevelSkills {
            number: "20".into(),
            skills: vec![ClassLevelSkill {
                id: "3".into(),
                name: "Power Strike".into(),
                level: "2".into(),
                icon_name: "skill0003".into(),
                url: String::new(),
                icon: String::new(),
                note: "SP 500".into(),
            }],
        }]);

        ClassTree {
            races: vec![Race {
                name: "Human".into(),
                icon: "https://wiki.mw2.wiki/img/human.png".into(),
                subtypes: vec![Subtype {
                    name: "Fighter".into(),
                    link: "https://wiki.mw2.wiki/race/human-fighter".into(),
                    classes: vec![warrior],
                }],
            }],
        }
    }

    #[test]
    fn tree_document_nests_classes() {
        let xml = String::from_utf8(class_tree_xml(&tree()).unwrap()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains(r#"<race name="Human" icon="https://wiki.mw2.wiki/img/human.png">"#));
        assert!(xml.contains(r#"<skills type="active">"#));
        assert!(xml.contains(r#"<category name="Physical &amp; Magic">"#));
        assert!(xml.contains(r#"<level number="20">"#));
        assert!(xml.contains(r#"note="SP 500""#));
        assert!(xml.contains(
            r#"<class name="Warlord" link="https://wiki.mw2.wiki/class/warlord" last_child="true"/>"#
        ));

        let summary = xml.find("<skills_summary>").unwrap();
        let levels = xml.find("<level ").unwrap();
        let child = xml.find(r#"name="Gladiator""#).unwrap();
        assert!(summary < levels && levels < child);
    }

    #[test]
    fn split_writes_one_file_per_class() {
        let dir = TempDir::new().unwrap();
        let written = split_classes(&tree(), dir.path()).unwrap();
        assert_eq!(written.len(), 3);

        let warrior = fs::read_to_string(dir.path().join("Warrior.xml")).unwrap();
        assert!(warrior.contains(
            r#"<class race="Human" subtype="Fighter" name="Warrior" child_of="none" parent_of="Gladiator">"#
        ));
        assert!(warrior.contains("<skills_summary>"));

        let gladiator = fs::read_to_string(dir.path().join("Gladiator.xml")).unwrap();
        assert!(gladiator.contains(r#"child_of="Warrior" parent_of="none""#));
    }
}
