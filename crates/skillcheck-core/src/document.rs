use pulldown_cmark::{Event, Options, Parser as MdParser, Tag, TagEnd};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

/// Typed metadata header of a skill document.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hint describing when the skill should be invoked.
    #[serde(default)]
    pub trigger: Option<String>,
    /// Whether a host tool may invoke the skill without being asked.
    #[serde(default)]
    pub auto: bool,
}

/// Split `---` delimited YAML frontmatter from the markdown body.
/// Returns None when the document carries no frontmatter.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    let end = rest.find("\n---")?;
    let frontmatter = &rest[..end];
    let mut body = &rest[end + 4..];
    if let Some(stripped) = body.strip_prefix('\r') {
        body = stripped;
    }
    if let Some(stripped) = body.strip_prefix('\n') {
        body = stripped;
    }
    Some((frontmatter, body))
}

// ---------------------------------------------------------------------------
// Section tree
// ---------------------------------------------------------------------------

/// A bullet item with its inline code spans kept to the side, so callers
/// can read `Target: \`src/**\`` style fields without re-parsing markdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub text: String,
    pub codes: Vec<String>,
}

impl Item {
    /// If this item is a `Key: value` field, return the value text with the
    /// item's code spans. Key comparison is case-insensitive.
    pub fn field(&self, key: &str) -> Option<(String, &[String])> {
        let trimmed = self.text.trim();
        let (head, rest) = trimmed.split_once(':')?;
        if head.trim().eq_ignore_ascii_case(key) {
            Some((rest.trim().to_string(), &self.codes))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// An H2 section with its bullet items, tables, and H3 subsections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub title: String,
    pub items: Vec<Item>,
    pub tables: Vec<Table>,
    pub subsections: Vec<Section>,
}

impl Section {
    fn new(title: String) -> Self {
        Self {
            title,
            ..Default::default()
        }
    }
}

/// Find a section by title, case-insensitive.
pub fn find_section<'a>(sections: &'a [Section], title: &str) -> Option<&'a Section> {
    sections
        .iter()
        .find(|s| s.title.trim().eq_ignore_ascii_case(title))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Walk the markdown body into an H2 section tree. H1 headings are treated
/// as the document title and skipped; headings deeper than H3 fold into the
/// enclosing subsection's items.
pub fn parse_sections(body: &str) -> Vec<Section> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = MdParser::new_ext(body, options);

    let mut sections: Vec<Section> = Vec::new();
    let mut heading_level: Option<u8> = None;
    let mut heading_text = String::new();
    let mut current_item: Option<Item> = None;
    let mut current_table: Option<Table> = None;
    let mut current_row: Option<Vec<String>> = None;
    let mut current_cell = String::new();
    let mut in_head = false;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading_level = Some(level as u8);
                heading_text.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                let level = heading_level.take().unwrap_or(6);
                let title = heading_text.trim().to_string();
                match level {
                    1 => {}
                    2 => sections.push(Section::new(title)),
                    _ => {
                        if let Some(section) = sections.last_mut() {
                            section.subsections.push(Section::new(title));
                        }
                    }
                }
            }
            Event::Start(Tag::Item) => {
                current_item = Some(Item::default());
            }
            Event::End(TagEnd::Item) => {
                if let Some(item) = current_item.take() {
                    if let Some(section) = sections.last_mut() {
                        let slot = section
                            .subsections
                            .last_mut()
                            .map(|sub| &mut sub.items)
                            .unwrap_or(&mut section.items);
                        slot.push(item);
                    }
                }
            }
            Event::Start(Tag::Table(_)) => {
                current_table = Some(Table::default());
            }
            Event::End(TagEnd::Table) => {
                if let Some(table) = current_table.take() {
                    if let Some(section) = sections.last_mut() {
                        let slot = section
                            .subsections
                            .last_mut()
                            .map(|sub| &mut sub.tables)
                            .unwrap_or(&mut section.tables);
                        slot.push(table);
                    }
                }
            }
            Event::Start(Tag::TableHead) => {
                in_head = true;
                current_row = Some(Vec::new());
            }
            Event::End(TagEnd::TableHead) => {
                if let (Some(table), Some(row)) = (current_table.as_mut(), current_row.take()) {
                    table.headers = row;
                }
                in_head = false;
            }
            Event::Start(Tag::TableRow) => {
                current_row = Some(Vec::new());
            }
            Event::End(TagEnd::TableRow) => {
                if let (Some(table), Some(row)) = (current_table.as_mut(), current_row.take()) {
                    table.rows.push(row);
                }
            }
            Event::Start(Tag::TableCell) => {
                current_cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                if let Some(row) = current_row.as_mut() {
                    row.push(current_cell.trim().to_string());
                }
            }
            Event::Text(text) => {
                // Text inside fenced blocks at section level carries no
                // fields and is skipped by falling through.
                if heading_level.is_some() {
                    heading_text.push_str(&text);
                } else if current_row.is_some() || in_head {
                    current_cell.push_str(&text);
                } else if let Some(item) = current_item.as_mut() {
                    item.text.push_str(&text);
                }
            }
            Event::Code(code) => {
                if heading_level.is_some() {
                    heading_text.push_str(&code);
                } else if current_row.is_some() || in_head {
                    current_cell.push_str(&code);
                } else if let Some(item) = current_item.as_mut() {
                    item.text.push_str(&code);
                    item.codes.push(code.to_string());
                }
            }
            _ => {}
        }
    }

    sections
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"# verify-example

## Purpose

- **Consistency**: imports follow one style.
- **Safety**: no wildcard re-exports.

## Related Files

| Path | Purpose |
| ---- | ------- |
| src/lib.rs | module exports |
| src/error.rs | error enum |

## Workflow

### 1. no-wildcards

- Target: `src/**/*.rs`
- Detect: `use .*::\*;` (regex)
- Pass: no matches
"#;

    #[test]
    fn frontmatter_split() {
        let content = "---\nname: verify-x\nauto: true\n---\n# body\n";
        let (fm, body) = split_frontmatter(content).unwrap();
        let meta: Metadata = serde_yaml::from_str(fm).unwrap();
        assert_eq!(meta.name, "verify-x");
        assert!(meta.auto);
        assert!(meta.trigger.is_none());
        assert!(body.starts_with("# body"));
    }

    #[test]
    fn frontmatter_missing_is_none() {
        assert!(split_frontmatter("# just markdown\n").is_none());
    }

    #[test]
    fn sections_and_items() {
        let sections = parse_sections(DOC);
        let purpose = find_section(&sections, "purpose").unwrap();
        assert_eq!(purpose.items.len(), 2);
        assert!(purpose.items[0].text.contains("Consistency"));
    }

    #[test]
    fn tables_rows_parsed() {
        let sections = parse_sections(DOC);
        let related = find_section(&sections, "Related Files").unwrap();
        assert_eq!(related.tables.len(), 1);
        let table = &related.tables[0];
        assert_eq!(table.headers, vec!["Path", "Purpose"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], "src/lib.rs");
    }

    #[test]
    fn subsections_hold_their_items() {
        let sections = parse_sections(DOC);
        let workflow = find_section(&sections, "Workflow").unwrap();
        assert_eq!(workflow.subsections.len(), 1);
        let step = &workflow.subsections[0];
        assert_eq!(step.title, "1. no-wildcards");
        assert_eq!(step.items.len(), 3);
    }

    #[test]
    fn item_fields_and_codes() {
        let sections = parse_sections(DOC);
        let step = &find_section(&sections, "Workflow").unwrap().subsections[0];
        let (rest, codes) = step.items[0].field("target").unwrap();
        assert_eq!(codes, ["src/**/*.rs"]);
        assert_eq!(rest, "src/**/*.rs");

        let (detect_rest, detect_codes) = step.items[1].field("detect").unwrap();
        assert_eq!(detect_codes, [r"use .*::\*;"]);
        assert!(detect_rest.contains("(regex)"));

        assert!(step.items[0].field("pass").is_none());
    }

    #[test]
    fn unclosed_frontmatter_is_rejected() {
        assert!(split_frontmatter("---\nname: x\nno end").is_none());
    }
}
