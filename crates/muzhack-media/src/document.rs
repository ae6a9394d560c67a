//! Build-instructions document source.
//!
//! The document is a single markdown file whose YAML front matter carries the
//! title, author and page styling, so the renderer needs no other inputs.

pub use muzhack_models::document::{INSTRUCTIONS_OUTPUT_NAME, INSTRUCTIONS_SOURCE_NAME};

/// Inputs for the build-instructions document.
#[derive(Debug, Clone, Copy)]
pub struct InstructionsSource<'a> {
    pub title: &'a str,
    pub author: Option<&'a str>,
    pub bom: &'a str,
    pub instructions: &'a str,
}

/// Quote a value as a YAML double-quoted scalar.
fn yaml_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Assemble the markdown source for the build-instructions document.
pub fn build_instructions_markdown(source: &InstructionsSource<'_>) -> String {
    let mut doc = String::new();

    doc.push_str("---\n");
    doc.push_str(&format!(
        "title: {}\n",
        yaml_quote(&format!("{} Build Instructions", source.title.trim()))
    ));
    if let Some(author) = source.author.filter(|a| !a.trim().is_empty()) {
        doc.push_str(&format!("author: {}\n", yaml_quote(author.trim())));
    }
    doc.push_str(
        "header-includes:\n\
         \x20   - \\usepackage{fancyhdr}\n\
         \x20   - \\pagestyle{fancy}\n\
         \x20   - \\fancyhead[CO,CE]{Build Instructions}\n\
         papersize: A4\n\
         documentclass: article\n\
         margin-left: 1in\n\
         margin-right: 1in\n\
         margin-top: 1in\n\
         margin-bottom: 1in\n\
         ---\n\n",
    );

    doc.push_str("# Bill of Materials\n");
    doc.push_str(source.bom.trim_end());
    doc.push_str("\n\n");
    doc.push_str(source.instructions.trim_end());
    doc.push('\n');

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter() {
        let doc = build_instructions_markdown(&InstructionsSource {
            title: "Synth",
            author: Some("Ada"),
            bom: "- 1x knob",
            instructions: "Solder it.",
        });

        assert!(doc.starts_with("---\ntitle: \"Synth Build Instructions\"\nauthor: \"Ada\"\n"));
        assert!(doc.contains("    - \\usepackage{fancyhdr}\n"));
        assert!(doc.contains("papersize: A4\n"));
        assert!(doc.contains("---\n\n# Bill of Materials\n- 1x knob\n\nSolder it.\n"));
    }

    #[test]
    fn test_author_is_optional() {
        let doc = build_instructions_markdown(&InstructionsSource {
            title: "Synth",
            author: None,
            bom: "",
            instructions: "",
        });
        assert!(!doc.contains("author:"));
        assert!(doc.ends_with("# Bill of Materials\n\n\n\n"));
    }

    #[test]
    fn test_title_is_escaped() {
        let doc = build_instructions_markdown(&InstructionsSource {
            title: "Box: \"deluxe\"",
            author: None,
            bom: "",
            instructions: "",
        });
        assert!(doc.contains("title: \"Box: \\\"deluxe\\\" Build Instructions\"\n"));
    }
}
