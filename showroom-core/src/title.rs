//! Heading detection for AsciiDoc pages.
//!
//! Two heading syntaxes are recognised per level: the prefix form
//! (`= Title`, `== Title`) and the setext-style underline form (a title line
//! followed by a line of `=` or `-` at least as long as the title). Each
//! check scans the whole page before the next one runs, so a level-1 heading
//! anywhere wins over a level-2 heading that appears earlier.

/// Title of an AsciiDoc page, or an empty string when it has no heading.
pub fn extract_title(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    prefix_heading(&lines, 1)
        .or_else(|| underline_heading(&lines, '='))
        .or_else(|| prefix_heading(&lines, 2))
        .or_else(|| underline_heading(&lines, '-'))
        .unwrap_or_default()
}

fn prefix_heading(lines: &[&str], level: usize) -> Option<String> {
    let marker = "=".repeat(level);
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix(&marker)?;
        // `= ` but not `==`, and `== ` but not `===`.
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let title = rest.trim().trim_end_matches('=').trim_end();
        (!title.is_empty()).then(|| title.to_string())
    })
}

fn underline_heading(lines: &[&str], marker: char) -> Option<String> {
    lines.windows(2).find_map(|pair| {
        let (title, underline) = (pair[0], pair[1]);
        let is_underline = !underline.is_empty() && underline.chars().all(|c| c == marker);
        let is_title = !title.is_empty() && !title.chars().all(|c| c == marker);
        (is_underline && is_title && underline.chars().count() >= title.chars().count())
            .then(|| title.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_level_one() {
        assert_eq!(extract_title("= Getting Started\n\ntext"), "Getting Started");
    }

    #[test]
    fn strips_trailing_markers() {
        assert_eq!(extract_title("= Symmetric =\n"), "Symmetric");
    }

    #[test]
    fn later_level_one_beats_earlier_level_two() {
        let text = "== Section first\nbody\n= Real Title\n";
        assert_eq!(extract_title(text), "Real Title");
    }

    #[test]
    fn underline_level_one() {
        assert_eq!(extract_title("Workshop\n========\n\nbody"), "Workshop");
    }

    #[test]
    fn short_underline_is_ignored() {
        assert_eq!(extract_title("Workshop Intro\n===\n"), "");
    }

    #[test]
    fn level_two_fallbacks() {
        assert_eq!(extract_title(":attr: x\n\n== Setup\n"), "Setup");
        assert_eq!(extract_title("Setup steps\n-----------\n"), "Setup steps");
    }

    #[test]
    fn level_three_is_not_a_title() {
        assert_eq!(extract_title("=== Deep\n"), "");
    }

    #[test]
    fn indented_headings_are_found() {
        assert_eq!(extract_title("   = Indented  \n"), "Indented");
    }

    #[test]
    fn no_heading() {
        assert_eq!(extract_title("just text\nmore text"), "");
        assert_eq!(extract_title(""), "");
    }
}
