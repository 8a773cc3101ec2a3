//! Line-oriented `[section]` / `key=value` documents
//!
//! KDE config files and look-and-feel `defaults` files stack group names in
//! one header (`[kdeglobals][Icons]`), so a section is addressed by its full
//! header line rather than by a parsed group path. Everything that is not the
//! addressed key is carried through untouched, including comments, blank
//! lines, odd spacing and the line ending style.

enum Line<'a> {
    Header(&'a str),
    Entry { key: &'a str, value: &'a str },
    Other,
}

fn classify(content: &str) -> Line<'_> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return Line::Header(trimmed);
    }
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return Line::Other;
    }
    match trimmed.split_once('=') {
        Some((key, value)) => Line::Entry {
            key: key.trim(),
            value: value.trim(),
        },
        None => Line::Other,
    }
}

/// Line content without its terminator
fn strip_eol(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

fn eol_of(line: &str) -> &str {
    &line[strip_eol(line).len()..]
}

fn document_eol(doc: &str) -> &'static str {
    if doc.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Accepts `Icons`, `[Icons]` or `[kdeglobals][Icons]` and returns the header form
fn header(section: &str) -> String {
    let trimmed = section.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    }
}

/// Set `key=value` inside `section`, in a single pass over the document.
///
/// - key present in the section: value overwritten in place
/// - section present without the key: entry added after the section's last
///   non-blank line
/// - section absent: section appended at the end of the document
///
/// The result never holds more than one copy of the target header nor more
/// than one `key=` line for it. Repeated copies of the header already in the
/// input are folded into the first: their header line is dropped and their
/// non-blank body lines move to the end of the first copy. Running it again
/// with the same arguments returns its input unchanged.
pub fn upsert(doc: &str, section: &str, key: &str, value: &str) -> String {
    let target = header(section);
    let eol = document_eol(doc);
    let entry = format!("{key}={value}");

    let mut out = String::with_capacity(doc.len() + target.len() + entry.len() + 4);
    let mut in_target = false;
    let mut in_repeat = false;
    let mut seen_target = false;
    let mut written = false;
    let mut insert_at: Option<usize> = None;
    // body of repeated target copies, appended to the first copy
    let mut carried = String::new();

    for line in doc.split_inclusive('\n') {
        let content = strip_eol(line);
        let is_key = match classify(content) {
            Line::Header(name) => {
                in_target = name == target;
                in_repeat = in_target && seen_target;
                if in_repeat {
                    continue;
                }
                out.push_str(line);
                if in_target {
                    seen_target = true;
                    insert_at = Some(out.len());
                }
                continue;
            }
            Line::Entry { key: found, .. } => in_target && found == key,
            Line::Other => false,
        };

        if in_repeat {
            if content.trim().is_empty() || (is_key && written) {
                continue;
            }
            if is_key {
                carried.push_str(&entry);
                written = true;
            } else {
                carried.push_str(content);
            }
            carried.push_str(eol);
            continue;
        }

        if is_key {
            if !written {
                out.push_str(&entry);
                out.push_str(eol_of(line));
                written = true;
            }
            continue;
        }

        out.push_str(line);
        if in_target && !content.trim().is_empty() {
            insert_at = Some(out.len());
        }
    }

    let mut insertion = carried;
    if !written {
        insertion.push_str(&entry);
        insertion.push_str(eol);
    }
    if insertion.is_empty() {
        return out;
    }

    match insert_at {
        Some(pos) => {
            if !out[..pos].ends_with('\n') {
                insertion.insert_str(0, eol);
            }
            out.insert_str(pos, &insertion);
        }
        None => {
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push_str(eol);
                }
                if !out.trim_end_matches(['\r', '\n']).is_empty() && !ends_with_blank_line(&out) {
                    out.push_str(eol);
                }
            }
            out.push_str(&target);
            out.push_str(eol);
            out.push_str(&insertion);
        }
    }
    out
}

fn ends_with_blank_line(doc: &str) -> bool {
    doc.ends_with("\n\n") || doc.ends_with("\r\n\r\n")
}

/// Value of the first `key=` line inside `section`
pub fn get(doc: &str, section: &str, key: &str) -> Option<String> {
    let target = header(section);
    let mut in_target = false;
    for line in doc.lines() {
        match classify(line) {
            Line::Header(name) => in_target = name == target,
            Line::Entry { key: found, value } if in_target && found == key => {
                return Some(value.to_string());
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
[kdeglobals][General]
ColorScheme=BreezeLight

[kdeglobals][KDE]
widgetStyle=Breeze

[plasmarc][Theme]
name=default
";

    #[test]
    fn test_upsert_overwrites_existing_key() {
        let out = upsert(BASE, "[kdeglobals][General]", "ColorScheme", "BreezeDark");
        assert_eq!(out, BASE.replace("ColorScheme=BreezeLight", "ColorScheme=BreezeDark"));
    }

    #[test]
    fn test_upsert_inserts_at_end_of_existing_section() {
        let out = upsert(BASE, "[kdeglobals][KDE]", "SingleClick", "false");
        assert_eq!(
            out,
            "\
[kdeglobals][General]
ColorScheme=BreezeLight

[kdeglobals][KDE]
widgetStyle=Breeze
SingleClick=false

[plasmarc][Theme]
name=default
"
        );
    }

    #[test]
    fn test_upsert_appends_missing_section() {
        let out = upsert(BASE, "[kdeglobals][Icons]", "Theme", "Papirus");
        assert!(out.starts_with(BASE));
        assert_eq!(&out[BASE.len()..], "\n[kdeglobals][Icons]\nTheme=Papirus\n");
    }

    #[test]
    fn test_upsert_into_empty_document() {
        assert_eq!(upsert("", "[ksplashrc][KSplash]", "Theme", "None"), "[ksplashrc][KSplash]\nTheme=None\n");
    }

    #[test]
    fn test_upsert_accepts_bare_section_name() {
        let doc = "[General]\nName=Breeze\n";
        assert_eq!(upsert(doc, "General", "Name", "Custom"), "[General]\nName=Custom\n");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        for (section, key, value) in [
            ("[kdeglobals][General]", "ColorScheme", "BreezeDark"),
            ("[kdeglobals][KDE]", "SingleClick", "false"),
            ("[kdeglobals][Icons]", "Theme", "Papirus"),
        ] {
            let once = upsert(BASE, section, key, value);
            let twice = upsert(&once, section, key, value);
            assert_eq!(once, twice, "second upsert of {section} {key} changed the document");
        }
    }

    #[test]
    fn test_sequential_upserts_keep_last_values_and_other_lines() {
        let doc = upsert(BASE, "[kdeglobals][Icons]", "Theme", "Papirus");
        let doc = upsert(&doc, "[kdeglobals][General]", "ColorScheme", "Nordic");
        let doc = upsert(&doc, "[kdeglobals][Icons]", "Theme", "Papirus-Dark");

        assert_eq!(get(&doc, "[kdeglobals][Icons]", "Theme").as_deref(), Some("Papirus-Dark"));
        assert_eq!(get(&doc, "[kdeglobals][General]", "ColorScheme").as_deref(), Some("Nordic"));
        assert_eq!(doc.matches("[kdeglobals][Icons]").count(), 1);
        assert_eq!(doc.matches("Theme=").count(), 1);

        let untouched: Vec<&str> = BASE
            .lines()
            .filter(|l| !l.starts_with("ColorScheme="))
            .collect();
        for line in untouched {
            assert!(doc.lines().any(|l| l == line), "lost line {line:?}");
        }
    }

    #[test]
    fn test_upsert_collapses_duplicate_keys_in_target_section() {
        let doc = "[Icons]\nTheme=a\nOther=1\nTheme=b\n[Icons]\nTheme=c\n";
        let out = upsert(doc, "[Icons]", "Theme", "z");
        assert_eq!(out, "[Icons]\nTheme=z\nOther=1\n");
        assert_eq!(out.matches("[Icons]").count(), 1);
    }

    #[test]
    fn test_upsert_folds_repeated_section_into_first() {
        let doc = "[Icons]\nTheme=a\n\n[General]\nx=1\n\n[Icons]\nSize=2\n";
        let out = upsert(doc, "[Icons]", "Theme", "z");
        assert_eq!(out, "[Icons]\nTheme=z\nSize=2\n\n[General]\nx=1\n\n");
        assert_eq!(out.matches("[Icons]").count(), 1);
        assert_eq!(upsert(&out, "[Icons]", "Theme", "z"), out);
    }

    #[test]
    fn test_upsert_takes_key_from_repeated_section() {
        let doc = "[Icons]\nSize=2\n[General]\nx=1\n[Icons]\nTheme=a\n";
        let out = upsert(doc, "[Icons]", "Theme", "z");
        assert_eq!(out, "[Icons]\nSize=2\nTheme=z\n[General]\nx=1\n");
    }

    #[test]
    fn test_upsert_ignores_same_key_in_other_sections() {
        let doc = "[kdeglobals][Icons]\nTheme=breeze\n\n[ksplashrc][KSplash]\nTheme=org.kde.breeze\n";
        let out = upsert(doc, "[ksplashrc][KSplash]", "Theme", "None");
        assert_eq!(out, "[kdeglobals][Icons]\nTheme=breeze\n\n[ksplashrc][KSplash]\nTheme=None\n");
    }

    #[test]
    fn test_upsert_handles_missing_trailing_newline() {
        let doc = "[General]\nName=Breeze";
        assert_eq!(upsert(doc, "[General]", "Id", "x"), "[General]\nName=Breeze\nId=x\n");
        assert_eq!(upsert(doc, "[Other]", "Id", "x"), "[General]\nName=Breeze\n\n[Other]\nId=x\n");
    }

    #[test]
    fn test_upsert_preserves_crlf_and_comments() {
        let doc = "# generated\r\n[General]\r\n; note\r\nName=Breeze\r\n";
        let out = upsert(doc, "[General]", "Name", "Custom");
        assert_eq!(out, "# generated\r\n[General]\r\n; note\r\nName=Custom\r\n");
        let out = upsert(&out, "[Icons]", "Theme", "Papirus");
        assert_eq!(out, "# generated\r\n[General]\r\n; note\r\nName=Custom\r\n\r\n[Icons]\r\nTheme=Papirus\r\n");
    }

    #[test]
    fn test_upsert_matches_key_with_spaces_around_equals() {
        let doc = "[Mouse]\ncursorTheme = breeze_cursors\n";
        let out = upsert(doc, "[Mouse]", "cursorTheme", "Bibata");
        assert_eq!(out, "[Mouse]\ncursorTheme=Bibata\n");
    }

    #[test]
    fn test_get_reads_only_target_section() {
        let doc = "[KDE]\nLookAndFeelPackage=org.kde.breezedark.desktop\n[General]\nLookAndFeelPackage=nope\n";
        assert_eq!(get(doc, "[KDE]", "LookAndFeelPackage").as_deref(), Some("org.kde.breezedark.desktop"));
        assert_eq!(get(doc, "[Icons]", "Theme"), None);
    }
}
