//! buildozer.spec reading and editing
//!
//! The file is INI-style: `[section]` headers, `key = value` entries,
//! `#`/`;` comments and indented continuation lines. List sections such as
//! `[app:source.exclude_patterns]` hold one bare value per line. Edits
//! rewrite only the lines they touch so comments and layout survive.
//!
//! Repeated automated edits tend to leave the same key behind several times.
//! Reads take the last occurrence (what configparser-style readers see);
//! writes update the first occurrence and drop the rest.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{PatchError, Result};

pub const APP_SECTION: &str = "app";
pub const REQUIREMENTS_KEY: &str = "requirements";
pub const LOCAL_RECIPES_KEY: &str = "p4a.local_recipes";
pub const ARCHS_KEY: &str = "android.archs";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    section: String,
    key: String,
    value: String,
    /// Line range `[start, end)` covered by the entry and its continuations
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildozerSpec {
    lines: Vec<String>,
    trailing_newline: bool,
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

fn section_header(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// `[app:source.exclude_patterns]` style section, whose lines are bare values
fn is_list_section(section: &str) -> bool {
    section.contains(':')
}

/// Split at whichever of `=` / `:` comes first
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(|c: char| c == '=' || c == ':')?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim()))
}

/// `key = value`, with any further value lines indented so they parse back
/// as continuations. Blank value lines are dropped since they would end the
/// entry.
fn entry_lines(key: &str, value: &str) -> Vec<String> {
    let mut parts = value.lines().map(str::trim).filter(|l| !l.is_empty());
    let mut lines = vec![format!("{} = {}", key, parts.next().unwrap_or(""))];
    lines.extend(parts.map(|part| format!("    {}", part)));
    lines
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl BuildozerSpec {
    pub fn parse(content: &str) -> Result<Self> {
        let spec = Self {
            lines: content.lines().map(str::to_string).collect(),
            trailing_newline: content.ends_with('\n'),
        };
        spec.entries()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = Vec::new();
        let mut section: Option<String> = None;
        let mut open_entry = false;

        for (idx, line) in self.lines.iter().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                open_entry = false;
                continue;
            }
            if is_comment(trimmed) {
                continue;
            }

            let indented = line.starts_with(|c: char| c.is_whitespace());
            if indented && open_entry {
                if let Some(entry) = entries.last_mut() {
                    entry.value.push('\n');
                    entry.value.push_str(trimmed);
                    entry.end = idx + 1;
                }
                continue;
            }

            if let Some(name) = section_header(trimmed) {
                section = Some(name.to_string());
                open_entry = false;
                continue;
            }

            let entry_section = section
                .clone()
                .ok_or_else(|| PatchError::spec_format(idx + 1, "entry before any [section] header"))?;
            let (key, value) = match split_entry(trimmed) {
                Some(pair) => pair,
                None if is_list_section(&entry_section) => (trimmed, ""),
                None => {
                    return Err(PatchError::spec_format(
                        idx + 1,
                        format!("unrecognized line `{}`", trimmed),
                    ))
                }
            };

            entries.push(Entry {
                section: entry_section,
                key: key.to_string(),
                value: value.to_string(),
                start: idx,
                end: idx + 1,
            });
            open_entry = true;
        }

        Ok(entries)
    }

    fn entries_or_empty(&self) -> Vec<Entry> {
        // Only parse() and set() construct or mutate lines; set() writes
        // multi-line values as continuation lines.
        self.entries().unwrap_or_default()
    }

    /// Value of the last `key` in `section`
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.entries_or_empty()
            .into_iter()
            .filter(|e| e.section == section && e.key == key)
            .last()
            .map(|e| e.value)
    }

    /// Comma/newline separated value split into items
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key)
            .map(|v| split_list(&v))
            .unwrap_or_default()
    }

    /// Bare values of a list section such as `app:source.exclude_patterns`
    pub fn list_section(&self, section: &str) -> Vec<String> {
        self.entries_or_empty()
            .into_iter()
            .filter(|e| e.section == section)
            .map(|e| e.key)
            .collect()
    }

    /// Keys that appear more than once, as `(section, key, count)`
    pub fn duplicate_keys(&self) -> Vec<(String, String, usize)> {
        let mut counts: Vec<(String, String, usize)> = Vec::new();
        for entry in self.entries_or_empty() {
            match counts
                .iter_mut()
                .find(|(s, k, _)| *s == entry.section && *k == entry.key)
            {
                Some((_, _, n)) => *n += 1,
                None => counts.push((entry.section, entry.key, 1)),
            }
        }
        counts.retain(|(_, _, n)| *n > 1);
        counts
    }

    /// Set `key` in `section`, creating the section if needed.
    /// Multi-line values are written as indented continuation lines.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let new_lines = entry_lines(key, value);
        let matching: Vec<Entry> = self
            .entries_or_empty()
            .into_iter()
            .filter(|e| e.section == section && e.key == key)
            .collect();

        if let Some((first, rest)) = matching.split_first() {
            for dup in rest.iter().rev() {
                self.lines.drain(dup.start..dup.end);
            }
            self.lines.drain(first.start..first.end);
            self.insert_lines(first.start, new_lines);
            return;
        }

        match self.section_insert_point(section) {
            Some(at) => self.insert_lines(at, new_lines),
            None => {
                if self.lines.last().map_or(false, |l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{}]", section));
                self.lines.extend(new_lines);
                self.trailing_newline = true;
            }
        }
    }

    fn insert_lines(&mut self, at: usize, new_lines: Vec<String>) {
        let tail = self.lines.split_off(at);
        self.lines.extend(new_lines);
        self.lines.extend(tail);
    }

    /// Line index just after the last non-blank line of `section`
    fn section_insert_point(&self, section: &str) -> Option<usize> {
        let header = self
            .lines
            .iter()
            .position(|l| section_header(l.trim()) == Some(section))?;

        let mut end = header + 1;
        for (idx, line) in self.lines.iter().enumerate().skip(header + 1) {
            let trimmed = line.trim();
            if section_header(trimmed).is_some() {
                break;
            }
            if !trimmed.is_empty() {
                end = idx + 1;
            }
        }
        Some(end)
    }

    pub fn requirements(&self) -> Vec<String> {
        self.get_list(APP_SECTION, REQUIREMENTS_KEY)
    }

    pub fn archs(&self) -> Vec<String> {
        self.get_list(APP_SECTION, ARCHS_KEY)
    }

    pub fn local_recipes(&self) -> Option<String> {
        self.get(APP_SECTION, LOCAL_RECIPES_KEY)
    }

    pub fn set_local_recipes(&mut self, dir: &str) {
        self.set(APP_SECTION, LOCAL_RECIPES_KEY, dir);
    }

    /// Append `name` to the requirements unless already listed.
    /// Returns whether the spec changed.
    pub fn add_requirement(&mut self, name: &str) -> bool {
        let mut reqs = self.requirements();
        if reqs.iter().any(|r| r == name) {
            return false;
        }
        reqs.push(name.to_string());
        self.set(APP_SECTION, REQUIREMENTS_KEY, &reqs.join(","));
        true
    }
}

impl fmt::Display for BuildozerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))?;
        if self.trailing_newline && !self.lines.is_empty() {
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_entry_uses_first_delimiter() {
        assert_eq!(
            split_entry("source.url = https://example.org"),
            Some(("source.url", "https://example.org"))
        );
        assert_eq!(
            split_entry("p4a.url: https://h/x?a=b"),
            Some(("p4a.url", "https://h/x?a=b"))
        );
        assert_eq!(split_entry("title: Echo"), Some(("title", "Echo")));
        assert_eq!(split_entry("= nothing"), None);
    }

    #[test]
    fn test_split_list_handles_newlines() {
        assert_eq!(
            split_list("python3,kivy,\n  libffi"),
            vec!["python3", "kivy", "libffi"]
        );
    }

    #[test]
    fn test_entry_lines_indent_continuations() {
        assert_eq!(entry_lines("a", "x"), vec!["a = x"]);
        assert_eq!(
            entry_lines("a", "x,\n\ny"),
            vec!["a = x,".to_string(), "    y".to_string()]
        );
    }

    #[test]
    fn test_entry_before_section_is_rejected() {
        let err = BuildozerSpec::parse("title = x\n[app]\n").unwrap_err();
        assert!(matches!(err, PatchError::SpecFormat { line: 1, .. }));
    }
}
