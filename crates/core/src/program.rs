//! Program registry: the fixed universe of selectable budget actions.
//!
//! The registry is populated once at startup (from configuration) and is
//! read-only afterwards. User selections are turned into a [`Selection`]
//! at the UI boundary, then resolved against the registry into the
//! concrete codes the fetch layer queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI option that selects every registered program.
pub const SELECT_ALL_MARKER: &str = "Selecionar Todas";

/// Separator between code and description in a display option.
pub const OPTION_SEPARATOR: &str = " - ";

/// Short identifier of a budget action (e.g. `14T7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramCode(String);

impl ProgramCode {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self(code.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProgramCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for ProgramCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl AsRef<str> for ProgramCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered program: code plus display description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub code: ProgramCode,
    pub description: String,
}

impl ProgramEntry {
    pub fn new(code: impl Into<ProgramCode>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// `"code - description"`, the form shown in selection widgets.
    pub fn display_option(&self) -> String {
        format!("{}{}{}", self.code, OPTION_SEPARATOR, self.description)
    }
}

/// What the user asked for, after the UI boundary removed string sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every registered program.
    SelectAll,
    /// An explicit list of codes, in the order the user picked them.
    Explicit(Vec<ProgramCode>),
}

impl Selection {
    /// Build a selection from widget options.
    ///
    /// The [`SELECT_ALL_MARKER`] dominates: if present anywhere, the result is
    /// [`Selection::SelectAll`]. Other options are `"code - description"`
    /// strings (or bare codes); the code is the prefix before the first
    /// [`OPTION_SEPARATOR`].
    pub fn from_options<S: AsRef<str>>(options: &[S]) -> Self {
        if options
            .iter()
            .any(|option| option.as_ref().trim() == SELECT_ALL_MARKER)
        {
            return Self::SelectAll;
        }

        let codes = options
            .iter()
            .map(|option| code_from_option(option.as_ref()))
            .filter(|code| !code.as_str().is_empty())
            .collect();
        Self::Explicit(codes)
    }

    pub fn explicit<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ProgramCode>,
    {
        Self::Explicit(codes.into_iter().map(Into::into).collect())
    }

    /// True only for an explicit selection with no codes.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Explicit(codes) if codes.is_empty())
    }
}

fn code_from_option(option: &str) -> ProgramCode {
    let prefix = option
        .split_once(OPTION_SEPARATOR)
        .map_or(option, |(code, _)| code);
    ProgramCode::new(prefix)
}

/// Read-only mapping from program code to description, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramRegistry {
    entries: Vec<ProgramEntry>,
}

impl ProgramRegistry {
    /// Build a registry. A repeated code keeps its first description.
    pub fn new(entries: impl IntoIterator<Item = ProgramEntry>) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            if !registry.contains(&entry.code) {
                registry.entries.push(entry);
            }
        }
        registry
    }

    /// The Navy strategic projects tracked under the "Novo PAC".
    pub fn navy_strategic() -> Self {
        Self::new([
            ProgramEntry::new("14T7", "Tecnologia Nuclear da Marinha (PNM)"),
            ProgramEntry::new("123G", "Implantação Estaleiro/Base Naval (PROSUB-Infra)"),
            ProgramEntry::new("123H", "Construção Submarino Nuclear (PROSUB-SNBR)"),
            ProgramEntry::new("123I", "Construção Submarinos Convencionais (PROSUB-SBR)"),
            ProgramEntry::new("1N47", "Construção Navios-Patrulha 500t (NPa 500t)"),
        ])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, code: &ProgramCode) -> bool {
        self.entries.iter().any(|e| &e.code == code)
    }

    /// All registered codes, in registration order.
    pub fn codes(&self) -> Vec<ProgramCode> {
        self.entries.iter().map(|e| e.code.clone()).collect()
    }

    /// Registered description, or the code itself when unregistered.
    pub fn describe<'a>(&'a self, code: &'a ProgramCode) -> &'a str {
        self.entries
            .iter()
            .find(|e| &e.code == code)
            .map_or(code.as_str(), |e| e.description.as_str())
    }

    /// Resolve a selection to concrete codes.
    ///
    /// `SelectAll` yields every registered code. An explicit selection yields
    /// its codes de-duplicated, first occurrence wins; unregistered codes pass
    /// through untouched. An empty result means "nothing to query".
    pub fn resolve(&self, selection: &Selection) -> Vec<ProgramCode> {
        match selection {
            Selection::SelectAll => self.codes(),
            Selection::Explicit(codes) => {
                let mut resolved: Vec<ProgramCode> = Vec::with_capacity(codes.len());
                for code in codes {
                    if !resolved.contains(code) {
                        if !self.contains(code) {
                            tracing::debug!(code = %code, "Selected code is not registered");
                        }
                        resolved.push(code.clone());
                    }
                }
                resolved
            }
        }
    }

    /// Options for a multi-select widget: the select-all marker first,
    /// then one `"code - description"` entry per program.
    pub fn display_options(&self) -> Vec<String> {
        std::iter::once(SELECT_ALL_MARKER.to_string())
            .chain(self.entries.iter().map(ProgramEntry::display_option))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn as_set(codes: &[ProgramCode]) -> HashSet<&str> {
        codes.iter().map(ProgramCode::as_str).collect()
    }

    #[test]
    fn explicit_options_extract_code_prefix() {
        let registry = ProgramRegistry::navy_strategic();
        let selection = Selection::from_options(&[
            "123H - Construção Submarino Nuclear (PROSUB-SNBR)",
            "14T7 - Tecnologia Nuclear da Marinha (PNM)",
        ]);
        let codes = registry.resolve(&selection);
        assert_eq!(as_set(&codes), HashSet::from(["123H", "14T7"]));
    }

    #[test]
    fn split_happens_on_first_separator_only() {
        let selection = Selection::from_options(&["1N47 - Navios - Patrulha"]);
        assert_eq!(selection, Selection::explicit(["1N47"]));
    }

    #[test]
    fn bare_codes_are_accepted() {
        let selection = Selection::from_options(&["123G", " 123I "]);
        assert_eq!(selection, Selection::explicit(["123G", "123I"]));
    }

    #[test]
    fn select_all_marker_dominates() {
        let registry = ProgramRegistry::navy_strategic();
        let selection = Selection::from_options(&["14T7 - Tecnologia Nuclear", SELECT_ALL_MARKER]);
        assert_eq!(selection, Selection::SelectAll);
        assert_eq!(registry.resolve(&selection), registry.codes());
        assert_eq!(registry.resolve(&selection).len(), 5);
    }

    #[test]
    fn empty_input_resolves_to_nothing() {
        let registry = ProgramRegistry::navy_strategic();
        let selection = Selection::from_options::<&str>(&[]);
        assert!(selection.is_empty());
        assert!(registry.resolve(&selection).is_empty());
    }

    #[test]
    fn duplicate_selections_collapse() {
        let registry = ProgramRegistry::navy_strategic();
        let selection = Selection::explicit(["123G", "14T7", "123G"]);
        let codes = registry.resolve(&selection);
        assert_eq!(codes, vec![ProgramCode::new("123G"), ProgramCode::new("14T7")]);
    }

    #[test]
    fn describe_falls_back_to_code() {
        let registry = ProgramRegistry::navy_strategic();
        assert_eq!(
            registry.describe(&ProgramCode::new("14T7")),
            "Tecnologia Nuclear da Marinha (PNM)"
        );
        let unknown = ProgramCode::new("ZZZZ");
        assert_eq!(registry.describe(&unknown), "ZZZZ");
    }

    #[test]
    fn unregistered_codes_pass_through_resolve() {
        let registry = ProgramRegistry::navy_strategic();
        let codes = registry.resolve(&Selection::explicit(["ZZZZ"]));
        assert_eq!(codes, vec![ProgramCode::new("ZZZZ")]);
    }

    #[test]
    fn display_options_start_with_marker() {
        let registry = ProgramRegistry::navy_strategic();
        let options = registry.display_options();
        assert_eq!(options.len(), 6);
        assert_eq!(options[0], SELECT_ALL_MARKER);
        assert_eq!(options[1], "14T7 - Tecnologia Nuclear da Marinha (PNM)");

        // Every display option round-trips to its own code.
        let selection = Selection::from_options(&options[1..]);
        assert_eq!(registry.resolve(&selection), registry.codes());
    }

    #[test]
    fn registry_keeps_first_description_for_repeated_code() {
        let registry = ProgramRegistry::new([
            ProgramEntry::new("14T7", "first"),
            ProgramEntry::new("14T7", "second"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.describe(&ProgramCode::new("14T7")), "first");
    }
}
