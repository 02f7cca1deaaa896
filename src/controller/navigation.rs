//! Sections and the back-navigable history stack.

/// Top-level views shown exclusively of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Home,
    LiveDetection,
    Analysis,
    Help,
    Feedback,
}

impl Section {
    /// Order of the sidebar links.
    pub const ALL: [Section; 5] = [
        Section::Home,
        Section::LiveDetection,
        Section::Analysis,
        Section::Help,
        Section::Feedback,
    ];

    /// Navigation key carried by the sidebar link (`data-content`).
    pub fn nav_key(self) -> &'static str {
        match self {
            Section::Home => "home",
            Section::LiveDetection => "live-detection",
            Section::Analysis => "analysis",
            Section::Help => "help",
            Section::Feedback => "feedback",
        }
    }

    /// Element id of the section: `{nav_key}-content`.
    pub fn id(self) -> &'static str {
        match self {
            Section::Home => "home-content",
            Section::LiveDetection => "live-detection-content",
            Section::Analysis => "analysis-content",
            Section::Help => "help-content",
            Section::Feedback => "feedback-content",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Home => "Inicio",
            Section::LiveDetection => "Detección en Vivo",
            Section::Analysis => "Análisis",
            Section::Help => "Ayuda",
            Section::Feedback => "Encuesta",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, NavigationError> {
        Self::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| NavigationError::SectionNotFound(id.to_string()))
    }

    pub fn from_nav_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.nav_key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("target section with id '#{0}' not found")]
    SectionNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    pub section_id: String,
    pub breadcrumb_label: String,
}

/// History of shown sections; the last entry is the visible one.
#[derive(Debug, Default)]
pub struct NavigationStack {
    entries: Vec<NavigationEntry>,
}

impl NavigationStack {
    /// Push unless the top entry already points at the same section.
    /// Returns whether an entry was added.
    pub fn push(&mut self, section_id: &str, breadcrumb_label: &str) -> bool {
        if self.top().is_some_and(|e| e.section_id == section_id) {
            return false;
        }
        self.entries.push(NavigationEntry {
            section_id: section_id.to_string(),
            breadcrumb_label: breadcrumb_label.to_string(),
        });
        true
    }

    pub fn pop(&mut self) -> Option<NavigationEntry> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<&NavigationEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NavigationEntry] {
        &self.entries
    }
}
