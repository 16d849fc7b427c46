/// Icons used in splitter output.
///
/// Codepoints come from the Font Awesome range shipped with every nerd font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Check,
    Cross,
    Warning,
    Info,

    // Files and folders
    Folder,
    File,
    Trash,

    // Work in progress
    Search,
    List,
    Clock,
    Timer,
    Sync,
}

impl NerdFont {
    pub fn unicode(&self) -> char {
        match self {
            Self::Check => '\u{f00c}',          // fa-check
            Self::Cross => '\u{f00d}',          // fa-times
            Self::Warning => '\u{f071}',        // fa-exclamation-triangle
            Self::Info => '\u{f05a}',           // fa-info-circle

            Self::Folder => '\u{f07b}',         // fa-folder
            Self::File => '\u{f15b}',           // fa-file
            Self::Trash => '\u{f1f8}',          // fa-trash

            Self::Search => '\u{f002}',         // fa-search
            Self::List => '\u{f03a}',           // fa-list
            Self::Clock => '\u{f017}',          // fa-clock
            Self::Timer => '\u{f2f2}',          // fa-stopwatch
            Self::Sync => '\u{f021}',           // fa-refresh
        }
    }
}

impl std::fmt::Display for NerdFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unicode())
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}
