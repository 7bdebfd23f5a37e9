use serde::{Deserialize, Serialize};

/// Kind of operation a show-queue task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Refresh,
    Add,
    Update,
    SeasonUpdate,
    Rename,
    Subtitle,
    Remove,
    ChangeSource,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        Self::Refresh,
        Self::Add,
        Self::Update,
        Self::SeasonUpdate,
        Self::Rename,
        Self::Subtitle,
        Self::Remove,
        Self::ChangeSource,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Add => "add",
            Self::Update => "update",
            Self::SeasonUpdate => "season_update",
            Self::Rename => "rename",
            Self::Subtitle => "subtitle",
            Self::Remove => "remove",
            Self::ChangeSource => "change_source",
        }
    }

    /// Human-readable label used in reporting.
    pub fn label(self) -> &'static str {
        match self {
            Self::Refresh => "Refresh",
            Self::Add => "Add",
            Self::Update => "Update",
            Self::SeasonUpdate => "Season Update",
            Self::Rename => "Rename",
            Self::Subtitle => "Subtitle",
            Self::Remove => "Remove Show",
            Self::ChangeSource => "Change Source",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-episode status stored in the `tv_episode.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Unaired,
    Wanted,
    #[default]
    Skipped,
    Ignored,
    Downloaded,
    Archived,
}

impl EpisodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unaired => "unaired",
            Self::Wanted => "wanted",
            Self::Skipped => "skipped",
            Self::Ignored => "ignored",
            Self::Downloaded => "downloaded",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unaired" => Some(Self::Unaired),
            "wanted" => Some(Self::Wanted),
            "skipped" => Some(Self::Skipped),
            "ignored" => Some(Self::Ignored),
            "downloaded" => Some(Self::Downloaded),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata source a show is keyed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerKind {
    Tmdb,
    Tvdb,
}

impl IndexerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tmdb => "tmdb",
            Self::Tvdb => "tvdb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tmdb" => Some(Self::Tmdb),
            "tvdb" => Some(Self::Tvdb),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndexerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a show: the indexer it comes from plus that indexer's series id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShowId {
    pub indexer: IndexerKind,
    pub id: u64,
}

impl ShowId {
    pub fn new(indexer: IndexerKind, id: u64) -> Self {
        Self { indexer, id }
    }
}

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.indexer, self.id)
    }
}

impl std::str::FromStr for ShowId {
    type Err = String;

    /// Parses the `indexer:id` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (indexer, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected indexer:id, got {s:?}"))?;
        let indexer =
            IndexerKind::parse(indexer).ok_or_else(|| format!("unknown indexer {indexer:?}"))?;
        let id = id
            .parse()
            .map_err(|_| format!("invalid series id {id:?}"))?;
        Ok(Self { indexer, id })
    }
}
