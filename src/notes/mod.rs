//! Slide data model and the notes-source collaborator
//!
//! The notes source is the only view the co-host has of the running
//! presentation. Production deployments wrap host automation behind
//! [`NotesSource`]; the bundled [`DeckFileSource`] reads a deck description
//! from disk so the pipeline can run (and be tested) without a slide host.

pub mod tags;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lightweight per-poll slide position report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideInfo {
    /// Zero-based slide index
    pub index: usize,
    /// Slide title ("Slide N" when the host reports none)
    pub title: String,
    /// Total slides in the deck
    pub total_count: usize,
    /// Whether the host is in presentation (slideshow) mode
    pub is_presenting: bool,
}

/// Full snapshot of one slide, captured when a change is detected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideSnapshot {
    /// Zero-based slide index
    pub index: usize,
    /// Slide title
    pub title: String,
    /// Raw speaker notes, tags and all
    pub raw_notes: String,
    /// Visible slide body content, when the host exposes it
    pub content: Option<String>,
    /// Path (or identifier) of the open presentation
    pub source_path: String,
    /// When this snapshot was captured
    pub captured_at: DateTime<Utc>,
}

impl SlideSnapshot {
    /// Create a snapshot, validating model invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if `source_path` is empty.
    pub fn new(
        index: usize,
        title: impl Into<String>,
        raw_notes: impl Into<String>,
        content: Option<String>,
        source_path: impl Into<String>,
    ) -> Result<Self> {
        let source_path = source_path.into();
        if source_path.is_empty() {
            return Err(Error::Invalid("source_path cannot be empty".to_string()));
        }

        Ok(Self {
            index,
            title: title.into(),
            raw_notes: raw_notes.into(),
            content,
            source_path,
            captured_at: Utc::now(),
        })
    }

    /// Whether the slide carries any non-whitespace speaker notes
    #[must_use]
    pub fn has_notes(&self) -> bool {
        !self.raw_notes.trim().is_empty()
    }
}

/// View of the running presentation host.
///
/// All operations may fail transiently; callers treat failure as "no
/// information this tick", never as fatal.
#[async_trait::async_trait]
pub trait NotesSource: Send + Sync {
    /// Whether the presentation host is running
    async fn probe_active(&self) -> bool;

    /// Current slide position, or `None` if no deck is open
    async fn current_slide(&self) -> Option<SlideInfo>;

    /// Speaker notes for the given slide index (empty when absent)
    async fn notes_for(&self, index: usize) -> String;

    /// Visible slide body content, when available
    async fn content_for(&self, _index: usize) -> Option<String> {
        None
    }

    /// Path or identifier of the open presentation
    async fn path(&self) -> String;
}

/// One slide in a deck description file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSlide {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// On-disk deck description consumed by [`DeckFileSource`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckFile {
    pub slides: Vec<DeckSlide>,
    /// Index the deck starts on
    #[serde(default)]
    pub current: usize,
}

/// Notes source backed by a deck description file.
///
/// Re-reads the file on every probe, so an external process (or a demo
/// driver) can advance `current` and the watcher sees the transition on its
/// next tick.
pub struct DeckFileSource {
    path: PathBuf,
}

impl DeckFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<DeckFile> {
        let content = std::fs::read_to_string(&self.path)?;
        let deck: DeckFile = serde_json::from_str(&content)?;
        Ok(deck)
    }
}

#[async_trait::async_trait]
impl NotesSource for DeckFileSource {
    async fn probe_active(&self) -> bool {
        self.path.exists()
    }

    async fn current_slide(&self) -> Option<SlideInfo> {
        match self.load() {
            Ok(deck) => {
                let slide = deck.slides.get(deck.current)?;
                Some(SlideInfo {
                    index: deck.current,
                    title: slide.title.clone(),
                    total_count: deck.slides.len(),
                    is_presenting: true,
                })
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "deck file unreadable");
                None
            }
        }
    }

    async fn notes_for(&self, index: usize) -> String {
        self.load()
            .ok()
            .and_then(|deck| deck.slides.get(index).map(|s| s.notes.clone()))
            .unwrap_or_default()
    }

    async fn content_for(&self, index: usize) -> Option<String> {
        self.load()
            .ok()
            .and_then(|deck| deck.slides.get(index).and_then(|s| s.content.clone()))
    }

    async fn path(&self) -> String {
        self.path.display().to_string()
    }
}
