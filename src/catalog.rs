//! Character catalog for PWICE
//!
//! The catalog is the read-only registry of character profiles, per-character
//! watch data pools, and organizational archives. It is parsed once at startup
//! from the YAML document compiled into the binary and never mutated.

use crate::error::{PwiceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Catalog document compiled into the binary
const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.yaml");

/// Upper bound of every capability axis
pub const MAX_SCORE: u8 = 10;

/// Four-axis capability score (the SAIF ranking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityScores {
    pub strength: u8,
    pub authority: u8,
    pub intelligence: u8,
    pub finance: u8,
}

impl CapabilityScores {
    /// Axis labels paired with their values, in display order
    pub fn axes(&self) -> [(&'static str, u8); 4] {
        [
            ("Strength", self.strength),
            ("Authority", self.authority),
            ("Intelligence", self.intelligence),
            ("Finance", self.finance),
        ]
    }

    fn is_bounded(&self) -> bool {
        self.axes().iter().all(|(_, v)| *v <= MAX_SCORE)
    }
}

/// Theme song metadata shown on the detail screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSong {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// An immutable character profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub hanja: String,
    pub meaning: String,
    pub age: u32,
    pub position: String,
    pub role: String,
    pub scores: CapabilityScores,
    pub mbti: String,
    pub appearance: String,
    pub personality: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Instruction text that seeds the remote model's persona
    pub persona: String,
    #[serde(default)]
    pub theme: Option<ThemeSong>,
    /// Hex color in `#RRGGBB` form
    #[serde(default)]
    pub signature_color: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Character {
    /// Parse the signature color into RGB components
    ///
    /// Returns `None` when no color is set or it is not `#RRGGBB`.
    pub fn signature_rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.signature_color.as_deref()?.strip_prefix('#')?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let rgb = u32::from_str_radix(hex, 16).ok()?;
        Some(((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8))
    }
}

/// Direction of a simulated call or message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => write!(f, "IN"),
            Self::Outgoing => write!(f, "OUT"),
        }
    }
}

/// A simulated call or message log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub name: String,
    pub direction: Direction,
    pub content: String,
}

/// Sampling source for watch snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchDataPool {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub calls: Vec<LogEntry>,
    #[serde(default)]
    pub messages: Vec<LogEntry>,
    #[serde(default)]
    pub searches: Vec<String>,
}

/// One section of an archive document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub heading: String,
    pub body: String,
}

/// Organizational lore shown on the archive screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub entries: Vec<ArchiveEntry>,
}

/// Organization header shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub slogan: String,
    pub philosophy: String,
    pub public_face: String,
}

/// Raw document layout, before validation
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    organization: Organization,
    default_pool: String,
    #[serde(default)]
    common_persona: String,
    characters: Vec<Character>,
    #[serde(default)]
    pools: HashMap<String, WatchDataPool>,
    #[serde(default)]
    archives: Vec<Archive>,
}

/// Read-only registry of characters, watch pools and archives
#[derive(Debug, Clone)]
pub struct Catalog {
    organization: Organization,
    characters: Vec<Character>,
    pools: HashMap<String, WatchDataPool>,
    default_pool: WatchDataPool,
    archives: Vec<Archive>,
}

impl Catalog {
    /// Load the catalog compiled into the binary
    ///
    /// # Errors
    ///
    /// Returns error if the embedded document fails validation
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_CATALOG)
    }

    /// Load a catalog from a YAML file on disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PwiceError::Config(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a catalog document
    ///
    /// The shared persona preamble is prepended to every character's
    /// persona prompt here, so consumers only ever see the final text.
    ///
    /// # Errors
    ///
    /// Returns `PwiceError::Config` on duplicate character or archive ids,
    /// capability scores above 10, or a `default_pool` naming no pool.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_yaml::from_str(contents)
            .map_err(|e| PwiceError::Config(format!("Failed to parse catalog: {}", e)))?;

        let mut seen = HashSet::new();
        for character in &doc.characters {
            if !seen.insert(character.id.as_str()) {
                return Err(PwiceError::Config(format!(
                    "Duplicate character id: {}",
                    character.id
                ))
                .into());
            }
            if !character.scores.is_bounded() {
                return Err(PwiceError::Config(format!(
                    "Capability scores for {} must be within 0..={}",
                    character.id, MAX_SCORE
                ))
                .into());
            }
            if let Some(color) = &character.signature_color {
                if character.signature_rgb().is_none() {
                    return Err(PwiceError::Config(format!(
                        "Signature color for {} must be #RRGGBB, got {:?}",
                        character.id, color
                    ))
                    .into());
                }
            }
        }

        let mut seen = HashSet::new();
        for archive in &doc.archives {
            if !seen.insert(archive.id.as_str()) {
                return Err(
                    PwiceError::Config(format!("Duplicate archive id: {}", archive.id)).into(),
                );
            }
        }

        let default_pool = doc.pools.get(&doc.default_pool).cloned().ok_or_else(|| {
            PwiceError::Config(format!(
                "default_pool '{}' has no matching pool",
                doc.default_pool
            ))
        })?;

        let common = doc.common_persona.trim();
        let characters = doc
            .characters
            .into_iter()
            .map(|mut c| {
                if !common.is_empty() {
                    c.persona = format!("{}\n\n{}", common, c.persona.trim());
                }
                c
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            characters = characters.len(),
            archives = doc.archives.len(),
            "Catalog loaded"
        );

        Ok(Self {
            organization: doc.organization,
            characters,
            pools: doc.pools,
            default_pool,
            archives: doc.archives,
        })
    }

    /// Look up a character by id
    ///
    /// # Errors
    ///
    /// Returns `PwiceError::Lookup` if no character has this id
    pub fn find_character(&self, id: &str) -> Result<&Character> {
        self.characters
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| {
                PwiceError::Lookup {
                    kind: "Character",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// Look up an archive by id
    ///
    /// # Errors
    ///
    /// Returns `PwiceError::Lookup` if no archive has this id
    pub fn find_archive(&self, id: &str) -> Result<&Archive> {
        self.archives.iter().find(|a| a.id == id).ok_or_else(|| {
            PwiceError::Lookup {
                kind: "Archive",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Watch pool for a character, falling back to the default pool
    pub fn pool_for(&self, character_id: &str) -> &WatchDataPool {
        self.pools.get(character_id).unwrap_or(&self.default_pool)
    }

    /// Whether the character has a dedicated pool
    pub fn has_pool(&self, character_id: &str) -> bool {
        self.pools.contains_key(character_id)
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn archives(&self) -> &[Archive] {
        &self.archives
    }

    pub fn organization(&self) -> &Organization {
        &self.organization
    }
}
