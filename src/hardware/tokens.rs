//! Configurable controller token table

use std::collections::HashMap;

use crate::game::Action;

/// Default firmware tokens
pub const DEFAULT_TOKEN_TABLE: &str = "B1=button1,B2=button2,J=jump,L=left,R=right,N=neutral";

/// Maps raw controller tokens to semantic actions.
///
/// Firmware revisions disagree on token strings, so the table is loaded from
/// configuration rather than baked into the simulators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMap {
    entries: HashMap<String, Action>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenMapError {
    #[error("Malformed token entry (expected TOKEN=action): {0}")]
    Malformed(String),

    #[error("Unknown action '{action}' for token '{token}'")]
    UnknownAction { token: String, action: String },

    #[error("Token table is empty")]
    Empty,
}

impl TokenMap {
    pub fn new(entries: HashMap<String, Action>) -> Self {
        Self { entries }
    }

    /// Parse a `TOKEN=action,TOKEN=action` table
    pub fn parse(table: &str) -> Result<Self, TokenMapError> {
        let mut entries = HashMap::new();

        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, action) = entry
                .split_once('=')
                .ok_or_else(|| TokenMapError::Malformed(entry.to_string()))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(TokenMapError::Malformed(entry.to_string()));
            }
            let action = action
                .trim()
                .parse::<Action>()
                .map_err(|e| TokenMapError::UnknownAction {
                    token: token.to_string(),
                    action: e.0,
                })?;
            entries.insert(token.to_string(), action);
        }

        if entries.is_empty() {
            return Err(TokenMapError::Empty);
        }
        Ok(Self { entries })
    }

    /// Decode one token (surrounding whitespace ignored)
    pub fn decode(&self, token: &str) -> Option<Action> {
        self.entries.get(token.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TokenMap {
    fn default() -> Self {
        let parsed = Self::parse(DEFAULT_TOKEN_TABLE);
        debug_assert!(parsed.is_ok(), "default token table must parse");
        parsed.unwrap_or_else(|_| Self::new(HashMap::new()))
    }
}
