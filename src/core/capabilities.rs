//! Simulated tool capabilities.
//!
//! Capabilities are descriptions, not integrations: enabling one only
//! adds its clause to the system directive sent with each request. No
//! tool is ever invoked locally. The builtin table is fixed, but the
//! registry treats it as an open id-keyed set so entries can be added
//! in one place.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::core::store::{keys, SettingsStore, StoreError};

/// Static definition of one capability.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityDef {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Longer description shown in the Tools panel.
    pub description: &'static str,
    /// Parenthetical used when the capability is advertised to the model.
    pub summary: &'static str,
    pub requires_key: bool,
    /// Where to obtain a key, shown next to the key field.
    pub key_hint: Option<&'static str>,
}

const BUILTIN_CAPABILITIES: &[CapabilityDef] = &[
    CapabilityDef {
        id: "elevenlabs",
        display_name: "ElevenLabs",
        description: "Text-to-speech and voice synthesis",
        summary: "text-to-speech",
        requires_key: true,
        key_hint: Some("Get from ElevenLabs Dashboard"),
    },
    CapabilityDef {
        id: "notion",
        display_name: "Notion",
        description: "Database and workspace operations",
        summary: "database operations",
        requires_key: true,
        key_hint: Some("Create integration token"),
    },
    CapabilityDef {
        id: "calculator",
        display_name: "Calculator",
        description: "Mathematical operations and computations",
        summary: "mathematical operations",
        requires_key: false,
        key_hint: None,
    },
];

/// Connection status shown as a badge in the Tools panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    Connected,
    Disconnected,
}

impl CapabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityStatus::Connected => "Connected",
            CapabilityStatus::Disconnected => "Disconnected",
        }
    }
}

/// One capability plus its runtime state.
#[derive(Debug, Clone)]
pub struct Capability {
    pub def: CapabilityDef,
    pub enabled: bool,
    pub key_saved: bool,
}

impl Capability {
    /// A capability is connected once its key requirement is satisfied,
    /// independently of whether it is switched on.
    pub fn status(&self) -> CapabilityStatus {
        if !self.def.requires_key || self.key_saved {
            CapabilityStatus::Connected
        } else {
            CapabilityStatus::Disconnected
        }
    }
}

#[derive(Debug)]
pub enum CapabilityError {
    UnknownCapability(String),
    /// Enabling was rejected because no key is saved for the capability.
    KeyRequired { display_name: &'static str },
    /// An empty key was submitted for saving.
    EmptyKey,
    Store(StoreError),
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::UnknownCapability(id) => {
                write!(f, "unknown capability: {id}")
            }
            CapabilityError::KeyRequired { display_name } => {
                write!(
                    f,
                    "Please enter an API key for {display_name} before enabling."
                )
            }
            CapabilityError::EmptyKey => write!(f, "Please enter a valid API key."),
            CapabilityError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CapabilityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CapabilityError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CapabilityError {
    fn from(err: StoreError) -> Self {
        CapabilityError::Store(err)
    }
}

/// Id-keyed table of capabilities backed by the settings store.
pub struct CapabilityRegistry {
    store: Arc<dyn SettingsStore>,
    entries: Vec<Capability>,
}

impl CapabilityRegistry {
    /// Load the builtin table, restoring enabled flags and key presence
    /// from the store.
    pub fn load(store: Arc<dyn SettingsStore>) -> Result<Self, StoreError> {
        let mut entries = Vec::with_capacity(BUILTIN_CAPABILITIES.len());
        for def in BUILTIN_CAPABILITIES {
            let enabled = store
                .get(&keys::capability_enabled(def.id))?
                .is_some_and(|v| v == "true");
            let key_saved = store.get(&keys::capability_key(def.id))?.is_some();
            entries.push(Capability {
                def: *def,
                enabled,
                key_saved,
            });
        }
        Ok(Self { store, entries })
    }

    pub fn entries(&self) -> &[Capability] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.entries.iter().find(|c| c.def.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Capability, CapabilityError> {
        self.entries
            .iter_mut()
            .find(|c| c.def.id == id)
            .ok_or_else(|| CapabilityError::UnknownCapability(id.to_string()))
    }

    /// Switch a capability on or off.
    ///
    /// Enabling a capability whose key requirement is unmet is rejected
    /// synchronously; nothing is persisted in that case. Disabling is
    /// always allowed. Returns the committed state.
    pub fn set_enabled(&mut self, id: &str, desired: bool) -> Result<bool, CapabilityError> {
        let store = Arc::clone(&self.store);
        let capability = self.get_mut(id)?;

        if desired && capability.def.requires_key && !capability.key_saved {
            return Err(CapabilityError::KeyRequired {
                display_name: capability.def.display_name,
            });
        }

        store.set(
            &keys::capability_enabled(id),
            if desired { "true" } else { "false" },
        )?;
        capability.enabled = desired;
        tracing::info!(capability = id, enabled = desired, "capability toggled");
        Ok(desired)
    }

    /// Save a capability's key.
    ///
    /// The value is trimmed before persisting; an empty submission is
    /// rejected without touching the store. Saving a key marks the
    /// capability connected but does not switch it on.
    pub fn save_key(&mut self, id: &str, value: &str) -> Result<(), CapabilityError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CapabilityError::EmptyKey);
        }

        let store = Arc::clone(&self.store);
        let capability = self.get_mut(id)?;
        store.set(&keys::capability_key(id), trimmed)?;
        capability.key_saved = true;
        tracing::info!(capability = id, "capability key saved");
        Ok(())
    }

    /// The saved key for a capability, for prefilling the panel's field.
    pub fn saved_key(&self, id: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&keys::capability_key(id))
    }

    /// `(display_name, summary)` for every enabled capability, in
    /// definition order. Feeds the system directive verbatim.
    pub fn enabled_summaries(&self) -> Vec<(&'static str, &'static str)> {
        self.entries
            .iter()
            .filter(|c| c.enabled)
            .map(|c| (c.def.display_name, c.def.summary))
            .collect()
    }
}
