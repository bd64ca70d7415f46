use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One installed core found by a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub path: PathBuf,
    pub display_name: String,
    /// Host CPU exposes NEON.
    pub supports_neon: bool,
    /// Library name and notes from the descriptor table, when it has an entry.
    pub library_name: Option<String>,
    pub notes: Option<String>,
}

impl PluginDescriptor {
    /// The association handed to the rest of the application when this core is picked.
    pub fn selection(&self) -> ActiveCore {
        ActiveCore {
            path: self.path.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The currently chosen core: its path and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCore {
    pub path: PathBuf,
    pub display_name: String,
}

/// Receives the core a user picked from a discovery listing.
pub trait CoreSelectionSink {
    fn core_selected(&mut self, core: ActiveCore);
}

impl CoreSelectionSink for Option<ActiveCore> {
    fn core_selected(&mut self, core: ActiveCore) {
        *self = Some(core);
    }
}

/// Entry of the descriptor table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorEntry {
    pub library_name: Option<String>,
    pub display_name: Option<String>,
    pub notes: Option<String>,
}
