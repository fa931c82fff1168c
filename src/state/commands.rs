use tracing::{debug, warn};
use uuid::Uuid;

use super::data::{OpenCommand, FOLDER_PLACEHOLDER};
use super::settings::SharedSettings;
use crate::error::StoreError;

const COMMANDS_KEY: &str = "openCommands";
const DEFAULT_COMMAND_ID_KEY: &str = "defaultCommandId";

/// Replace every `${folder}` in `template` with `folder`.
///
/// Single pass: a folder path that itself contains `${folder}` is inserted
/// literally and not expanded again. No shell escaping is applied; templates
/// are expected to quote the placeholder themselves (`code "${folder}"`).
pub fn resolve(template: &str, folder: &str) -> String {
    template.replace(FOLDER_PLACEHOLDER, folder)
}

/// The user's open commands, one of which is the default.
///
/// Loaded once from settings at construction; every mutation is written back
/// immediately.
pub struct CommandStore {
    settings: SharedSettings,
    commands: Vec<OpenCommand>,
    default_id: Option<Uuid>,
}

impl CommandStore {
    /// Load the commands from `settings`, seeding the built-in commands when
    /// nothing has been saved yet.
    ///
    /// # Arguments
    /// * `settings` - Store holding the saved list and default id
    ///
    /// # Returns
    /// The loaded store, or an error when the settings cannot be read or the
    /// seeded commands cannot be written.
    pub fn load(settings: SharedSettings) -> Result<Self, StoreError> {
        let commands = match settings.load(COMMANDS_KEY)? {
            Some(bytes) => match serde_json::from_slice::<Vec<OpenCommand>>(&bytes) {
                Ok(commands) => Some(commands),
                Err(e) => {
                    warn!("⚠️  Saved commands are unreadable, restoring defaults: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut store = Self {
            settings,
            commands: Vec::new(),
            default_id: None,
        };

        // Seed only when nothing usable was saved; an empty list stays empty
        match commands {
            Some(commands) => {
                store.commands = commands;
                store.default_id = store.load_default_id()?;
            }
            None => {
                let seeded = OpenCommand::default_commands();
                let default_id = seeded.first().map(|c| c.id);
                store.commit(seeded, default_id)?;
                debug!("🌱 Seeded {} default commands", store.commands.len());
            }
        }

        Ok(store)
    }

    fn load_default_id(&self) -> Result<Option<Uuid>, StoreError> {
        let saved = self
            .settings
            .load(DEFAULT_COMMAND_ID_KEY)?
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok());

        Ok(saved.or_else(|| self.commands.first().map(|c| c.id)))
    }

    /// Write the list and default id together, then adopt them. A failed
    /// write leaves both the store and `self` as they were.
    fn commit(
        &mut self,
        commands: Vec<OpenCommand>,
        default_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&commands)?;
        let default = default_id.map(|id| id.to_string()).unwrap_or_default();
        self.settings.save_many(&[
            (COMMANDS_KEY, json.as_slice()),
            (DEFAULT_COMMAND_ID_KEY, default.as_bytes()),
        ])?;

        self.commands = commands;
        self.default_id = default_id;
        Ok(())
    }

    /// All commands in insertion order
    pub fn list(&self) -> &[OpenCommand] {
        &self.commands
    }

    pub fn get(&self, id: Uuid) -> Option<&OpenCommand> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// The stored default id, which may be unset or point at nothing.
    /// Use [`CommandStore::resolve_default`] to get the effective default.
    pub fn default_id(&self) -> Option<Uuid> {
        self.default_id
    }

    /// Append a new command. The first command ever added becomes the default.
    pub fn add(&mut self, name: &str, template: &str) -> Result<OpenCommand, StoreError> {
        let (name, template) = validate(name, template)?;
        let command = OpenCommand::new(name, template);

        let mut commands = self.commands.clone();
        commands.push(command.clone());
        let default_id = if commands.len() == 1 {
            Some(command.id)
        } else {
            self.default_id
        };
        self.commit(commands, default_id)?;

        debug!("➕ Added command {} ({})", command.name, command.id);
        Ok(command)
    }

    /// Replace name and template in place. Position and default status are kept.
    pub fn update(&mut self, id: Uuid, name: &str, template: &str) -> Result<(), StoreError> {
        let (name, template) = validate(name, template)?;
        let mut commands = self.commands.clone();
        let command = commands
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownCommand(id))?;

        command.name = name;
        command.command_template = template;
        self.commit(commands, self.default_id)
    }

    /// Remove a command. Removing the default hands the role to the new first command.
    pub fn remove(&mut self, id: Uuid) -> Result<OpenCommand, StoreError> {
        let index = self
            .commands
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::UnknownCommand(id))?;

        let mut commands = self.commands.clone();
        let removed = commands.remove(index);
        let default_id = if self.default_id == Some(removed.id) {
            commands.first().map(|c| c.id)
        } else {
            self.default_id
        };
        self.commit(commands, default_id)?;

        debug!("➖ Removed command {} ({})", removed.name, removed.id);
        Ok(removed)
    }

    pub fn set_default(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::UnknownCommand(id));
        }
        self.settings
            .save(DEFAULT_COMMAND_ID_KEY, id.to_string().as_bytes())?;
        self.default_id = Some(id);
        Ok(())
    }

    /// The effective default command.
    ///
    /// Falls back to the first command whenever the stored default is unset or
    /// no longer matches a command, so a stale id never reaches the caller.
    pub fn resolve_default(&self) -> Option<&OpenCommand> {
        self.default_id
            .and_then(|id| self.get(id))
            .or_else(|| self.commands.first())
    }
}

fn validate(name: &str, template: &str) -> Result<(String, String), StoreError> {
    let name = name.trim();
    let template = template.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("name must not be empty".to_string()));
    }
    if template.is_empty() {
        return Err(StoreError::Validation("command must not be empty".to_string()));
    }
    Ok((name.to_string(), template.to_string()))
}
