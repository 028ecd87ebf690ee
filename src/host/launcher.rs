//! Built-in app that lists the registered apps

use log::{debug, info};

use crate::config::LAUNCHER_FIRST_KEY;
use crate::image::KeyImage;
use crate::sprites;
use crate::types::EdgeFrame;

use super::app::{App, AppContext, AppResult};

/// Icon and name of one registered app, captured when the launcher is built
#[derive(Clone, Debug)]
pub(crate) struct LauncherEntry {
    pub name: String,
    pub icon: KeyImage,
}

/// Home screen: one key per registered app, starting at key 1
pub(crate) struct Launcher {
    entries: Vec<LauncherEntry>,
    /// Logical key -> app index
    slots: Vec<(usize, usize)>,
}

impl Launcher {
    pub fn new(entries: Vec<LauncherEntry>) -> Self {
        Self {
            entries,
            slots: Vec::new(),
        }
    }

    /// App index assigned to logical `key`
    pub fn app_at(&self, key: usize) -> Option<usize> {
        self.slots
            .iter()
            .find(|&&(slot, _)| slot == key)
            .map(|&(_, app)| app)
    }
}

impl App for Launcher {
    fn name(&self) -> &str {
        "Launcher"
    }

    fn icon(&self, size: u32) -> KeyImage {
        sprites::clear(size)
    }

    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult {
        self.slots.clear();
        let capacity = ctx.key_count().saturating_sub(LAUNCHER_FIRST_KEY);
        if self.entries.len() > capacity {
            info!(
                "Launcher shows {} of {} apps",
                capacity,
                self.entries.len()
            );
        }

        for (index, entry) in self.entries.iter().take(capacity).enumerate() {
            let key = LAUNCHER_FIRST_KEY + index;
            ctx.set_key(key, &entry.icon);
            self.slots.push((key, index));
            debug!("Launcher: '{}' on key {}", entry.name, key);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut AppContext<'_>, frame: &EdgeFrame) -> AppResult {
        if let Some(index) = frame.releases().find_map(|key| self.app_at(key)) {
            info!("Launcher: starting '{}'", self.entries[index].name);
            ctx.launch(index);
        }
        Ok(())
    }
}
