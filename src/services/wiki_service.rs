use super::pipeline::PageSource;
use super::{icons, items, merge, npcs, quests, races, recipes, skills};
use crate::config::cli::{Command, RaceStage, SkillStage, Stage};
use crate::config::{Config, RunSettings};
use crate::domain::storage::Storage;
use crate::error::Result;
use crate::infrastructure::WikiClient;
use std::sync::Arc;
use tracing::info;

pub struct WikiService {
    config: Config,
    store: Arc<dyn Storage>,
    source: PageSource,
    settings: RunSettings,
}

impl WikiService {
    pub fn new(config: Config, store: Arc<dyn Storage + 'static>) -> Self {
        let settings = config.settings();
        let client = Arc::new(WikiClient::new(
            config.http_client.clone(),
            &config.args.base_url,
            settings.wait,
        ));
        let source = PageSource::new(client, store.clone(), &settings);

        Self {
            config,
            store,
            source,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn source(&self) -> &PageSource {
        &self.source
    }

    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    pub fn base_url(&self) -> &str {
        self.source.client().base_url()
    }

    pub fn icon_base_url(&self) -> &str {
        &self.config.args.icon_base_url
    }

    pub async fn run(&self) -> Result<()> {
        let command = self.config.args.command.clone();
        info!("Running {:?} for {}", command, self.settings.chronicle);

        if self.config.args.switch_server && !matches!(command, Command::Merge { .. }) {
            self.source
                .client()
                .switch_server(&self.settings.chronicle, !self.config.args.server_only)
                .await?;
        }

        match command {
            Command::Items { stage: Stage::List } => items::list(self).await,
            Command::Items { stage: Stage::Details } => items::details(self).await,
            Command::Npcs { stage: Stage::List } => npcs::list(self).await,
            Command::Npcs { stage: Stage::Details } => npcs::details(self).await,
            Command::Quests { stage: Stage::List } => quests::list(self).await,
            Command::Quests { stage: Stage::Details } => quests::details(self).await,
            Command::Recipes { stage: Stage::List } => recipes::list(self).await,
            Command::Recipes { stage: Stage::Details } => recipes::details(self).await,
            Command::Skills { stage } => match stage {
                SkillStage::List => skills::list(self).await,
                SkillStage::Details => skills::details(self).await,
                SkillStage::Icons => icons::download(self).await,
            },
            Command::Races { stage } => match stage {
                RaceStage::List => races::list(self).await,
                RaceStage::Details => races::details(self).await,
                RaceStage::Skills => races::skills(self).await,
                RaceStage::Split => races::split(self).await,
            },
            Command::Merge { stem, key } => {
                let report = merge::merge_checkpoints(&self.config.args.data_dir, &stem, &key)?;
                info!(
                    "Merged {} checkpoint files into {}",
                    report.files,
                    report.output.display()
                );
                Ok(())
            }
        }
    }
}
