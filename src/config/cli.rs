use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Wiki site root used for listing and detail pages
    #[arg(long, global = true, env = "MW2_BASE_URL", default_value = "https://wiki.mw2.wiki")]
    pub base_url: String,

    /// Base URL that skill icons are downloaded from
    #[arg(long, global = true, default_value = "https://wikipedia1.mw2.wiki/icon64/")]
    pub icon_base_url: String,

    /// Directory to store output tables and XML
    #[arg(long, global = true, env = "MW2_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for cached HTML pages
    #[arg(long, global = true, env = "MW2_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Server id (1=eternal, 2=interlude, 10=lu4, 11=lu4 pink)
    #[arg(long, global = true, default_value_t = 10)]
    pub server: u32,

    /// Chronicle name; derived from --server when omitted
    #[arg(long, global = true)]
    pub chronicle: Option<String>,

    /// Switch the wiki session to --server before scraping
    #[arg(long, global = true)]
    pub switch_server: bool,

    /// With --switch-server, select only the server and keep the session's chronicle
    #[arg(long, global = true)]
    pub server_only: bool,

    /// Rows requested per listing page
    #[arg(long, global = true, default_value_t = 1000)]
    pub page_size: u32,

    /// Maximum number of listing pages to visit
    #[arg(long, global = true, default_value_t = 999)]
    pub max_pages: u32,

    /// Skip the first N list entries
    #[arg(long, global = true, default_value_t = 0)]
    pub offset: usize,

    /// Process at most N list entries (races: N races of the class tree)
    #[arg(long, global = true)]
    pub limit: Option<usize>,

    /// Pause after every network fetch, in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    pub wait_ms: u64,

    /// Write a checkpoint table every N records
    #[arg(long, global = true, default_value_t = 50)]
    pub checkpoint_every: usize,

    /// Skip using cached pages
    #[arg(long, global = true)]
    pub skip_cache: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Items: search listing and detail pages
    Items {
        #[command(subcommand)]
        stage: Stage,
    },
    /// NPCs: search listing and detail pages
    Npcs {
        #[command(subcommand)]
        stage: Stage,
    },
    /// Quests: search listing and detail pages
    Quests {
        #[command(subcommand)]
        stage: Stage,
    },
    /// Recipes: search listing and detail pages
    Recipes {
        #[command(subcommand)]
        stage: Stage,
    },
    /// Skills: listing, per-level details and icons
    Skills {
        #[command(subcommand)]
        stage: SkillStage,
    },
    /// Races and classes: listing, details, class skills and per-class split
    Races {
        #[command(subcommand)]
        stage: RaceStage,
    },
    /// Merge checkpoint tables into one deduplicated table
    Merge {
        /// File stem of the checkpoints, e.g. items_details_lu4
        #[arg(long, default_value = "items_details")]
        stem: String,

        /// Column that identifies a record
        #[arg(long, default_value = "item_id")]
        key: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scrape the paginated search listing
    List,
    /// Visit every listed detail page
    Details,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillStage {
    List,
    Details,
    /// Download main and panel icons of the listed skills
    Icons,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceStage {
    List,
    /// Class detail pages plus the race/class tree XML
    Details,
    /// Per-level and summary skills of every class in the tree
    Skills,
    /// Write one XML file per class
    Split,
}
