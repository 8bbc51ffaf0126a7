pub(crate) mod icons;
pub(crate) mod items;
pub(crate) mod merge;
pub(crate) mod npcs;
pub(crate) mod pipeline;
pub(crate) mod quests;
pub(crate) mod races;
pub(crate) mod recipes;
pub(crate) mod skills;
pub(crate) mod wiki_service;

pub use wiki_service::WikiService;
