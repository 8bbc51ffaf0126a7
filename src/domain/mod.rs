mod chronicle;
mod item;
mod manifest;
mod npc;
mod quest;
mod race;
mod recipe;
mod skill;
pub(crate) mod storage;

pub use chronicle::Chronicle;
pub use item::*;
pub use manifest::RunManifest;
pub use npc::*;
pub use quest::*;
pub use race::*;
pub use recipe::*;
pub use skill::*;
