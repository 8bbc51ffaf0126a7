use serde::{Deserialize, Serialize};

const SERVER_NAMES: &[(u32, &str)] = &[(1, "eternal"), (2, "interlude"), (10, "lu4"), (11, "lu4")];

/// Aliases accepted on the command line that are not the canonical URL name.
const NAME_ALIASES: &[(&str, u32)] = &[("lu4_pink", 11)];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chronicle {
    pub server_id: u32,
    pub name: String,
}

impl Chronicle {
    pub fn from_server(server_id: u32) -> Self {
        let name = SERVER_NAMES
            .iter()
            .find(|(id, _)| *id == server_id)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("server_{server_id}"));

        Self { server_id, name }
    }

    /// An explicit chronicle name wins; its server id is looked up when the
    /// name is known, otherwise the given server id is kept.
    pub fn resolve(server_id: u32, name: Option<&str>) -> Self {
        let Some(name) = name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) else {
            return Self::from_server(server_id);
        };

        let known = NAME_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, id)| *id)
            .or_else(|| {
                SERVER_NAMES
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(id, _)| *id)
            });

        Self {
            server_id: known.unwrap_or(server_id),
            name,
        }
    }

    /// URL segment of detail links (`/npc/123-name/<segment>`).
    pub fn url_segment(&self) -> &str {
        match self.name.as_str() {
            "lu4_pink" => "lu4",
            other => other,
        }
    }
}

impl std::fmt::Display for Chronicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (server {})", self.name, self.server_id)
    }
}
