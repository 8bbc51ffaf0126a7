use super::pipeline::list_table;
use super::skills::list_output;
use super::wiki_service::WikiService;
use crate::domain::storage::StorageKeys;
use crate::domain::SkillListEntry;
use crate::error::{Result, ScrapeError};
use crate::infrastructure::export::{read_records, TableFormat};
use crate::infrastructure::WikiClient;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const ATTEMPTS: usize = 3;

/// Distinct main and panel icon names of the selected skills, in list order.
fn icon_names(entries: &[SkillListEntry], offset: usize, limit: Option<usize>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let selected = entries
        .iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX));

    for entry in selected {
        let candidates = [Some(entry.skill_icon.as_str()), entry.skill_icon_panel.as_deref()];
        for name in candidates.into_iter().flatten().map(str::trim) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn already_downloaded(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Up to [`ATTEMPTS`] downloads, pausing between them.
async fn fetch_icon(client: &WikiClient, url: &str, wait: Duration) -> Option<Vec<u8>> {
    for attempt in 1..=ATTEMPTS {
        match client.download(url).await {
            Ok(bytes) => return Some(bytes),
            Err(e) => warn!("Icon {url} attempt {attempt}/{ATTEMPTS} failed: {e}"),
        }
        if attempt < ATTEMPTS {
            sleep(wait).await;
        }
    }
    None
}

pub async fn download(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<SkillListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    let names = icon_names(&entries, settings.offset, settings.limit);
    info!("{} icons referenced by {} skills", names.len(), entries.len());

    let dir = service.store().data_path(StorageKeys::ICONS_DIR);
    fs::create_dir_all(&dir)?;
    let base = service.icon_base_url().trim_end_matches('/');

    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| ScrapeError::Other(e.to_string()))?,
    );

    let (mut fetched, mut existing, mut failed) = (0usize, 0usize, 0usize);
    for name in &names {
        pb.set_message(name.clone());
        let path = dir.join(format!("{name}.png"));

        if already_downloaded(&path) {
            debug!("Icon {name} already exists");
            existing += 1;
            pb.inc(1);
            continue;
        }

        let url = format!("{base}/{name}.png");
        match fetch_icon(service.source().client(), &url, settings.wait).await {
            Some(bytes) => {
                fs::write(&path, bytes)?;
                fetched += 1;
            }
            None => failed += 1,
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!("{fetched} downloaded, {existing} present, {failed} failed"));
    Ok(())
}
