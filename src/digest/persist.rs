// src/digest/persist.rs
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::app::OutputCfg;
use crate::digest::Digest;

#[derive(Debug, Clone, PartialEq)]
pub struct SavedPaths {
    pub today: PathBuf,
    pub archive: PathBuf,
}

/// Archive file name for a digest date, e.g. `daily-digest-2026-10-19.json`.
pub fn archive_file_name(prefix: &str, date: &str) -> String {
    format!("{prefix}{date}.json")
}

/// Write through a sibling temp file and rename, so readers never see half a file.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}

/// Pretty JSON to the "today" file and to the dated archive file.
pub fn save(digest: &Digest, out: &OutputCfg) -> Result<SavedPaths> {
    fs::create_dir_all(&out.dir)
        .with_context(|| format!("creating output dir {}", out.dir.display()))?;
    let json = serde_json::to_vec_pretty(digest).context("serializing digest")?;

    let today = out.dir.join(&out.today_file);
    let archive = out
        .dir
        .join(archive_file_name(&out.archive_prefix, &digest.date));

    write_atomic(&today, &json).with_context(|| format!("writing {}", today.display()))?;
    write_atomic(&archive, &json).with_context(|| format!("writing {}", archive.display()))?;

    tracing::info!(target: "digest", today = %today.display(), archive = %archive.display(), bytes = json.len(), "digest saved");
    Ok(SavedPaths { today, archive })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_both_files_with_identical_content() {
        let tmp = tempfile::tempdir().unwrap();
        let out = OutputCfg {
            dir: tmp.path().join("nested"),
            ..OutputCfg::default()
        };
        let digest = Digest {
            date: "2026-10-19".into(),
            hebrew_date: "ז׳ בחשון תשפ״ז".into(),
            ..Digest::default()
        };
        let paths = save(&digest, &out).unwrap();
        assert_eq!(paths.archive.file_name().unwrap(), "daily-digest-2026-10-19.json");

        let a = fs::read_to_string(&paths.today).unwrap();
        let b = fs::read_to_string(&paths.archive).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\n  \"date\": \"2026-10-19\""), "pretty printed");
        let back: Digest = serde_json::from_str(&a).unwrap();
        assert_eq!(back, digest);

        let leftovers: Vec<_> = fs::read_dir(&out.dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
