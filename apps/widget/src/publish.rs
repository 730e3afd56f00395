use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use ticker::Page;
use tracing::{debug, info, warn};

/// Full HTML document for the current page state.
pub fn snapshot(page: &Page, version: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<!-- rendered {} by widget {} -->\n<html>\n<body>\n{}\n</body>\n</html>\n",
        Utc::now().to_rfc3339(),
        version,
        page.to_html()
    )
}

/// Write the snapshot next to `path` first, then rename it into place so
/// readers never see a partial file.
pub async fn write_snapshot(page: &Page, version: &str, path: &Path) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, snapshot(page, version))
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move snapshot to {}", path.display()))?;
    Ok(())
}

/// Write the output file now and again after every render.
pub async fn publish_snapshots(page: Page, version: String, path: PathBuf) {
    let mut revisions = page.subscribe();
    info!(path = %path.display(), "publishing snapshots");

    if let Err(e) = write_snapshot(&page, &version, &path).await {
        warn!(error = ?e, "initial snapshot write failed");
    }

    while revisions.changed().await.is_ok() {
        let revision = *revisions.borrow_and_update();
        match write_snapshot(&page, &version, &path).await {
            Ok(()) => debug!(revision, "snapshot written"),
            Err(e) => warn!(error = ?e, revision, "snapshot write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use ticker::Element;

    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("widget-{name}-{}-{nanos}.html", std::process::id()))
    }

    fn sample_page() -> Page {
        Page::new(vec![
            Element::new("crypto-card")
                .with_attribute("data-symbol", "bitcoin")
                .with_content("<p>USD: $65,000</p>"),
        ])
    }

    #[test]
    fn snapshot_wraps_page_html() {
        let html = snapshot(&sample_page(), "v0.1.0");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("by widget v0.1.0"));
        assert!(html.contains(
            r#"<div class="crypto-card" data-symbol="bitcoin"><p>USD: $65,000</p></div>"#
        ));
    }

    #[tokio::test]
    async fn write_snapshot_replaces_file() {
        let path = scratch_path("write");
        tokio::fs::write(&path, "stale").await.unwrap();

        write_snapshot(&sample_page(), "test", &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("USD: $65,000"));
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn publishes_after_each_render() {
        let page = sample_page();
        let path = scratch_path("publish");
        let task = tokio::spawn(publish_snapshots(page.clone(), "test".into(), path.clone()));

        page.update(|elements| elements[0].content = "<p>USD: $70,000</p>".into());

        let mut written = String::new();
        for _ in 0..200 {
            if let Ok(raw) = tokio::fs::read_to_string(&path).await {
                written = raw;
                if written.contains("$70,000") {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(written.contains("USD: $70,000"));

        task.abort();
        tokio::fs::remove_file(&path).await.ok();
    }
}
