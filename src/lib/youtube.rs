//! Resolving user queries with yt-dlp.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::ResolveError;
use crate::player::{Origin, Track, TrackInfo, TrackResolver};

/// A [TrackResolver] that runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// Path or name of the executable.
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs yt-dlp and parses its json output.
    /// `flat` skips resolving the entries of playlists and searches.
    /// Returns `None` if yt-dlp printed nothing.
    async fn extract(&self, uri: &str, flat: bool) -> Result<Option<Value>, ResolveError> {
        let mut args = vec!["-J", "--no-warnings", "--ignore-config"];
        if flat {
            args.push("--flat-playlist");
        } else {
            args.extend(["-f", "bestaudio/best", "--no-playlist"]);
        }
        args.push(uri);

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            if output.status.success() {
                return Ok(None);
            }
            let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ResolveError::Extractor { reason });
        }

        // Playlists can get big, don't parse them on the runtime.
        let value = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Value>(&output.stdout)
        })
        .await??;

        Ok(Some(value).filter(|v| !v.is_null()))
    }
}

#[async_trait]
impl TrackResolver for YtDlp {
    #[instrument(err, skip(self, origin))]
    async fn resolve(&self, query: &str, origin: Origin) -> Result<Track, ResolveError> {
        let not_found = || ResolveError::NotFound {
            query: query.to_string(),
        };

        // First a cheap lookup, for searches and playlists this only lists entries.
        let lookup = self.extract(&lookup_uri(query), true).await?;
        let entry = lookup.and_then(first_entry).ok_or_else(not_found)?;
        let page_url = page_url(&entry).ok_or_else(not_found)?;

        // Then the full metadata of the chosen entry, which has the stream url.
        tracing::debug!("Resolving {page_url}");
        let processed = self.extract(&page_url, false).await?;
        let info = processed.and_then(first_entry).ok_or_else(not_found)?;

        let info: TrackInfo = serde_json::from_value(info)?;
        Track::new(info, origin)
    }
}

/// Urls are given to yt-dlp as is, anything else is searched on youtube.
fn lookup_uri(query: &str) -> String {
    let query = query.trim();
    match url::Url::parse(query) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => query.to_string(),
        _ => format!("ytsearch:{query}"),
    }
}

/// A single video is returned as is.
/// For playlists and searches, the first entry that isn't empty.
fn first_entry(value: Value) -> Option<Value> {
    match value {
        Value::Object(mut map) => match map.remove("entries") {
            Some(Value::Array(entries)) => entries.into_iter().find(|entry| !is_empty(entry)),
            Some(_) => None,
            None => Some(Value::Object(map)).filter(|v| !is_empty(v)),
        },
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// The page url of an entry. Flat entries only have `url`.
fn page_url(entry: &Value) -> Option<String> {
    ["webpage_url", "url"]
        .into_iter()
        .find_map(|key| entry.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn searches_non_urls() {
        assert_eq!(lookup_uri("one last kiss"), "ytsearch:one last kiss");
        assert_eq!(
            lookup_uri(" https://youtu.be/0Uhh62MUEic "),
            "https://youtu.be/0Uhh62MUEic"
        );
        // Not a web url, yt-dlp would try to open a file.
        assert_eq!(lookup_uri("file:///etc/passwd"), "ytsearch:file:///etc/passwd");
    }

    #[test]
    fn single_video_is_its_own_entry() {
        let video = json!({ "title": "a", "webpage_url": "https://example.com/a" });
        assert_eq!(first_entry(video.clone()), Some(video));
    }

    #[test]
    fn skips_empty_entries() {
        let search = json!({
            "_type": "playlist",
            "entries": [null, {}, { "url": "https://example.com/b" }, { "url": "https://example.com/c" }]
        });
        let entry = first_entry(search).unwrap();
        assert_eq!(page_url(&entry).as_deref(), Some("https://example.com/b"));
    }

    #[test]
    fn nothing_found() {
        assert_eq!(first_entry(json!({ "entries": [null, null] })), None);
        assert_eq!(first_entry(json!({ "entries": [] })), None);
        assert_eq!(first_entry(json!({})), None);
        assert_eq!(first_entry(Value::Null), None);
    }

    #[test]
    fn prefers_webpage_url() {
        let entry = json!({ "url": "https://cdn.example.com/x", "webpage_url": "https://example.com/x" });
        assert_eq!(page_url(&entry).as_deref(), Some("https://example.com/x"));
        assert_eq!(page_url(&json!({ "title": "x" })), None);
    }

    #[tokio::test]
    async fn missing_executable_is_an_io_error() {
        let resolver = YtDlp::new("definitely-not-yt-dlp-7c1f");
        let origin = crate::player::testing::origin(1);
        let result = resolver.resolve("anything", origin).await;
        assert!(matches!(result, Err(ResolveError::Io(_))));
    }

    /// Runs [YtDlp] against a stand-in executable that prints canned json.
    #[cfg(unix)]
    mod extractor {
        use std::path::{Path, PathBuf};
        use std::sync::OnceLock;

        use serde_json::json;
        use tempfile::TempDir;

        use super::*;
        use crate::player::testing;

        /// Prints `flat.json` or `full.json` from the directory it is called from
        /// and appends the uri it was given to `uris`.
        const SCRIPT: &str = r#"#!/bin/sh
dir=$(dirname "$0")
for uri; do :; done
echo "$uri" >> "$dir/uris"
case " $* " in
  *" --flat-playlist "*) exec cat "$dir/flat.json" ;;
  *) exec cat "$dir/full.json" ;;
esac
"#;

        /// The script is written once and linked into each test's directory,
        /// executing a file another thread is still writing fails.
        fn script() -> &'static Path {
            static SCRIPT_DIR: OnceLock<TempDir> = OnceLock::new();
            let dir = SCRIPT_DIR.get_or_init(|| {
                use std::os::unix::fs::PermissionsExt;

                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("yt-dlp");
                std::fs::write(&path, SCRIPT).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
                dir
            });
            dir.path()
        }

        struct FakeYtDlp {
            dir: TempDir,
            resolver: YtDlp,
        }

        impl FakeYtDlp {
            /// `None` leaves the file out, making `cat` fail.
            fn new(flat: Option<&str>, full: Option<&str>) -> Self {
                let dir = tempfile::tempdir().unwrap();
                let program: PathBuf = dir.path().join("yt-dlp");
                std::os::unix::fs::symlink(script().join("yt-dlp"), &program).unwrap();
                for (name, content) in [("flat.json", flat), ("full.json", full)] {
                    if let Some(content) = content {
                        std::fs::write(dir.path().join(name), content).unwrap();
                    }
                }

                let resolver = YtDlp::new(program.display().to_string());
                Self { dir, resolver }
            }

            /// Uris yt-dlp was called with, in order.
            fn uris(&self) -> Vec<String> {
                std::fs::read_to_string(self.dir.path().join("uris"))
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect()
            }

            async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
                self.resolver.resolve(query, testing::origin(7)).await
            }
        }

        fn search_results() -> String {
            json!({
                "_type": "playlist",
                "entries": [
                    null,
                    { "title": "One Last Kiss", "url": "https://www.youtube.com/watch?v=0Uhh62MUEic" },
                    { "title": "Beautiful World", "url": "https://www.youtube.com/watch?v=other" },
                ]
            })
            .to_string()
        }

        fn video() -> serde_json::Value {
            json!({
                "title": "One Last Kiss",
                "uploader": "Hikaru Utada",
                "duration": 252.0,
                "webpage_url": "https://www.youtube.com/watch?v=0Uhh62MUEic",
                "url": "https://rr1.example.com/audio",
            })
        }

        #[tokio::test]
        async fn resolves_first_search_result() {
            let fake = FakeYtDlp::new(Some(&search_results()), Some(&video().to_string()));

            let track = fake.resolve("one last kiss").await.unwrap();
            assert_eq!(track.title, "One Last Kiss");
            assert_eq!(track.stream_url, "https://rr1.example.com/audio");
            assert_eq!(track.requester, crate::serenity::UserId::new(7));

            // The chosen entry is extracted again by its page url.
            assert_eq!(
                fake.uris(),
                [
                    "ytsearch:one last kiss",
                    "https://www.youtube.com/watch?v=0Uhh62MUEic"
                ]
            );
        }

        #[tokio::test]
        async fn empty_lookup_is_not_found() {
            let fake = FakeYtDlp::new(Some(""), Some(&video().to_string()));

            let result = fake.resolve("nothing at all").await;
            assert!(matches!(result, Err(ResolveError::NotFound { .. })));
            assert_eq!(fake.uris(), ["ytsearch:nothing at all"]);
        }

        #[tokio::test]
        async fn empty_extraction_is_not_found() {
            let fake = FakeYtDlp::new(Some(&search_results()), Some(r#"{ "entries": [] }"#));

            let result = fake.resolve("one last kiss").await;
            assert!(matches!(result, Err(ResolveError::NotFound { .. })));
            assert_eq!(fake.uris().len(), 2);
        }

        #[tokio::test]
        async fn extraction_without_stream_is_rejected() {
            let mut info = video();
            info.as_object_mut().unwrap().remove("url");
            let fake = FakeYtDlp::new(Some(&search_results()), Some(&info.to_string()));

            let result = fake.resolve("one last kiss").await;
            assert!(matches!(result, Err(ResolveError::NoStream { .. })));
        }

        #[tokio::test]
        async fn links_are_not_searched() {
            let link = "https://www.youtube.com/watch?v=0Uhh62MUEic";
            let fake = FakeYtDlp::new(Some(&video().to_string()), Some(&video().to_string()));

            let track = fake.resolve(link).await.unwrap();
            assert_eq!(track.url, link);
            assert_eq!(fake.uris(), [link, link]);
        }

        #[tokio::test]
        async fn failing_extractor_reports_stderr() {
            let fake = FakeYtDlp::new(None, None);

            let result = fake.resolve("one last kiss").await;
            match result {
                Err(ResolveError::Extractor { reason }) => assert!(reason.contains("flat.json")),
                other => panic!("expected an extractor error, got {other:?}"),
            }
        }
    }
}
