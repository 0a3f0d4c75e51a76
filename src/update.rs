// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Background remote-version check.
//!
//! Fire-and-forget: the host supplies the outbound request as a closure,
//! the check runs on its own thread and delivers exactly one
//! [`RemoteVersion`] through a bounded channel. Every failure mode -
//! network error, missing marker line, malformed quoting - collapses to
//! [`RemoteVersion::Unknown`]; the check never reads or mutates context
//! state and never surfaces a hard error.

use crossbeam_channel::{bounded, Receiver};

/// Outcome of a remote version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteVersion {
    /// The remote version string was found.
    Available(String),
    /// The remote version could not be determined.
    Unknown,
}

impl RemoteVersion {
    /// Whether `current` matches the remote version.
    ///
    /// Unknown never matches: hosts treat that as "no update news".
    pub fn matches(&self, current: &str) -> bool {
        matches!(self, RemoteVersion::Available(v) if v == current)
    }
}

/// Extract a version string from a fetched document.
///
/// Scans for the first line containing `marker` and returns the text
/// between the first and last double quote on that line.
pub fn extract_version(body: &str, marker: &str) -> Option<String> {
    let line = body.lines().find(|line| line.contains(marker))?;
    let start = line.find('"')? + 1;
    let end = line.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(line[start..end].to_string())
}

/// Spawn the background check.
///
/// `fetch` performs the single outbound request and returns the response
/// body. The returned receiver yields exactly one message; the thread is
/// detached and bounded by process lifetime, so no cancellation handle
/// exists or is needed.
pub fn spawn_version_check<F>(fetch: F, marker: impl Into<String>) -> Receiver<RemoteVersion>
where
    F: FnOnce() -> std::io::Result<String> + Send + 'static,
{
    let marker = marker.into();
    let (sender, receiver) = bounded(1);

    std::thread::spawn(move || {
        let outcome = match fetch() {
            Ok(body) => match extract_version(&body, &marker) {
                Some(version) => RemoteVersion::Available(version),
                None => RemoteVersion::Unknown,
            },
            Err(err) => {
                tracing::debug!("Version check failed: {err}");
                RemoteVersion::Unknown
            }
        };
        // The host may have gone away; a dead channel is fine.
        let _ = sender.send(outcome);
    });

    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const BODY: &str = r#"
// assembly metadata
[assembly: AssemblyVersion("1.0.0.0")]
[assembly: AssemblyFileVersion("2.6.1.0")]
"#;

    #[test]
    fn test_extract_version() {
        assert_eq!(
            extract_version(BODY, "AssemblyFileVersion"),
            Some("2.6.1.0".to_string())
        );
        assert_eq!(
            extract_version(BODY, "AssemblyVersion"),
            Some("1.0.0.0".to_string())
        );
    }

    #[test]
    fn test_extract_version_missing_marker() {
        assert_eq!(extract_version(BODY, "NoSuchMarker"), None);
        assert_eq!(extract_version("", "AssemblyFileVersion"), None);
    }

    #[test]
    fn test_extract_version_malformed_quotes() {
        assert_eq!(extract_version("ver \"", "ver"), None);
        assert_eq!(extract_version("ver none", "ver"), None);
    }

    #[test]
    fn test_spawn_delivers_version() {
        let rx = spawn_version_check(|| Ok(BODY.to_string()), "AssemblyFileVersion");
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, RemoteVersion::Available("2.6.1.0".to_string()));
        assert!(result.matches("2.6.1.0"));
        assert!(!result.matches("2.6.0.0"));
    }

    #[test]
    fn test_spawn_swallows_fetch_errors() {
        let rx = spawn_version_check(
            || Err(std::io::Error::new(std::io::ErrorKind::Other, "offline")),
            "AssemblyFileVersion",
        );
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, RemoteVersion::Unknown);
        assert!(!result.matches("2.6.1.0"));
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let rx = spawn_version_check(|| Ok(BODY.to_string()), "AssemblyFileVersion");
        drop(rx);
        // The detached thread sends into a dead channel and exits.
        std::thread::sleep(Duration::from_millis(50));
    }
}
