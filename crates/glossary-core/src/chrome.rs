//! Browser lifecycle management
//!
//! Handles Chrome/Edge discovery, executable registration and launching a
//! CDP-controlled browser tuned for scraping (no images, no extensions,
//! headless unless asked otherwise).

use crate::config::{BrowserConfig, BrowserKind};
use crate::{GlossaryError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig, HeadlessMode};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Flags that keep the browser lean while scraping
const SCRAPING_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--no-first-run",
    "--ignore-certificate-errors",
    "--blink-settings=imagesEnabled=false",
];

/// Handle to a running browser instance
pub struct BrowserHandle {
    pub browser: Browser,
    handle: tokio::task::JoinHandle<()>,
}

impl BrowserHandle {
    /// Close the browser and stop driving its event stream
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| GlossaryError::BrowserError(format!("Failed to close browser: {}", e)));
        let _ = self.browser.wait().await;
        self.handle.abort();
        closed.map(|_| ())
    }
}

/// Point the configuration at a specific browser executable.
///
/// Use this when the browser is installed somewhere discovery does not look.
pub fn register_executable(config: &mut BrowserConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GlossaryError::BrowserNotInstalled(format!(
            "Executable path '{}' does not exist",
            path.display()
        )));
    }
    config.executable = Some(path.to_path_buf());
    info!("Registered {} executable at {:?}", config.kind, path);
    Ok(())
}

/// Resolve the executable to launch: the configured path, or a discovered one
pub fn resolve_executable(config: &BrowserConfig) -> Result<PathBuf> {
    if let Some(ref path) = config.executable {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(GlossaryError::BrowserNotInstalled(format!(
            "Configured {} executable '{}' does not exist",
            config.kind,
            path.display()
        )));
    }

    find_browser(config.kind).ok_or_else(|| {
        GlossaryError::BrowserNotInstalled(format!("{} is not installed on this machine", config.kind))
    })
}

/// Command line flags passed to the browser on launch
pub fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args: Vec<String> = SCRAPING_ARGS.iter().map(|s| s.to_string()).collect();
    if !config.open_browser {
        args.push("--disable-gpu".to_string());
    }
    args
}

/// Windowed when asked for, otherwise Chrome's new headless mode, which
/// renders pages like a regular window does
pub fn headless_mode(config: &BrowserConfig) -> HeadlessMode {
    if config.open_browser {
        HeadlessMode::False
    } else {
        HeadlessMode::New
    }
}

/// Launch a browser for the given configuration
pub async fn launch(config: &BrowserConfig) -> Result<BrowserHandle> {
    let executable = resolve_executable(config)?;
    debug!("Launching {} from {:?}", config.kind, executable);

    let (width, height) = config.window_size;
    let mut builder = CdpConfig::builder()
        .chrome_executable(&executable)
        .headless_mode(headless_mode(config))
        .window_size(width, height)
        .args(launch_args(config));

    if let Some(timeout) = config.page_load_timeout {
        builder = builder.request_timeout(timeout);
    }

    let (browser, mut handler) = Browser::launch(
        builder
            .build()
            .map_err(|e| GlossaryError::BrowserError(e.to_string()))?,
    )
    .await
    .map_err(|e| GlossaryError::BrowserError(format!("Failed to launch browser: {}", e)))?;

    let handle = tokio::spawn(async move {
        while handler.next().await.is_some() {}
    });

    Ok(BrowserHandle { browser, handle })
}

/// Well-known install locations for the given browser on this OS
fn candidate_paths(kind: BrowserKind) -> Vec<&'static str> {
    match kind {
        BrowserKind::Chrome => {
            if cfg!(target_os = "macos") {
                vec![
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                ]
            } else if cfg!(target_os = "linux") {
                vec![
                    "/usr/bin/google-chrome",
                    "/usr/bin/google-chrome-stable",
                    "/usr/bin/chromium",
                    "/usr/bin/chromium-browser",
                    "/snap/bin/chromium",
                ]
            } else if cfg!(target_os = "windows") {
                vec![
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ]
            } else {
                vec![]
            }
        }
        BrowserKind::Edge => {
            if cfg!(target_os = "macos") {
                vec!["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
            } else if cfg!(target_os = "linux") {
                vec![
                    "/usr/bin/microsoft-edge",
                    "/usr/bin/microsoft-edge-stable",
                    "/opt/microsoft/msedge/msedge",
                ]
            } else if cfg!(target_os = "windows") {
                vec![
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ]
            } else {
                vec![]
            }
        }
    }
}

/// Binary names to look up on PATH
fn binary_names(kind: BrowserKind) -> &'static [&'static str] {
    match kind {
        BrowserKind::Chrome => &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
        ],
        BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
    }
}

/// Find the given browser installed on the system
pub fn find_browser(kind: BrowserKind) -> Option<PathBuf> {
    // Check hardcoded paths first
    for candidate in candidate_paths(kind) {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    binary_names(kind)
        .iter()
        .find_map(|name| which::which(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_headless() {
        let config = BrowserConfig::default();
        let args = launch_args(&config);
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--blink-settings=imagesEnabled=false".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
    }

    #[test]
    fn test_launch_args_open_browser() {
        let config = BrowserConfig {
            open_browser: true,
            ..Default::default()
        };
        assert!(!launch_args(&config).contains(&"--disable-gpu".to_string()));
        assert!(matches!(headless_mode(&config), HeadlessMode::False));
    }

    #[test]
    fn test_headless_uses_new_mode() {
        assert!(matches!(
            headless_mode(&BrowserConfig::default()),
            HeadlessMode::New
        ));
    }

    #[test]
    fn test_register_missing_executable() {
        let mut config = BrowserConfig::default();
        let err = register_executable(&mut config, "/definitely/not/a/browser").unwrap_err();
        assert!(matches!(err, GlossaryError::BrowserNotInstalled(_)));
        assert!(config.executable.is_none());
    }

    #[test]
    fn test_register_existing_executable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = BrowserConfig::default();
        register_executable(&mut config, file.path()).unwrap();
        assert_eq!(config.executable.as_deref(), Some(file.path()));
        assert_eq!(resolve_executable(&config).unwrap(), file.path());
    }

    #[test]
    fn test_find_browser() {
        // This test just checks that discovery doesn't panic
        let _chrome = find_browser(BrowserKind::Chrome);
        let _edge = find_browser(BrowserKind::Edge);
    }
}
