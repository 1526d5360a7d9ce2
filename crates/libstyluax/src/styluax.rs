use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    config::{find_workspace_root, Config},
    document::{byte_offset, full_range, Document, Range, TextEdit},
    events::{send_event, Event, LogLevel},
    executable::{Executable, VersionCheck},
    formatter,
    ignore_file::check_ignored,
    releases::{GithubReleases, ReleaseSource},
    Result,
};

/// Styluax wires an editor buffer to the stylua binary: it resolves the
/// binary, gates requests on workspace ignore rules, translates positions
/// into byte offsets, and turns formatter output into a single full-document
/// replacement edit.
pub struct Styluax {
    config: Config,
    executable: Executable,
    source: Arc<dyn ReleaseSource>,
    sender: Option<mpsc::Sender<Event>>,
}

impl Styluax {
    /// Creates a new Styluax over the GitHub release source.
    pub fn new(config: Config, sender: Option<mpsc::Sender<Event>>) -> Result<Self> {
        let source = Arc::new(GithubReleases::new(config.repo.clone()));
        Self::with_source(config, source, sender)
    }

    /// Creates a new Styluax with an explicit release source.
    pub fn with_source(
        config: Config,
        source: Arc<dyn ReleaseSource>,
        sender: Option<mpsc::Sender<Event>>,
    ) -> Result<Self> {
        let executable = Executable::new(config.clone())?;
        Ok(Styluax {
            config,
            executable,
            source,
            sender,
        })
    }

    /// Sets the managed install directory.
    pub fn with_install_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.executable = self.executable.with_install_root(root);
        self
    }

    /// True when a usable binary is resolvable.
    pub fn check_installed(&self) -> bool {
        self.executable.check_installed()
    }

    /// Host startup flow: prompt for installation when the binary is
    /// missing, otherwise check for a newer release when configured to.
    /// Remote failures are reported and never block formatting.
    pub async fn startup(&self) -> Result<()> {
        if !self.executable.check_installed() {
            send_event(
                &self.sender,
                Event::Log(LogLevel::Info, "stylua not found".to_string()),
            )?;
            send_event(
                &self.sender,
                Event::NotInstalled {
                    installable: !self.executable.is_custom(),
                },
            )?;
            return Ok(());
        }
        if self.config.check_update {
            match self.executable.check_version(self.source.as_ref()).await {
                Ok(VersionCheck::Outdated { current, latest }) => {
                    send_event(&self.sender, Event::UpdateAvailable { current, latest })?;
                }
                Ok(_) => {}
                Err(e) => {
                    send_event(
                        &self.sender,
                        Event::Log(LogLevel::Warn, format!("failed to fetch update: {}", e)),
                    )?;
                    send_event(
                        &self.sender,
                        Event::Warning(format!("Failed to fetch update for stylua: {}", e)),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Check the installed binary against the remote release descriptor.
    pub async fn check_version(&self) -> Result<VersionCheck> {
        self.executable.check_version(self.source.as_ref()).await
    }

    /// Install or reinstall the configured release.
    pub async fn install(&self) -> Result<PathBuf> {
        self.executable
            .install(self.source.as_ref(), &self.sender)
            .await
    }

    /// Format an entire document. `path` is the document's file path, used
    /// for workspace-root resolution and ignore matching.
    pub async fn format_document(
        &self,
        document: &dyn Document,
        path: Option<&Path>,
    ) -> Result<Vec<TextEdit>> {
        self.format_range(document, path, full_range(document))
            .await
    }

    /// Format a sub-range of a document, returning a full-document
    /// replacement edit. Failures are reported over the event channel and
    /// yield an empty edit set, so the buffer is never touched on failure.
    pub async fn format_range(
        &self,
        document: &dyn Document,
        path: Option<&Path>,
        range: Range,
    ) -> Result<Vec<TextEdit>> {
        let display_path = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<buffer>".to_string());

        let Some(stylua_path) = self.executable.path() else {
            send_event(
                &self.sender,
                Event::Log(LogLevel::Info, "stylua not found".to_string()),
            )?;
            send_event(
                &self.sender,
                Event::NotInstalled {
                    installable: !self.executable.is_custom(),
                },
            )?;
            return Ok(vec![]);
        };

        // Log the binary's own version without holding up the request.
        {
            let sender = self.sender.clone();
            let stylua_path = stylua_path.clone();
            tokio::spawn(async move {
                match formatter::binary_version(&stylua_path).await {
                    Ok(version) => {
                        let _ = send_event(
                            &sender,
                            Event::Log(LogLevel::Info, format!("stylua version: {}", version)),
                        );
                    }
                    Err(e) => {
                        let _ = send_event(
                            &sender,
                            Event::Log(
                                LogLevel::Debug,
                                format!("could not read stylua version: {}", e),
                            ),
                        );
                    }
                }
            });
        }

        let workspace_root = path.and_then(|p| p.parent()).and_then(find_workspace_root);

        if check_ignored(&self.sender, path, workspace_root.as_deref()) {
            send_event(&self.sender, Event::Ignored(display_path))?;
            return Ok(vec![]);
        }

        send_event(&self.sender, Event::FormatStart(display_path.clone()))?;
        let start = byte_offset(document, range.start);
        let end = byte_offset(document, range.end);
        debug!("format range bytes {}..{}", start, end);

        let formatted = match formatter::format_code(
            &stylua_path,
            document.text(),
            workspace_root.as_deref(),
            Some(start),
            Some(end),
            self.config.formatter_config_path().as_deref(),
        )
        .await
        {
            Ok(formatted) => formatted,
            Err(e) => {
                send_event(
                    &self.sender,
                    Event::Log(LogLevel::Error, format!("Could not format file: {}", e)),
                )?;
                send_event(&self.sender, Event::Fatal(format!("Could not format file: {}", e)))?;
                return Ok(vec![]);
            }
        };

        // Always replace the whole document rather than computing a minimal
        // diff, so a stale incremental patch can never be applied.
        let edit = TextEdit::replace(full_range(document), formatted);
        send_event(&self.sender, Event::FormatEnd(display_path))?;
        Ok(vec![edit])
    }
}
