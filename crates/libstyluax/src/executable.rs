use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    events::{send_event, Event},
    releases::ReleaseSource,
    Result, StyluaxError,
};

/// Install-info file recorded next to the managed binary.
pub const INSTALL_INFO_FILE: &str = "release.json";

/// Version recorded for the managed binary at install time. This, not the
/// binary's own `--version` output, is what update checks compare against
/// the remote descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallInfo {
    pub version: String,
}

/// Outcome of comparing the installed binary against the remote release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// A user-supplied binary is configured; its version is not our concern.
    CustomBinary,
    UpToDate,
    Outdated { current: String, latest: String },
}

/// Resolves and manages the stylua binary: either a user-configured custom
/// path, or a managed download in the per-user data directory.
pub struct Executable {
    config: Config,
    install_root: PathBuf,
}

impl Executable {
    pub fn new(config: Config) -> Result<Self> {
        let install_root = dirs::data_dir()
            .ok_or_else(|| {
                StyluaxError::Internal("could not determine user data directory".to_string())
            })?
            .join("styluax");
        Ok(Executable {
            config,
            install_root,
        })
    }

    /// Sets the managed install directory.
    pub fn with_install_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.install_root = root.as_ref().to_path_buf();
        self
    }

    /// True when the binary path is user-configured rather than managed.
    pub fn is_custom(&self) -> bool {
        self.config.custom_path().is_some()
    }

    fn managed_path(&self) -> PathBuf {
        self.install_root
            .join(format!("stylua{}", std::env::consts::EXE_SUFFIX))
    }

    /// The path to the binary, if it exists on disk. A configured custom
    /// path always wins over a managed install.
    pub fn path(&self) -> Option<PathBuf> {
        if let Some(custom) = self.config.custom_path() {
            return custom.is_file().then_some(custom);
        }
        let managed = self.managed_path();
        managed.is_file().then_some(managed)
    }

    pub fn check_installed(&self) -> bool {
        self.path().is_some()
    }

    /// The version recorded when the managed binary was installed.
    pub fn installed_version(&self) -> Result<String> {
        let raw = fs_err::read_to_string(self.install_root.join(INSTALL_INFO_FILE))?;
        let info: InstallInfo = serde_json::from_str(&raw)
            .map_err(|e| StyluaxError::Install(format!("invalid install info: {}", e)))?;
        Ok(info.version)
    }

    /// Compare the recorded installed version against the remote release
    /// descriptor. Plain string inequality; no semver interpretation.
    pub async fn check_version(&self, source: &dyn ReleaseSource) -> Result<VersionCheck> {
        if self.is_custom() {
            return Ok(VersionCheck::CustomBinary);
        }
        if !self.check_installed() {
            return Err(StyluaxError::NotInstalled);
        }
        let current = self.installed_version()?;
        let latest = source.fetch(&self.config.channel()).await?.version;
        if current != latest {
            Ok(VersionCheck::Outdated { current, latest })
        } else {
            Ok(VersionCheck::UpToDate)
        }
    }

    /// Download and install the release for the configured channel,
    /// replacing any existing managed binary and recording its version.
    pub async fn install(
        &self,
        source: &dyn ReleaseSource,
        sender: &Option<mpsc::Sender<Event>>,
    ) -> Result<PathBuf> {
        let release = source.fetch(&self.config.channel()).await?;
        send_event(sender, Event::InstallStart(release.version.clone()))?;
        let asset = release.platform_asset().ok_or_else(|| {
            StyluaxError::Install(format!(
                "release {} has no artifact for this platform",
                release.version
            ))
        })?;
        let archive = source.fetch_asset(asset).await?;
        let binary = extract_binary(&archive)?;

        fs_err::create_dir_all(&self.install_root)?;
        let path = self.managed_path();
        fs_err::write(&path, &binary)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs_err::metadata(&path)?.permissions();
            perms.set_mode(0o755);
            fs_err::set_permissions(&path, perms)?;
        }

        let info = InstallInfo {
            version: release.version.clone(),
        };
        let raw = serde_json::to_string_pretty(&info)
            .map_err(|e| StyluaxError::Internal(e.to_string()))?;
        fs_err::write(self.install_root.join(INSTALL_INFO_FILE), raw)?;

        send_event(sender, Event::InstallEnd(path.display().to_string()))?;
        Ok(path)
    }
}

/// Pull the stylua executable out of a release zip archive.
fn extract_binary(archive: &[u8]) -> Result<Vec<u8>> {
    let exe_name = format!("stylua{}", std::env::consts::EXE_SUFFIX);
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| StyluaxError::Install(format!("could not open release archive: {}", e)))?;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| StyluaxError::Install(e.to_string()))?;
        let name = entry.name().to_string();
        let file_name = Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        if file_name.as_deref() == Some(exe_name.as_str()) {
            let mut bytes = Vec::new();
            std::io::copy(&mut entry, &mut bytes)?;
            return Ok(bytes);
        }
    }
    Err(StyluaxError::Install(
        "no stylua executable in release archive".to_string(),
    ))
}
