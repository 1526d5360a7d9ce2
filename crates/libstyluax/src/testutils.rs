use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::releases::{Channel, Release, ReleaseAsset, ReleaseSource};
use crate::{Result, StyluaxError};

/// Write an executable shell script, used as a stand-in stylua binary.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs_err::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs_err::set_permissions(&path, perms).unwrap();
    path
}

/// The executable entry name a release archive must carry on this platform.
pub fn exe_name() -> String {
    format!("stylua{}", std::env::consts::EXE_SUFFIX)
}

/// A release whose artifact list covers all supported platforms.
pub fn release_with_platform_assets(version: &str) -> Release {
    let asset = |name: &str| ReleaseAsset {
        name: name.to_string(),
        download_url: format!("https://example.com/{}", name),
    };
    Release {
        version: version.to_string(),
        assets: vec![
            asset("stylua-win64.zip"),
            asset("stylua-linux.zip"),
            asset("stylua-macos.zip"),
        ],
    }
}

/// Build a zip archive in memory from (name, contents) entries.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Release source serving a fixed descriptor and artifact.
pub struct StubSource {
    release: Release,
    archive: Vec<u8>,
}

impl StubSource {
    pub fn new(release: Release, archive: Vec<u8>) -> Self {
        StubSource { release, archive }
    }
}

#[async_trait]
impl ReleaseSource for StubSource {
    async fn fetch(&self, _channel: &Channel) -> Result<Release> {
        Ok(self.release.clone())
    }

    async fn fetch_asset(&self, _asset: &ReleaseAsset) -> Result<Vec<u8>> {
        Ok(self.archive.clone())
    }
}

/// Release source whose every call fails, for asserting that the remote is
/// not consulted.
pub struct FailingSource;

#[async_trait]
impl ReleaseSource for FailingSource {
    async fn fetch(&self, _channel: &Channel) -> Result<Release> {
        Err(StyluaxError::RemoteFetch("network unreachable".to_string()))
    }

    async fn fetch_asset(&self, _asset: &ReleaseAsset) -> Result<Vec<u8>> {
        Err(StyluaxError::RemoteFetch("network unreachable".to_string()))
    }
}
