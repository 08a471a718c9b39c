use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::error::{Error, Result};

fn archive_error(path: &Path, detail: impl std::fmt::Display) -> Error {
    Error::io(
        path,
        io::Error::new(io::ErrorKind::InvalidData, detail.to_string()),
    )
}

pub fn is_archive(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    [".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar", ".zip"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
}

pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let filename = archive_path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let open = || File::open(archive_path).map_err(|err| Error::io(archive_path, err));

    if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        Archive::new(GzDecoder::new(open()?))
            .unpack(dest)
            .map_err(|err| Error::io(archive_path, err))?;
    } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
        Archive::new(XzDecoder::new(open()?))
            .unpack(dest)
            .map_err(|err| Error::io(archive_path, err))?;
    } else if filename.ends_with(".tar") {
        Archive::new(open()?)
            .unpack(dest)
            .map_err(|err| Error::io(archive_path, err))?;
    } else if filename.ends_with(".zip") {
        let mut archive =
            ZipArchive::new(open()?).map_err(|err| archive_error(archive_path, err))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|err| archive_error(archive_path, err))?;

            let Some(enclosed) = entry.enclosed_name().map(|path| dest.join(path)) else {
                continue;
            };

            if entry.name().ends_with('/') {
                fs::create_dir_all(&enclosed).map_err(|err| Error::io(&enclosed, err))?;
            } else {
                if let Some(parent) = enclosed.parent() {
                    fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
                }

                let mut outfile = File::create(&enclosed).map_err(|err| Error::io(&enclosed, err))?;
                io::copy(&mut entry, &mut outfile).map_err(|err| Error::io(&enclosed, err))?;
            }
        }
    } else {
        return Err(archive_error(archive_path, "unsupported archive format"));
    }

    Ok(())
}

/// Find `binary` inside an extracted tree, either at the top level or uniquely nested.
pub fn resolve_binary_path(extract_root: &Path, binary: &str) -> Result<PathBuf> {
    let direct = extract_root.join(binary);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(extract_root) {
        let entry = entry.map_err(|err| archive_error(extract_root, err))?;
        if entry.file_type().is_file() && entry.file_name() == binary {
            matches.push(entry.into_path());
            if matches.len() > 1 {
                break;
            }
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(archive_error(
            extract_root,
            format!("binary '{binary}' not found in extracted contents"),
        )),
        _ => Err(archive_error(
            extract_root,
            format!("binary '{binary}' matched multiple files in extracted contents"),
        )),
    }
}

/// Place the tool binary from a downloaded artifact at `root/<binary>`.
///
/// Archives are unpacked into `root`; raw binaries are copied.
pub fn stage_binary(artifact: &Path, asset_name: &str, root: &Path, binary: &str) -> Result<PathBuf> {
    fs::create_dir_all(root).map_err(|err| Error::io(root, err))?;
    let target = root.join(binary);

    if is_archive(asset_name) {
        extract_archive(artifact, root)?;
        let found = resolve_binary_path(root, binary)?;
        if found != target {
            fs::rename(&found, &target).map_err(|err| Error::io(&found, err))?;
        }
    } else {
        fs::copy(artifact, &target).map_err(|err| Error::io(&target, err))?;
    }

    make_executable(&target)?;
    Ok(target)
}

#[cfg(unix)]
pub(crate) fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|err| Error::io(path, err))
}

#[cfg(not(unix))]
pub(crate) fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
