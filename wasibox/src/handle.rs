//! Preopens, path resolution and handles.
//!
//! The guest can only reach nodes under one of its preopened directory
//! roots. An absolute guest path is matched against the preopen whose
//! visible prefix is the longest match; the remaining components are then
//! normalized (`.` dropped, `..` popped) against that root. Popping past
//! the root is a capability violation, not a lookup failure, and yields
//! `Errno::Notcapable`.

use crate::{
    volume::{DirRef, FileRef, MemVolume, Node, VolumeError},
    writable::WritableStream,
};
use std::sync::Arc;
use wasibox_core::wasi_snapshot_preview1::{Errno, WasiResult};

/// A directory root exposed to the guest at startup.
#[derive(Debug)]
pub struct Preopen {
    name: Vec<u8>,
    name_components: Vec<Vec<u8>>,
    volume: MemVolume,
    root: DirRef,
}

impl Preopen {
    /// Exposes the directory at `dir` of `volume` under the guest-visible
    /// absolute path `guest_path` (`/`-prefixed, no trailing `/` except
    /// for `/` itself, no `.`/`..`).
    pub fn new(
        guest_path: impl Into<Vec<u8>>,
        volume: &MemVolume,
        dir: &[u8],
    ) -> Result<Self, VolumeError> {
        let name = guest_path.into();

        if name.first() != Some(&b'/') || name.contains(&0) {
            return Err(VolumeError::InvalidPath);
        }
        if name.len() > 1 && name.last() == Some(&b'/') {
            return Err(VolumeError::InvalidPath);
        }

        let mut name_components = Vec::new();
        for component in name.split(|&b| b == b'/') {
            match component {
                b"" => {}
                b"." | b".." => return Err(VolumeError::InvalidPath),
                component => name_components.push(component.to_vec()),
            }
        }

        let root = volume.resolve_dir(dir)?;

        Ok(Self {
            name,
            name_components,
            volume: volume.clone(),
            root,
        })
    }

    /// The guest-visible absolute path of this preopen.
    pub fn guest_path(&self) -> &[u8] {
        &self.name
    }

    pub(crate) fn volume(&self) -> &MemVolume {
        &self.volume
    }

    pub(crate) fn root(&self) -> &DirRef {
        &self.root
    }
}

/// A syscall path split into raw components.
#[derive(Debug, Clone)]
pub(crate) struct SplitPath {
    pub(crate) components: Vec<Vec<u8>>,
    pub(crate) absolute: bool,
    /// A trailing `/` forces the final component to be a directory.
    pub(crate) want_dir: bool,
}

/// Splits a guest-supplied path without interpreting `.`/`..`; those are
/// resolved later against a concrete base.
pub(crate) fn split_path(path: &[u8]) -> WasiResult<SplitPath> {
    if path.is_empty() || path.contains(&0) {
        return Err(Errno::Inval);
    }

    let absolute = path[0] == b'/';
    let want_dir = path.len() > 1 && path[path.len() - 1] == b'/';

    let components = path
        .split(|&b| b == b'/')
        .filter(|component| !component.is_empty())
        .map(|component| component.to_vec())
        .collect();

    Ok(SplitPath {
        components,
        absolute,
        want_dir,
    })
}

/// Resolves `.` and `..` in `rel` against `base` (both relative to the
/// same preopen root). Popping past the root escapes the capability and
/// fails with `Notcapable`.
pub(crate) fn normalize(base: &[Vec<u8>], rel: &[Vec<u8>]) -> WasiResult<Vec<Vec<u8>>> {
    let mut resolved = base.to_vec();

    for component in rel {
        match component.as_slice() {
            b"." => {}
            b".." => {
                if resolved.pop().is_none() {
                    return Err(Errno::Notcapable);
                }
            }
            _ => resolved.push(component.clone()),
        }
    }

    Ok(resolved)
}

/// Finds the preopen whose guest-visible prefix is the longest match for
/// the raw components of an absolute path, returning it with the
/// remaining (still unnormalized) components.
pub(crate) fn find_rel_path<'a>(
    preopens: &'a [Arc<Preopen>],
    components: &[Vec<u8>],
) -> WasiResult<(&'a Arc<Preopen>, Vec<Vec<u8>>)> {
    let mut best: Option<(&Arc<Preopen>, usize)> = None;

    for preopen in preopens {
        let prefix = &preopen.name_components;
        let matches = prefix.len() <= components.len()
            && prefix.iter().zip(components).all(|(a, b)| a == b);

        if matches {
            let better = match best {
                Some((_, len)) => prefix.len() > len,
                None => true,
            };
            if better {
                best = Some((preopen, prefix.len()));
            }
        }
    }

    let (preopen, prefix_len) = best.ok_or(Errno::Noent)?;
    Ok((preopen, components[prefix_len..].to_vec()))
}

/// A resolved location: a preopen plus normalized components below its
/// root.
#[derive(Debug, Clone)]
pub(crate) struct Location {
    pub(crate) preopen: Arc<Preopen>,
    pub(crate) path: Vec<Vec<u8>>,
}

impl Location {
    pub(crate) fn volume(&self) -> &MemVolume {
        self.preopen.volume()
    }

    pub(crate) fn root(&self) -> &DirRef {
        self.preopen.root()
    }

    pub(crate) fn file_handle(&self) -> FileHandle {
        FileHandle {
            location: self.clone(),
        }
    }

    pub(crate) fn lookup(&self) -> Result<Node, VolumeError> {
        self.volume().lookup_at(self.root(), &self.path)
    }
}

/// Handle to a (possibly not yet existing) file location.
#[derive(Debug, Clone)]
pub(crate) struct FileHandle {
    location: Location,
}

impl FileHandle {
    /// The existing file node at this location.
    pub(crate) fn get_file(&self) -> Result<FileRef, VolumeError> {
        self.location
            .volume()
            .lookup_file_at(self.location.root(), &self.location.path)
    }

    /// Opens a buffered writer for this location. With `keep_existing`,
    /// the buffer starts from the current content; a missing file starts
    /// empty either way. The content is published when the stream closes.
    pub(crate) fn create_writable(
        &self,
        keep_existing: bool,
    ) -> Result<WritableStream, VolumeError> {
        let initial = if keep_existing {
            match self.get_file() {
                Ok(file) => {
                    let bytes = file.lock().bytes.clone();
                    bytes
                }
                Err(VolumeError::NotFound) => Vec::new(),
                Err(err) => return Err(err),
            }
        } else {
            Vec::new()
        };

        Ok(WritableStream::new(
            self.location.volume().clone(),
            self.location.root().clone(),
            self.location.path.clone(),
            initial,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preopen(name: &str, volume: &MemVolume, dir: &[u8]) -> Arc<Preopen> {
        Arc::new(Preopen::new(name.as_bytes().to_vec(), volume, dir).unwrap())
    }

    #[test]
    fn preopen_names_are_validated() {
        let volume = MemVolume::new();

        assert!(Preopen::new(&b"/"[..], &volume, b"/").is_ok());
        assert!(Preopen::new(&b"/sandbox"[..], &volume, b"/").is_ok());
        assert!(Preopen::new(&b"sandbox"[..], &volume, b"/").is_err());
        assert!(Preopen::new(&b"/sandbox/"[..], &volume, b"/").is_err());
        assert!(Preopen::new(&b"/a/../b"[..], &volume, b"/").is_err());
    }

    #[test]
    fn split_keeps_dot_components_for_normalize() {
        let split = split_path(b"/sandbox/../x/").unwrap();
        assert!(split.absolute);
        assert!(split.want_dir);
        assert_eq!(
            split.components,
            [&b"sandbox"[..], b"..", b"x"]
                .iter()
                .map(|c| c.to_vec())
                .collect::<Vec<_>>()
        );

        assert_eq!(split_path(b""), Err(Errno::Inval));
        assert_eq!(split_path(b"a\0b"), Err(Errno::Inval));
    }

    #[test]
    fn normalize_resolves_dots() {
        let base = vec![b"d".to_vec()];
        let rel = vec![b".".to_vec(), b"x".to_vec(), b"..".to_vec(), b"y".to_vec()];

        assert_eq!(
            normalize(&base, &rel).unwrap(),
            vec![b"d".to_vec(), b"y".to_vec()]
        );
    }

    #[test]
    fn normalize_rejects_escape() {
        assert_eq!(
            normalize(&[], &[b"..".to_vec()]),
            Err(Errno::Notcapable)
        );
        assert_eq!(
            normalize(&[b"d".to_vec()], &[b"..".to_vec(), b"..".to_vec()]),
            Err(Errno::Notcapable)
        );
    }

    #[test]
    fn longest_prefix_wins() {
        let volume = MemVolume::new();
        volume.mkdir(b"/sandbox/nested", true).unwrap();

        let preopens = vec![
            preopen("/sandbox", &volume, b"/sandbox"),
            preopen("/sandbox/nested", &volume, b"/sandbox/nested"),
        ];

        let path = split_path(b"/sandbox/nested/file").unwrap();
        let (matched, rest) = find_rel_path(&preopens, &path.components).unwrap();
        assert_eq!(matched.guest_path(), b"/sandbox/nested");
        assert_eq!(rest, vec![b"file".to_vec()]);

        let path = split_path(b"/sandbox/other").unwrap();
        let (matched, rest) = find_rel_path(&preopens, &path.components).unwrap();
        assert_eq!(matched.guest_path(), b"/sandbox");
        assert_eq!(rest, vec![b"other".to_vec()]);
    }

    #[test]
    fn unmatched_absolute_path_is_noent() {
        let volume = MemVolume::new();
        let preopens = vec![preopen("/sandbox", &volume, b"/")];

        let path = split_path(b"/elsewhere/file").unwrap();
        assert_eq!(
            find_rel_path(&preopens, &path.components).unwrap_err(),
            Errno::Noent
        );
    }
}
