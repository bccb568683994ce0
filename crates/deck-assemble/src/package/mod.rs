//! Zip package holding the parts of a presentation

pub mod content_types;
pub mod rels;
pub mod xml;

use crate::constants::MAX_PART_BYTES;
use crate::types::*;
use content_types::CONTENT_TYPES_PART;
use rels::{Relationships, rels_part_for, resolve_target};
use std::collections::{BTreeSet, VecDeque};
use std::io::{Cursor, Read, Write};
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

/// All parts of a package in archive order
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_limited(bytes, MAX_PART_BYTES)
    }

    /// Like [`Package::from_bytes`], failing on any part that inflates past
    /// `max_part_bytes`
    pub fn from_bytes_limited(bytes: &[u8], max_part_bytes: u64) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let declared = file.size();
            let data = read_capped(&mut file, declared, max_part_bytes)?.ok_or_else(|| {
                AssembleError::Package(format!("{name} inflates past {max_part_bytes} bytes"))
            })?;
            parts.push((name, data));
        }

        log::debug!("loaded package with {} parts", parts.len());
        Ok(Self { parts })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // Content types first, as consumers expect
        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|(name, _)| name != CONTENT_TYPES_PART));

        for (name, data) in ordered {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// Like [`Package::part`] but a missing part is an error
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| AssembleError::MissingPart(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn set_part(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(part) => part.1 = data,
            None => self.parts.push((name, data)),
        }
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        let idx = self.parts.iter().position(|(n, _)| n == name)?;
        Some(self.parts.remove(idx).1)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// First free name of the form `{prefix}{n}.{ext}`, counting from 1
    pub fn unique_part_name(&self, prefix: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}{n}.{ext}"))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| format!("{prefix}0.{ext}"))
    }

    /// Relationships owned by `part`, empty if it has none
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        match self.part(&rels_part_for(part)) {
            Some(bytes) => Relationships::parse(bytes),
            None => Ok(Relationships::default()),
        }
    }

    /// Remove every part that cannot be reached from the package root.
    ///
    /// Returns the names of the removed parts.
    pub fn sweep_unreachable(&mut self) -> Result<Vec<String>> {
        let mut reachable: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([String::new()]);

        while let Some(part) = queue.pop_front() {
            let rels = self.relationships(&part)?;
            for rel in rels.iter().filter(|rel| !rel.external) {
                let target = resolve_target(&part, &rel.target);
                if self.contains(&target) && reachable.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }

        let keep = |name: &str| {
            name == CONTENT_TYPES_PART
                || reachable.contains(name)
                || owner_of_rels_part(name)
                    .is_some_and(|owner| owner.is_empty() || reachable.contains(&owner))
        };

        let removed: Vec<String> = self
            .part_names()
            .filter(|&name| !keep(name))
            .map(str::to_string)
            .collect();
        self.parts.retain(|(name, _)| keep(name.as_str()));

        if !removed.is_empty() {
            log::debug!("swept {} unreachable parts", removed.len());
        }
        Ok(removed)
    }
}

/// Inverse of [`rels_part_for`]
fn owner_of_rels_part(rels_part: &str) -> Option<String> {
    let file = rels_part.strip_suffix(".rels")?;
    let (dir, file) = match file.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => return None,
    };
    if dir == "_rels" {
        return Some(if file == "." || file.is_empty() {
            String::new()
        } else {
            file.to_string()
        });
    }
    let parent = dir.strip_suffix("/_rels")?;
    Some(format!("{parent}/{file}"))
}

/// Read at most `limit` bytes; `None` when the source holds more.
///
/// `declared` is only a capacity hint, zip headers can lie about it.
pub fn read_capped(reader: impl Read, declared: u64, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let hint = declared.min(limit).min(CAPACITY_HINT_BYTES);
    let mut data = Vec::with_capacity(hint as usize);
    reader.take(limit.saturating_add(1)).read_to_end(&mut data)?;
    Ok((data.len() as u64 <= limit).then_some(data))
}

const CAPACITY_HINT_BYTES: u64 = 8 * 1024 * 1024;
