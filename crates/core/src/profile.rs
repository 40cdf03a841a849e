//! AFDO text profiles as ordered function-name -> blob maps.
//!
//! A text profile is a sequence of records. Each record starts with a header
//! line of the form `<function>:<rest>` and continues with any number of
//! lines indented by a space. The blob stored for a function is everything
//! after the name, leading colon included, so that `key + value` reproduces
//! the record exactly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Ordered mapping from function name to its opaque profile blob.
///
/// Keys are unique; insertion order is preserved because some profile
/// consumers are order-sensitive.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a function's blob.
    ///
    /// Replacing keeps the key at its original position.
    pub fn insert(&mut self, name: impl Into<String>, blob: impl Into<String>) {
        let name = name.into();
        let blob = blob.into();
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = blob,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, blob));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Function names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, blob)| (name.as_str(), blob.as_str()))
    }

    /// Names present in `self` but not in `other`, in `self`'s order.
    pub fn names_missing_from<'a>(&'a self, other: &'a Profile) -> impl Iterator<Item = &'a str> {
        self.names().filter(move |name| !other.contains(name))
    }

    /// Build a hybrid: a copy of `self` with each of `names` overwritten by
    /// its blob in `donor`. Names absent from `donor` are left untouched.
    pub fn with_substitutions<'a, I>(&self, donor: &Profile, names: I) -> Profile
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hybrid = self.clone();
        for name in names {
            if let Some(blob) = donor.get(name) {
                hybrid.insert(name, blob);
            }
        }
        hybrid
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Profile {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Profile {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut profile = Profile::new();
        for (name, blob) in iter {
            profile.insert(name, blob);
        }
        profile
    }
}

fn split_header(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(' ') {
        return None;
    }
    line.split_once(':').filter(|(name, _)| !name.trim().is_empty())
}

/// Parse profile text into a [`Profile`].
///
/// Never fails: text without header lines yields an empty map, and stray
/// continuation lines before the first header are dropped.
pub fn text_to_profile_map(text: &str) -> Profile {
    let mut profile = Profile::new();
    let mut current: Option<(String, String)> = None;

    for line in text.split_inclusive('\n') {
        match split_header(line) {
            Some((name, rest)) => {
                if let Some((prev_name, prev_blob)) = current.take() {
                    profile.insert(prev_name, prev_blob);
                }
                let mut blob = String::with_capacity(rest.len() + 1);
                blob.push(':');
                blob.push_str(rest);
                current = Some((name.trim().to_string(), blob));
            }
            None => {
                if let Some((_, blob)) = current.as_mut() {
                    blob.push_str(line);
                }
            }
        }
    }

    if let Some((name, blob)) = current {
        profile.insert(name, blob);
    }
    profile
}

/// Serialize a [`Profile`] back to text, concatenating `name + blob` in order.
pub fn profile_map_to_text(profile: &Profile) -> String {
    let mut text = String::new();
    for (name, blob) in profile.iter() {
        text.push_str(name);
        text.push_str(blob);
    }
    text
}

/// Historical name for [`text_to_profile_map`]; the result is a plain map.
pub fn text_to_json(text: &str) -> Profile {
    text_to_profile_map(text)
}

/// Historical name for [`profile_map_to_text`].
pub fn json_to_text(profile: &Profile) -> String {
    profile_map_to_text(profile)
}

/// Read and parse a text profile from disk.
pub fn read_profile_file(path: &Path) -> Result<Profile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile at {}", path.display()))?;
    Ok(text_to_profile_map(&text))
}

/// Serialize a profile to disk in text form.
pub fn write_profile_file(path: &Path, profile: &Profile) -> Result<()> {
    fs::write(path, profile_map_to_text(profile))
        .with_context(|| format!("Failed to write profile to {}", path.display()))
}
