use std::borrow::Cow;
use std::path::Path;

use crate::error::{Error, Result};

/// Blue, green, red, cyan, magenta, yellow (RGB)
pub const DEFAULT_PALETTE: [[u8; 3]; 6] = [
    [0, 0, 255],
    [0, 255, 0],
    [255, 0, 0],
    [0, 255, 255],
    [255, 0, 255],
    [255, 255, 0],
];

/// Display names and colors for the model's class ids.
///
/// Read-only after construction, so one registry can be shared between
/// concurrent pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRegistry {
    names: Vec<String>,
    palette: Vec<[u8; 3]>,
}

impl ClassRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }

    /// Replace the color palette. Colors are RGB triples.
    pub fn with_palette(mut self, palette: Vec<[u8; 3]>) -> Result<Self> {
        if palette.is_empty() {
            return Err(Error::InvalidConfig("palette must not be empty".to_string()));
        }
        self.palette = palette;
        Ok(self)
    }

    /// One class name per line, line number = class id. Blank lines are skipped.
    pub fn from_names_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name; ids the model reports beyond the list get `class {id}`
    pub fn name(&self, class_id: u32) -> Cow<'_, str> {
        match self.names.get(class_id as usize) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("class {}", class_id)),
        }
    }

    /// `palette[class_id mod palette_size]`, as RGB
    pub fn color(&self, class_id: u32) -> [u8; 3] {
        self.palette[class_id as usize % self.palette.len()]
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}
