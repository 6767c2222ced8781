use std::collections::BTreeMap;
use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::Error;

/// Every part of a DOCX package, kept as bytes so an output document can be
/// written back with the template's theme, settings, fonts and relationships
/// untouched. Only `word/document.xml` and `word/styles.xml` are regenerated.
#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
    /// `word/document.xml` up to (not including) `<w:body>`: XML declaration,
    /// root start tag with its namespace declarations, `w:background`.
    pub(crate) document_head: String,
    /// Raw final `<w:sectPr>` of the body: page size, margins, header and
    /// footer references.
    pub(crate) section_properties: Option<String>,
}

impl Package {
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, Error> {
        let mut zip = ZipArchive::new(reader)
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;
        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            parts.insert(name, data);
        }
        Ok(Package {
            parts,
            document_head: String::new(),
            section_properties: None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn set(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.parts.insert(name.into(), contents);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Part names in sorted order, which is also the write order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub(crate) fn parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub(crate) fn text(&self, name: &str) -> Result<Option<String>, Error> {
        match self.parts.get(name) {
            Some(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|_| Error::InvalidDocx(format!("{name} is not valid UTF-8"))),
            None => Ok(None),
        }
    }
}
