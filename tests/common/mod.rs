#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds small DOCX packages in memory. Starts with `Normal` and the
/// built-in `heading 1`..`heading 4` styles.
pub struct DocxBuilder {
    styles: Vec<String>,
    body: Vec<String>,
    sect_pr: String,
    with_styles: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        let mut styles = vec![
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#
                .to_string(),
        ];
        for level in 1..=4 {
            styles.push(format!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/></w:style>"#
            ));
        }
        DocxBuilder {
            styles,
            body: Vec::new(),
            sect_pr: r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#.to_string(),
            with_styles: true,
        }
    }

    pub fn style(mut self, xml: &str) -> Self {
        self.styles.push(xml.to_string());
        self
    }

    /// Leaves `word/styles.xml` out of the package.
    pub fn without_styles(mut self) -> Self {
        self.with_styles = false;
        self
    }

    pub fn sect_pr(mut self, xml: &str) -> Self {
        self.sect_pr = xml.to_string();
        self
    }

    pub fn heading(self, level: u32, text: &str) -> Self {
        self.styled(&format!("Heading{level}"), text)
    }

    pub fn styled(self, style_id: &str, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
        ))
    }

    pub fn para(self, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
        ))
    }

    /// A body element exactly as given.
    pub fn raw(mut self, xml: &str) -> Self {
        self.body.push(xml.to_string());
        self
    }

    pub fn styles_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}">{}</w:styles>"#,
            self.styles.concat()
        )
    }

    pub fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{}{}</w:body></w:document>"#,
            self.body.concat(),
            self.sect_pr
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut parts = vec![
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", RELS.to_string()),
            ("word/document.xml", self.document_xml()),
        ];
        if self.with_styles {
            parts.push(("word/styles.xml", self.styles_xml()));
        }
        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        buffer.into_inner()
    }

    pub fn write_to(&self, path: &Path) {
        fs::write(path, self.build()).unwrap();
    }
}

pub fn read_part(docx: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

/// Entry names of an archive in stored order, with each entry's bytes.
pub fn archive_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

/// Body paragraphs of a DOCX as (pStyle, text) pairs.
pub fn paragraphs(docx: &[u8]) -> Vec<(Option<String>, String)> {
    let xml = read_part(docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let body = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name((W_NS, "body")))
        .unwrap();
    body.children()
        .filter(|n| n.has_tag_name((W_NS, "p")))
        .map(|p| {
            let style = p
                .descendants()
                .find(|n| n.has_tag_name((W_NS, "pStyle")))
                .and_then(|n| n.attribute((W_NS, "val")))
                .map(str::to_string);
            let text: String = p
                .descendants()
                .filter(|n| n.has_tag_name((W_NS, "t")))
                .filter_map(|n| n.text())
                .collect();
            (style, text)
        })
        .collect()
}

pub fn texts(docx: &[u8]) -> Vec<String> {
    paragraphs(docx).into_iter().map(|(_, text)| text).collect()
}
