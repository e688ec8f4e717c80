// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document handling of the emulated engine.
//
// Plain text is "parsed" and reported the way the real engine's text parser
// reports it. Every other format is sniffed from its magic bytes and refused
// with the code the real engine would produce when the corresponding parser
// is missing.

use std::io;
use std::path::Path;

use extractous_core::{CharSet, ExtractorSettings};

use super::fault::Fault;

const PARSED_BY: [&str; 2] = [
    "org.apache.tika.parser.DefaultParser",
    "org.apache.tika.parser.csv.TextAndCSVParser",
];

/// Where the document comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source<'a> {
    Bytes(&'a [u8]),
    File(&'a str),
    Url(&'a str),
}

/// Result of a successful extraction, before it crosses the ABI.
#[derive(Debug)]
pub(crate) struct Document {
    /// Rendered text (plain or XHTML), truncated and charset-substituted.
    pub text: String,
    pub encoding: CharSet,
    pub metadata: Vec<(String, Vec<String>)>,
}

impl Document {
    /// Bytes handed out by a stream reader, in the configured output charset.
    pub(crate) fn into_stream_bytes(self) -> Vec<u8> {
        match self.encoding {
            CharSet::Utf8 | CharSet::UsAscii => self.text.into_bytes(),
            CharSet::Utf16Be => self.text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }
}

pub(crate) fn extract(settings: &ExtractorSettings, source: Source<'_>) -> Result<Document, Fault> {
    let (data, resource_name) = load(source)?;
    let text = match sniff(&data) {
        Format::Text(text) => text,
        Format::Image(mime) => {
            let language = settings.ocr.as_ref().map_or("eng", |ocr| ocr.language.as_str());
            return Err(Fault::Ocr {
                mime,
                language: language.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "tesseract executable not found on PATH"),
            });
        }
        Format::Container(mime) => return Err(Fault::Container { mime }),
        Format::Other(mime) => return Err(Fault::Unsupported { mime }),
    };

    let charset = if text.is_ascii() { "ISO-8859-1" } else { "UTF-8" };
    let content_type = format!("text/plain; charset={charset}");

    let mut metadata = vec![
        ("Content-Type".to_string(), vec![content_type.clone()]),
        ("Content-Encoding".to_string(), vec![charset.to_string()]),
        (
            "X-TIKA:Parsed-By".to_string(),
            PARSED_BY.iter().map(|p| p.to_string()).collect(),
        ),
    ];
    if let Some(name) = resource_name {
        metadata.push(("resourceName".to_string(), vec![name]));
        metadata.push(("Content-Length".to_string(), vec![data.len().to_string()]));
    }

    let rendered = if settings.xml_output {
        render_xhtml(&text, &content_type)
    } else {
        text
    };
    let limit = usize::try_from(settings.max_string_length).unwrap_or(0);
    let mut text: String = rendered.chars().take(limit).collect();
    if settings.encoding == CharSet::UsAscii {
        text = text.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect();
    }

    Ok(Document {
        text,
        encoding: settings.encoding,
        metadata,
    })
}

fn load(source: Source<'_>) -> Result<(Vec<u8>, Option<String>), Fault> {
    match source {
        Source::Bytes(data) => Ok((data.to_vec(), None)),
        Source::File(path) => read_file(path),
        Source::Url(url) => {
            if let Some(path) = url.strip_prefix("file://") {
                read_file(path)
            } else if url.starts_with("http://") || url.starts_with("https://") {
                Err(Fault::Fetch {
                    url: url.to_string(),
                    source: io::Error::new(
                        io::ErrorKind::Unsupported,
                        "network access is not available in the emulated engine",
                    ),
                })
            } else {
                Err(Fault::Fetch {
                    url: url.to_string(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "unsupported URL scheme"),
                })
            }
        }
    }
}

fn read_file(path: &str) -> Result<(Vec<u8>, Option<String>), Fault> {
    let data = std::fs::read(path).map_err(|source| Fault::Open {
        path: path.to_string(),
        source,
    })?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok((data, name))
}

enum Format {
    Text(String),
    Image(&'static str),
    Container(&'static str),
    Other(&'static str),
}

fn sniff(data: &[u8]) -> Format {
    if data.starts_with(b"%PDF-") {
        return Format::Other("application/pdf");
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Format::Image("image/png");
    }
    if data.starts_with(b"\xff\xd8\xff") {
        return Format::Image("image/jpeg");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Format::Image("image/gif");
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return Format::Image("image/tiff");
    }
    if data.starts_with(b"PK\x03\x04") {
        return Format::Container("application/x-tika-ooxml");
    }
    if data.starts_with(b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1") {
        return Format::Container("application/x-tika-msoffice");
    }
    match std::str::from_utf8(data) {
        Ok(text) if !text.contains('\0') => {
            Format::Text(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
        }
        _ => Format::Other("application/octet-stream"),
    }
}

fn render_xhtml(text: &str, content_type: &str) -> String {
    let mut out = String::from("<html xmlns=\"http://www.w3.org/1999/xhtml\">\n<head>\n");
    out.push_str(&format!("<meta name=\"Content-Type\" content=\"{content_type}\"/>\n"));
    out.push_str("<title></title>\n</head>\n<body>");
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str("<p>");
        out.push_str(&escape(line));
        out.push_str("</p>\n");
    }
    out.push_str("</body></html>");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractous_core::OcrSettings;

    fn value<'a>(doc: &'a Document, key: &str) -> Option<&'a [String]> {
        doc.metadata.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
    }

    #[test]
    fn plain_text_reports_parser_chain() {
        let doc = extract(&ExtractorSettings::default(), Source::Bytes(b"Hello, World!")).unwrap();
        assert_eq!(doc.text, "Hello, World!");
        assert_eq!(value(&doc, "X-TIKA:Parsed-By").unwrap().len(), 2);
        assert_eq!(value(&doc, "Content-Encoding").unwrap(), ["ISO-8859-1"]);
        assert!(value(&doc, "resourceName").is_none());
    }

    #[test]
    fn max_length_counts_characters() {
        let settings = ExtractorSettings {
            max_string_length: 3,
            ..Default::default()
        };
        let doc = extract(&settings, Source::Bytes("héllo".as_bytes())).unwrap();
        assert_eq!(doc.text, "hél");
    }

    #[test]
    fn ascii_output_substitutes() {
        let settings = ExtractorSettings {
            encoding: CharSet::UsAscii,
            ..Default::default()
        };
        let doc = extract(&settings, Source::Bytes("naïve".as_bytes())).unwrap();
        assert_eq!(doc.text, "na?ve");
    }

    #[test]
    fn utf16_stream_bytes_are_big_endian() {
        let settings = ExtractorSettings {
            encoding: CharSet::Utf16Be,
            ..Default::default()
        };
        let doc = extract(&settings, Source::Bytes(b"Hi")).unwrap();
        assert_eq!(doc.into_stream_bytes(), vec![0, b'H', 0, b'i']);
    }

    #[test]
    fn xml_output_escapes_markup() {
        let settings = ExtractorSettings {
            xml_output: true,
            ..Default::default()
        };
        let doc = extract(&settings, Source::Bytes(b"a < b\n\nc & d")).unwrap();
        assert!(doc.text.starts_with("<html xmlns=\"http://www.w3.org/1999/xhtml\">"));
        assert!(doc.text.contains("<p>a &lt; b</p>\n<p>c &amp; d</p>"));
    }

    #[test]
    fn formats_fail_with_engine_codes() {
        let settings = ExtractorSettings::default();
        assert!(matches!(
            extract(&settings, Source::Bytes(b"%PDF-1.7\n")),
            Err(Fault::Unsupported { mime: "application/pdf" })
        ));
        assert!(matches!(
            extract(&settings, Source::Bytes(b"PK\x03\x04rest")),
            Err(Fault::Container { .. })
        ));
        assert!(matches!(
            extract(&settings, Source::Bytes(&[0u8, 159, 146, 150])),
            Err(Fault::Unsupported { mime: "application/octet-stream" })
        ));
    }

    #[test]
    fn images_need_ocr() {
        let settings = ExtractorSettings {
            ocr: Some(OcrSettings {
                language: "deu".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = extract(&settings, Source::Bytes(b"\x89PNG\r\n\x1a\n....")).unwrap_err();
        assert!(err.to_string().contains("deu"));
    }

    #[test]
    fn files_report_resource_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two\n").unwrap();
        let path = path.to_str().unwrap();

        let doc = extract(&ExtractorSettings::default(), Source::File(path)).unwrap();
        assert_eq!(value(&doc, "resourceName").unwrap(), ["notes.txt"]);
        assert_eq!(value(&doc, "Content-Length").unwrap(), ["18"]);

        let url = format!("file://{path}");
        assert!(extract(&ExtractorSettings::default(), Source::Url(&url)).is_ok());
    }

    #[test]
    fn network_urls_are_io_failures() {
        let err = extract(&ExtractorSettings::default(), Source::Url("https://example.com/a.txt")).unwrap_err();
        assert!(matches!(err, Fault::Fetch { .. }));
    }
}
