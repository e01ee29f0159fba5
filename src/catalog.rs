//! Resource file catalogs.
//!
//! A resource listing comes back as a catalog document whose root holds an
//! `entries` element in the `http://nrg.wustl.edu/catalog` namespace:
//!
//! ```xml
//! <cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog">
//!   <cat:entries>
//!     <cat:entry URI="a.txt" ID="a.txt" name="a.txt"/>
//!   </cat:entries>
//! </cat:Catalog>
//! ```

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::XnatError;
use crate::result_set::Origin;

pub const CATALOG_NAMESPACE: &str = "http://nrg.wustl.edu/catalog";

/// Attributes of one `entry`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub attributes: Vec<(String, String)>,
}

impl CatalogEntry {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

pub fn parse_entries(xml: &str, origin: Origin<'_>) -> Result<Vec<CatalogEntry>, XnatError> {
    let catalog_error = |message: String| XnatError::Catalog {
        operation: origin.operation,
        url: origin.url.to_string(),
        message,
    };

    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut entries_depth: Option<usize> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(ref e))) => {
                depth += 1;
                if depth == 2 && entries_depth.is_none() && is_entries(&ns, e) {
                    entries_depth = Some(depth);
                } else if is_entry_at(entries_depth, depth, e) {
                    entries.push(read_entry(e).map_err(catalog_error)?);
                }
            }
            Ok((_, Event::Empty(ref e))) => {
                if is_entry_at(entries_depth, depth + 1, e) {
                    entries.push(read_entry(e).map_err(catalog_error)?);
                }
            }
            Ok((_, Event::End(_))) => {
                if entries_depth == Some(depth) {
                    entries_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Eof)) => break,
            Err(err) => return Err(catalog_error(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Value of `attribute` on every catalog entry, in document order.
pub fn entry_attribute(
    xml: &str,
    attribute: &str,
    origin: Origin<'_>,
) -> Result<Vec<String>, XnatError> {
    parse_entries(xml, origin)?
        .iter()
        .map(|entry| {
            entry
                .get(attribute)
                .map(str::to_string)
                .ok_or_else(|| XnatError::LookupMiss {
                    operation: origin.operation,
                    key: attribute.to_string(),
                })
        })
        .collect()
}

fn is_entries(ns: &ResolveResult<'_>, e: &BytesStart<'_>) -> bool {
    let in_catalog = matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == CATALOG_NAMESPACE.as_bytes());
    in_catalog && e.local_name().as_ref() == b"entries"
}

fn is_entry_at(entries_depth: Option<usize>, depth: usize, e: &BytesStart<'_>) -> bool {
    entries_depth.is_some_and(|parent| depth == parent + 1) && e.local_name().as_ref() == b"entry"
}

fn read_entry(e: &BytesStart<'_>) -> Result<CatalogEntry, String> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|err| err.to_string())?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(CatalogEntry { attributes })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const ORIGIN: Origin<'static> = Origin {
        operation: "test",
        url: "https://xnat.example.org/data/projects/P/subjects/S/experiments/E/resources/R",
    };

    #[test]
    fn names_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog" ID="R">
  <cat:entries>
    <cat:entry URI="a.txt" ID="a.txt" name="a.txt"/>
    <cat:entry URI="b.txt" ID="b.txt" name="b.txt"/>
  </cat:entries>
</cat:Catalog>"#;
        let names = entry_attribute(xml, "name", ORIGIN).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn entries_outside_catalog_namespace_ignored() {
        let xml = r#"<Catalog xmlns:cat="http://nrg.wustl.edu/catalog">
  <entries><entry name="stray.txt"/></entries>
  <cat:entries><cat:entry name="kept.txt"/></cat:entries>
</Catalog>"#;
        let names = entry_attribute(xml, "name", ORIGIN).unwrap();
        assert_eq!(names, vec!["kept.txt"]);
    }

    #[test]
    fn nested_entries_not_collected() {
        let xml = r#"<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog">
  <cat:sets><cat:entries><cat:entry name="deep.txt"/></cat:entries></cat:sets>
  <cat:entries>
    <cat:entry name="top.txt"><cat:metaFields/></cat:entry>
  </cat:entries>
</cat:Catalog>"#;
        let names = entry_attribute(xml, "name", ORIGIN).unwrap();
        assert_eq!(names, vec!["top.txt"]);
    }

    #[test]
    fn escaped_attribute_values_unescaped() {
        let xml = r#"<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog">
  <cat:entries><cat:entry name="T1 &amp; T2.nii"/></cat:entries>
</cat:Catalog>"#;
        let names = entry_attribute(xml, "name", ORIGIN).unwrap();
        assert_eq!(names, vec!["T1 & T2.nii"]);
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        let xml = r#"<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog"><cat:entries/></cat:Catalog>"#;
        assert!(entry_attribute(xml, "name", ORIGIN).unwrap().is_empty());
    }

    #[test]
    fn missing_attribute_is_lookup_miss() {
        let xml = r#"<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog">
  <cat:entries><cat:entry URI="a.txt"/></cat:entries>
</cat:Catalog>"#;
        let err = entry_attribute(xml, "name", ORIGIN).unwrap_err();
        assert_matches!(err, XnatError::LookupMiss { .. });
    }

    #[test]
    fn malformed_document_is_catalog_error() {
        let xml = r#"<cat:Catalog xmlns:cat="http://nrg.wustl.edu/catalog"><cat:entries></cat:Catalog>"#;
        let err = entry_attribute(xml, "name", ORIGIN).unwrap_err();
        assert_matches!(err, XnatError::Catalog { .. });
    }
}
