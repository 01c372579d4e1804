//! Location manifest parsing.
//!
//! One location per line: `name: <n>, address: <a>, size: <count>`. The
//! first field must carry a name key, the second an address key and the
//! last a size key; accepted keys come from [`CatalogKeys`]. The address
//! may itself contain `, ` separators: everything between the first and the
//! last field is the address.

use std::collections::HashSet;
use std::path::Path;

use crate::config::CatalogKeys;
use crate::error::ReconError;
use crate::model::LocationDescriptor;

const FIELD_SEPARATOR: &str = ", ";

/// Parse the whole manifest. Any malformed line aborts the load.
pub fn parse_catalog(input: &str, keys: &CatalogKeys) -> Result<Vec<LocationDescriptor>, ReconError> {
    let mut locations = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (i, raw) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        let location = parse_line(line_no, line, keys)?;
        if !seen.insert(location.name.clone()) {
            return Err(malformed(
                line_no,
                line,
                format!("duplicate location name '{}'", location.name),
            ));
        }
        locations.push(location);
    }

    log::debug!("catalog: {} location(s)", locations.len());
    Ok(locations)
}

pub fn load_catalog(path: &Path, keys: &CatalogKeys) -> Result<Vec<LocationDescriptor>, ReconError> {
    let input = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read catalog {}: {e}", path.display())))?;
    parse_catalog(&input, keys)
}

fn parse_line(line_no: usize, line: &str, keys: &CatalogKeys) -> Result<LocationDescriptor, ReconError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < 3 {
        return Err(malformed(
            line_no,
            line,
            format!("expected name, address and size fields, found {}", fields.len()),
        ));
    }

    let last = fields.len() - 1;
    let (name_key, name) = split_field(line_no, line, fields[0])?;
    let (address_key, address_head) = split_field(line_no, line, fields[1])?;
    let (size_key, size_raw) = split_field(line_no, line, fields[last])?;

    for (expected, key, accepted) in [
        ("name", name_key, keys.is_name(name_key)),
        ("address", address_key, keys.is_address(address_key)),
        ("size", size_key, keys.is_size(size_key)),
    ] {
        if !accepted {
            return Err(malformed(
                line_no,
                line,
                format!("expected a {expected} field, found key '{key}'"),
            ));
        }
    }

    if name.is_empty() {
        return Err(malformed(line_no, line, "empty location name".into()));
    }

    let mut address = address_head.to_string();
    for rest in &fields[2..last] {
        address.push_str(FIELD_SEPARATOR);
        address.push_str(rest);
    }

    let declared_size = size_raw.parse::<u64>().map_err(|_| {
        malformed(line_no, line, format!("size '{size_raw}' is not an integer"))
    })?;

    Ok(LocationDescriptor {
        name: name.to_string(),
        address: address.trim().to_string(),
        declared_size,
    })
}

/// Split a `key: value` field, trimming both halves. Accepts ASCII and
/// full-width colons.
fn split_field<'a>(line_no: usize, line: &str, field: &'a str) -> Result<(&'a str, &'a str), ReconError> {
    field
        .split_once(|c: char| c == ':' || c == '：')
        .map(|(key, value)| (key.trim(), value.trim()))
        .ok_or_else(|| {
            malformed(line_no, line, format!("field '{field}' is not a key: value pair"))
        })
}

fn malformed(line_no: usize, line: &str, reason: String) -> ReconError {
    ReconError::MalformedManifestLine {
        line_no,
        line: line.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Vec<LocationDescriptor>, ReconError> {
        parse_catalog(input, &CatalogKeys::default())
    }

    #[test]
    fn parse_basic_manifest() {
        let input = "\
name: West Lake, address: Hangzhou, size: 120
name: Lingyin Temple, address: Hangzhou, size: 87
";
        let locations = parse(input).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "West Lake");
        assert_eq!(locations[0].address, "Hangzhou");
        assert_eq!(locations[0].declared_size, 120);
        assert_eq!(locations[1].name, "Lingyin Temple");
    }

    #[test]
    fn localized_keys_and_fullwidth_colon() {
        let keys = CatalogKeys {
            name: vec!["name".into(), "景区名称".into()],
            address: vec!["地址".into()],
            size: vec!["数据量".into()],
        };
        let input = "景区名称: 西湖, 地址：杭州市西湖区, 数据量: 300\n";
        let locations = parse_catalog(input, &keys).unwrap();
        assert_eq!(locations[0].name, "西湖");
        assert_eq!(locations[0].address, "杭州市西湖区");
        assert_eq!(locations[0].declared_size, 300);
    }

    #[test]
    fn address_with_separator_is_kept_whole() {
        let input = "name: Old Town, address: 1 Main St, Springfield, size: 4";
        let locations = parse(input).unwrap();
        assert_eq!(locations[0].address, "1 Main St, Springfield");
        assert_eq!(locations[0].declared_size, 4);
    }

    #[test]
    fn blank_lines_and_bom_are_ignored() {
        let input = "\u{feff}name: A, address: X, size: 1\n\n   \nname: B, address: Y, size: 0\n";
        let locations = parse(input).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "A");
        assert_eq!(locations[1].declared_size, 0);
    }

    #[test]
    fn missing_size_field_is_malformed() {
        let input = "name: A, address: X, size: 1\nname: B, address: Y\n";
        match parse(input).unwrap_err() {
            ReconError::MalformedManifestLine { line_no, reason, .. } => {
                assert_eq!(line_no, 2);
                assert!(reason.contains("found 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_size_key_is_malformed() {
        match parse("name: A, address: X, zip: 310000").unwrap_err() {
            ReconError::MalformedManifestLine { line_no, reason, .. } => {
                assert_eq!(line_no, 1);
                assert!(reason.contains("expected a size field, found key 'zip'"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn keys_match_case_insensitively_and_are_checked_in_order() {
        let locations = parse("Name: A, ADDRESS: X, Size: 3").unwrap();
        assert_eq!(locations[0].declared_size, 3);

        let err = parse("address: X, name: A, size: 3").unwrap_err();
        assert!(err.to_string().contains("expected a name field, found key 'address'"));

        // the default keys do not cover localized manifests
        let err = parse("景区名称: 西湖, 地址: 杭州, 数据量: 3").unwrap_err();
        assert!(matches!(err, ReconError::MalformedManifestLine { .. }));
    }

    #[test]
    fn non_integer_size_is_malformed() {
        let err = parse("name: A, address: X, size: lots").unwrap_err();
        assert!(err.is_run_fatal());
        assert!(err.to_string().contains("'lots' is not an integer"));

        let err = parse("name: A, address: X, size: -3").unwrap_err();
        assert!(matches!(err, ReconError::MalformedManifestLine { .. }));
    }

    #[test]
    fn field_without_colon_is_malformed() {
        let err = parse("name: A, address: X, 12").unwrap_err();
        assert!(err.to_string().contains("not a key: value pair"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let input = "name: A, address: X, size: 1\nname: A, address: Y, size: 2\n";
        let err = parse(input).unwrap_err();
        assert!(err.to_string().contains("duplicate location name 'A'"));
    }

    #[test]
    fn empty_manifest_is_empty_catalog() {
        assert!(parse("").unwrap().is_empty());
    }
}
