// src/sync/listing.rs

//! Fetching and parsing autoindex pages.
//!
//! The parser is deliberately line-oriented: autoindex generators emit one
//! entry per line (or per short run of lines), with the size in a sibling
//! element marked `class="size"`.

use anyhow::{Context, Result};
use std::collections::HashSet;

use super::http::ensure_ok;
use super::types::FileInfo;

const SIZE_MARKER: &str = "class=\"size\"";
/// How many lines after the link line may carry its size cell.
const SIZE_LOOKAHEAD: usize = 2;

/// GET the index page at `dir_url` and parse it.
pub async fn fetch_listing(client: &reqwest::Client, dir_url: &str) -> Result<Vec<FileInfo>> {
    log::debug!("Listing: GET {}", dir_url);

    let response = client
        .get(dir_url)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", dir_url))?;
    ensure_ok(response.status())?;

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {}", dir_url))?;

    let files = parse_listing(&body);
    log::debug!("Listing: {} entries at {}", files.len(), dir_url);
    Ok(files)
}

/// Extract `(name, size)` entries from an autoindex page.
pub fn parse_listing(html: &str) -> Vec<FileInfo> {
    let lines: Vec<&str> = html.lines().collect();
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let href = match extract_href(line) {
            Some(h) => h,
            None => continue,
        };
        if !is_local_entry(href) {
            continue;
        }

        let name = urlencoding::decode(href)
            .map(|n| n.into_owned())
            .unwrap_or_else(|_| href.to_string());

        let size = lines[i..]
            .iter()
            .take(SIZE_LOOKAHEAD + 1)
            .find(|l| l.contains(SIZE_MARKER))
            .and_then(|l| extract_size_cell(l))
            .map(parse_size)
            .unwrap_or(0);

        if seen.insert(name.clone()) {
            files.push(FileInfo { name, size });
        }
    }

    files
}

fn extract_href(line: &str) -> Option<&str> {
    let start = line.find("href=\"")? + "href=\"".len();
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

/// Relative links to directory members only: no parent link, no absolute or
/// protocol-relative URLs, no in-page anchors, no query strings.
fn is_local_entry(href: &str) -> bool {
    if href.is_empty() || href == "../" || href == "./" {
        return false;
    }
    if href.starts_with('#') || href.starts_with('/') || href.contains('?') {
        return false;
    }
    // parses on its own only when it carries a scheme
    url::Url::parse(href).is_err()
}

/// Text content of the element carrying the size marker.
fn extract_size_cell(line: &str) -> Option<&str> {
    let marker = line.find(SIZE_MARKER)?;
    let open_end = marker + line[marker..].find('>')? + 1;
    let close = line[open_end..].find('<').map_or(line.len(), |n| open_end + n);
    Some(line[open_end..close].trim())
}

/// Convert a human readable size such as `10.3 KiB` to bytes.
///
/// Units are case-sensitive binary units from `B` to `TiB`. Anything that does
/// not look like `<number> <unit>` (including `-` for directories) is 0.
pub fn parse_size(text: &str) -> u64 {
    let mut parts = text.split_whitespace();
    let (value, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(v), Some(u), None) => (v, u),
        _ => return 0,
    };

    let multiplier: u64 = match unit {
        "B" => 1,
        "KiB" => 1 << 10,
        "MiB" => 1 << 20,
        "GiB" => 1 << 30,
        "TiB" => 1 << 40,
        _ => return 0,
    };

    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => (v * multiplier as f64) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX_STYLE: &str = r##"<html>
<head><title>Index of /files/Nintendo/</title></head>
<body>
<table id="list"><thead><tr><th><a href="?C=N&amp;O=A">File Name</a></th></tr></thead>
<tbody>
<tr><td class="link"><a href="../">Parent directory/</a></td><td class="size">-</td></tr>
<tr><td class="link"><a href="Subdir/" title="Subdir">Subdir/</a></td><td class="size">-</td></tr>
<tr><td class="link"><a href="Game%20%5BUSA%5D.zip" title="Game [USA].zip">Game [USA].zip</a></td><td class="size">10.3 KiB</td></tr>
<tr><td class="link"><a href="tiny.bin">tiny.bin</a></td>
<td class="date">2024-01-01</td>
<td class="size">735 B</td></tr>
<tr><td class="link"><a href="systeminfo.txt">systeminfo.txt</a></td><td class="size">1.5 MiB</td></tr>
</tbody></table>
<a href="#top">top</a>
<a href="https://example.com/">elsewhere</a>
<a href="//cdn.example.com/x.js">cdn</a>
<a href="/absolute/path.zip">abs</a>
<a href="file.zip?download=1">query</a>
</body></html>"##;

    #[test]
    fn test_parse_listing_keeps_only_relative_entries() {
        let files = parse_listing(NGINX_STYLE);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Subdir/", "Game [USA].zip", "tiny.bin", "systeminfo.txt"]);
    }

    #[test]
    fn test_parse_listing_sizes() {
        let files = parse_listing(NGINX_STYLE);
        assert_eq!(files[0], FileInfo::new("Subdir/", 0));
        assert_eq!(files[1], FileInfo::new("Game [USA].zip", (10.3 * 1024.0) as u64));
        // size cell two lines below the link
        assert_eq!(files[2], FileInfo::new("tiny.bin", 735));
        assert_eq!(files[3], FileInfo::new("systeminfo.txt", 1_572_864));
    }

    #[test]
    fn test_size_beyond_lookahead_is_ignored() {
        let html = "<a href=\"far.zip\">far</a>\n<td>x</td>\n<td>y</td>\n<td class=\"size\">1 KiB</td>";
        assert_eq!(parse_listing(html), vec![FileInfo::new("far.zip", 0)]);
    }

    #[test]
    fn test_duplicate_names_reported_once() {
        let html = "<a href=\"a.zip\">a</a><td class=\"size\">1 B</td>\n<a href=\"a.zip\">again</a>";
        assert_eq!(parse_listing(html), vec![FileInfo::new("a.zip", 1)]);
    }

    #[test]
    fn test_invalid_escape_kept_raw() {
        let html = "<a href=\"bad%FF.zip\">bad</a>";
        assert_eq!(parse_listing(html)[0].name, "bad%FF.zip");
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("735 B"), 735);
        assert_eq!(parse_size("2 KiB"), 2048);
        assert_eq!(parse_size("1.5 MiB"), 1_572_864);
        assert_eq!(parse_size("2.1 GiB"), (2.1 * 1024.0 * 1024.0 * 1024.0) as u64);
        assert_eq!(parse_size("1 TiB"), 1 << 40);
    }

    #[test]
    fn test_parse_size_garbage_is_zero() {
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("-"), 0);
        assert_eq!(parse_size("12"), 0);
        assert_eq!(parse_size("12 kib"), 0);
        assert_eq!(parse_size("12 KB"), 0);
        assert_eq!(parse_size("abc KiB"), 0);
        assert_eq!(parse_size("1 KiB extra"), 0);
        assert_eq!(parse_size("-3 KiB"), 0);
    }

    #[test]
    fn test_extract_size_cell_variants() {
        assert_eq!(extract_size_cell("<td class=\"size\"> 4 KiB </td>"), Some("4 KiB"));
        assert_eq!(extract_size_cell("<span class=\"size\" title=\"x\">9 B</span>"), Some("9 B"));
        assert_eq!(extract_size_cell("<td class=\"size\""), None);
    }
}
