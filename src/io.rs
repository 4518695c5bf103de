use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use log::warn;

use crate::error::{Error, Result};
use crate::snapshot::TreeSnapshot;

/// Strip bracketed Newick comments such as `[&class=intro]`.
///
/// phylotree does not understand comments, so they are dropped before parsing.
fn strip_comments(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut depth = 0usize;

    for ch in newick.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Split a document into `;`-terminated Newick records, dropping comments
/// and blank records.
fn split_records(content: &str) -> Vec<String> {
    strip_comments(content)
        .split(';')
        .map(|record| record.split_whitespace().collect::<String>())
        .filter(|record| !record.is_empty())
        .map(|record| format!("{record};"))
        .collect()
}

fn read_text(path: &Path) -> Result<String> {
    if path.to_string_lossy().ends_with(".gz") {
        let mut content = String::new();
        GzDecoder::new(File::open(path)?).read_to_string(&mut content)?;
        Ok(content)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// Read every tree of a Newick file (optionally gzip-compressed), named
/// `<file stem>_tree<index>`.
///
/// Records that fail to parse are logged and skipped; an input with no
/// usable tree at all is an error.
pub fn read_newick_trees<P: AsRef<Path>>(path: P) -> Result<Vec<(String, TreeSnapshot)>> {
    let path = path.as_ref();
    let content = read_text(path)?;

    let base_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".gz"))
        .map(|s| s.rsplit_once('.').map_or(s, |(stem, _)| stem))
        .unwrap_or("unknown");

    let records = split_records(&content);
    let trees: Vec<(String, TreeSnapshot)> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match TreeSnapshot::from_newick(record) {
            Ok(snap) => Some((format!("{base_name}_tree{idx}"), snap)),
            Err(e) => {
                warn!("skipping tree {idx} of {}: {e}", path.display());
                None
            }
        })
        .collect();

    if trees.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "no trees parsed from {}",
            path.display()
        )));
    }
    Ok(trees)
}

/// Open `path` for writing: `-` is stdout, a `.gz` suffix gzip-compresses.
fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }

    let file = File::create(path)?;
    if path.to_string_lossy().ends_with(".gz") {
        let enc = GzEncoder::new(file, Compression::default());
        Ok(Box::new(BufWriter::new(enc)))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let mut out = open_output(path.as_ref())?;

    // Header row
    writeln!(&mut out, "\t{}", names.iter().join("\t"))?;

    // Rows
    for (name, row) in names.iter().zip(mat) {
        writeln!(&mut out, "{}\t{}", name, row.iter().join("\t"))?;
    }

    out.flush()
}

/// Write one TSV row per cluster: tree name, cluster index, size and the
/// comma-separated member labels in merge order.
pub fn write_clusters_tsv<P: AsRef<Path>>(
    path: P,
    trees: &[(String, Vec<Vec<String>>)],
) -> io::Result<()> {
    let mut out = open_output(path.as_ref())?;

    writeln!(&mut out, "tree\tcluster\tsize\tnodes")?;
    for (tree_name, clusters) in trees {
        for (k, members) in clusters.iter().enumerate() {
            writeln!(
                &mut out,
                "{tree_name}\t{k}\t{}\t{}",
                members.len(),
                members.iter().join(",")
            )?;
        }
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::TreeNavigator;

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("(a[&x=1],b)c[note];"), "(a,b)c;");
        assert_eq!(strip_comments("(a[[nested]],b);"), "(a,b);");
    }

    #[test]
    fn test_split_records() {
        let records = split_records("(a,b)c;\n\n  ((d, e)f)g ;\n");
        assert_eq!(records, vec!["(a,b)c;", "((d,e)f)g;"]);
    }

    #[test]
    fn test_read_newick_trees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.nwk");
        fs::write(&path, "((p.1,p.2)div)body;\n(a:wide,b)c;\n(span)div;\n").unwrap();

        let trees = read_newick_trees(&path).unwrap();
        let names: Vec<&str> = trees.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["page_tree0", "page_tree2"]);
        assert_eq!(trees[0].1.len(), 4);
        assert_eq!(trees[1].1.tag_of(1), Some("span"));
    }

    #[test]
    fn test_read_gzip_trees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.nwk.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"(a,b)root;").unwrap();
        enc.finish().unwrap();

        let trees = read_newick_trees(&path).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].0, "doc_tree0");
    }

    #[test]
    fn test_read_empty_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.nwk");
        fs::write(&path, "\n").unwrap();
        assert!(matches!(read_newick_trees(&path), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_write_matrix_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.tsv");
        let names = vec!["p.1".to_string(), "span".to_string()];
        let mat = vec![vec![0.0, 5.0], vec![5.0, 0.0]];

        write_matrix_tsv(&path, &names, &mat).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "\tp.1\tspan\np.1\t0\t5\nspan\t5\t0\n");
    }

    #[test]
    fn test_write_clusters_tsv_gz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.tsv.gz");
        let rows = vec![(
            "page_tree0".to_string(),
            vec![
                vec!["span".to_string()],
                vec!["p.2".to_string(), "p.1".to_string()],
            ],
        )];

        write_clusters_tsv(&path, &rows).unwrap();
        let mut text = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(
            text,
            "tree\tcluster\tsize\tnodes\npage_tree0\t0\t1\tspan\npage_tree0\t1\t2\tp.2,p.1\n"
        );
    }
}
