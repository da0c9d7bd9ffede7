use crate::core::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Line diff based on the longest common subsequence of the two inputs.
/// Within a changed region removals come before additions.
pub fn diff_lines<'a>(left: &[&'a str], right: &[&'a str]) -> Vec<DiffLine<'a>> {
    let (n, m) = (left.len(), right.len());

    // lcs[i][j] = LCS length of left[i..] and right[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if left[i] == right[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            out.push(DiffLine::Same(left[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(left[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(right[j]));
            j += 1;
        }
    }
    out.extend(left[i..].iter().map(|line| DiffLine::Removed(*line)));
    out.extend(right[j..].iter().map(|line| DiffLine::Added(*line)));
    out
}

/// Changed lines only, prefixed `- ` or `+ ` and trimmed.
pub fn changed_lines(diff: &[DiffLine<'_>]) -> Vec<String> {
    diff.iter()
        .filter_map(|line| match line {
            DiffLine::Same(_) => None,
            DiffLine::Removed(text) => Some(format!("- {}", text).trim().to_string()),
            DiffLine::Added(text) => Some(format!("+ {}", text).trim().to_string()),
        })
        .collect()
}

pub fn compare_texts(left: &str, right: &str) -> Vec<String> {
    let left_lines: Vec<&str> = left.lines().collect();
    let right_lines: Vec<&str> = right.lines().collect();
    changed_lines(&diff_lines(&left_lines, &right_lines))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableComparison {
    pub left_path: String,
    pub right_path: String,
    pub changes: Vec<String>,
}

impl TableComparison {
    pub fn render(&self, index: usize) -> String {
        if self.changes.is_empty() {
            return format!(
                "{}: No differences found between {} and {}.\n",
                index, self.left_path, self.right_path
            );
        }

        let mut out = format!(
            "{}: Differences found between {} and {}:\n",
            index, self.left_path, self.right_path
        );
        for change in &self.changes {
            out.push_str(change);
            out.push('\n');
        }
        out
    }
}

/// Compare `<left_dir>/<left_table>.txt` against `<right_dir>/<right_table>.txt`.
pub async fn compare_tables(
    left_dir: &Path,
    left_table: &str,
    right_dir: &Path,
    right_table: &str,
) -> Result<TableComparison> {
    let left_path = left_dir.join(format!("{}.txt", left_table));
    let right_path = right_dir.join(format!("{}.txt", right_table));

    let left = tokio::fs::read_to_string(&left_path).await?;
    let right = tokio::fs::read_to_string(&right_path).await?;

    Ok(TableComparison {
        left_path: left_path.display().to_string(),
        right_path: right_path.display().to_string(),
        changes: compare_texts(&left, &right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_have_no_changes() {
        let text = "CREATE EXTERNAL TABLE `t` (\n  `id` bigint)";
        assert!(compare_texts(text, text).is_empty());
    }

    #[test]
    fn replaced_line_is_removal_then_addition() {
        let left = ["a", "b", "c"];
        let right = ["a", "x", "c"];
        assert_eq!(
            diff_lines(&left, &right),
            vec![
                DiffLine::Same("a"),
                DiffLine::Removed("b"),
                DiffLine::Added("x"),
                DiffLine::Same("c"),
            ]
        );
    }

    #[test]
    fn trailing_insertions_and_deletions() {
        assert_eq!(
            compare_texts("a\nb", "a\nb\nc\nd"),
            vec!["+ c", "+ d"]
        );
        assert_eq!(compare_texts("a\nb\nc", "a"), vec!["- b", "- c"]);
        assert_eq!(compare_texts("", "a"), vec!["+ a"]);
    }

    #[test]
    fn render_numbers_each_comparison() {
        let comparison = TableComparison {
            left_path: "raw/orders.txt".to_string(),
            right_path: "master/orders.txt".to_string(),
            changes: vec!["- `id` int,".to_string(), "+ `id` bigint,".to_string()],
        };
        assert_eq!(
            comparison.render(2),
            "2: Differences found between raw/orders.txt and master/orders.txt:\n- `id` int,\n+ `id` bigint,\n"
        );

        let same = TableComparison {
            changes: vec![],
            ..comparison
        };
        assert!(same.render(1).starts_with("1: No differences found"));
    }

    #[tokio::test]
    async fn compare_tables_reads_both_directories() {
        let raw = tempfile::TempDir::new().unwrap();
        let master = tempfile::TempDir::new().unwrap();
        tokio::fs::write(raw.path().join("tabla_1.txt"), "a\n  `col` string\nz")
            .await
            .unwrap();
        tokio::fs::write(master.path().join("tabla_1.1.txt"), "a\n  `col` varchar(10)\nz")
            .await
            .unwrap();

        let comparison = compare_tables(raw.path(), "tabla_1", master.path(), "tabla_1.1")
            .await
            .unwrap();

        assert_eq!(
            comparison.changes,
            vec!["-   `col` string", "+   `col` varchar(10)"]
        );
    }
}
