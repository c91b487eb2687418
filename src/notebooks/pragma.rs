/// `# @ts <kind>: <reason>` comment pragmas in notebook code cells

const PRAGMA_PREFIX: &str = "# @ts ";

pub const SKIP_TEST: &str = "skip-test";
pub const SKIP_TEST_CI: &str = "skip-test-ci";

/// Kind and reason of a pragma line, both trimmed
pub fn parse_pragma(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix(PRAGMA_PREFIX)?;
    let (kind, reason) = rest.split_once(':')?;
    Some((kind.trim(), reason.trim()))
}
