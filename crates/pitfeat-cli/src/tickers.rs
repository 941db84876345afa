use std::fs;
use std::path::Path;

use pitfeat_core::SecurityId;

use crate::error::CliError;

/// Read one security id per line. Blank lines and lines starting with `#` are ignored;
/// duplicates keep their first position.
pub fn load_tickers(path: &Path) -> Result<Vec<SecurityId>, CliError> {
    let contents = fs::read_to_string(path)?;
    parse_tickers(&contents)
}

fn parse_tickers(contents: &str) -> Result<Vec<SecurityId>, CliError> {
    let mut sids: Vec<SecurityId> = Vec::new();
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sid = SecurityId::parse(line)?;
        if !sids.contains(&sid) {
            sids.push(sid);
        }
    }
    Ok(sids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let sids = parse_tickers("# banks\nBBCA.JK\n\n  bbri.jk  \n#TLKM.JK\nBBCA.JK\n")
            .expect("parses");
        let raw: Vec<_> = sids.iter().map(SecurityId::as_str).collect();
        assert_eq!(raw, vec!["BBCA.JK", "BBRI.JK"]);
    }

    #[test]
    fn invalid_id_is_a_validation_error() {
        let err = parse_tickers("BBCA.JK\nTHIS-ID-IS-FAR-TOO-LONG\n").expect_err("must fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_tickers(&temp.path().join("tickers.txt")).expect_err("must fail");
        assert_eq!(err.exit_code(), 10);
    }
}
