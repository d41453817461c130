//! Numbered-list selection prompts.
//!
//! Selections are presented 1-based and mapped to 0-based indices. Invalid
//! input re-prompts instead of aborting. The loops are generic over
//! `BufRead`/`Write` so tests can drive them with in-memory cursors.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Print a numbered file list with a title.
pub fn print_numbered_list<W: Write>(
    out: &mut W,
    title: &str,
    items: &[PathBuf],
) -> std::io::Result<()> {
    writeln!(out, "\n{title}:")?;
    for (idx, item) in items.iter().enumerate() {
        let name = item
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.display().to_string());
        writeln!(out, "{}. {}", idx + 1, name)?;
    }
    Ok(())
}

/// Parse a single 1-based selection against a list of `len` items.
pub fn parse_single_selection(input: &str, len: usize) -> Option<usize> {
    let idx: usize = input.trim().parse().ok()?;
    (1..=len).contains(&idx).then(|| idx - 1)
}

/// Parse a space-separated list of 1-based selections, preserving order.
/// Returns `None` when any token is non-numeric or out of range, or when the
/// input is empty.
pub fn parse_multi_selection(input: &str, len: usize) -> Option<Vec<usize>> {
    let indices: Vec<usize> = input
        .split_whitespace()
        .map(|tok| parse_single_selection(tok, len))
        .collect::<Option<_>>()?;
    (!indices.is_empty()).then_some(indices)
}

/// Prompt until a single valid selection is entered.
pub fn prompt_single<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    items: &[PathBuf],
) -> VidstitchResult<PathBuf> {
    loop {
        write!(out, "{prompt}").and_then(|_| out.flush()).map_err(prompt_io)?;
        let Some(line) = read_line(input)? else {
            return Err(VidstitchError::config("input closed during selection"));
        };
        if let Some(idx) = parse_single_selection(&line, items.len()) {
            return Ok(items[idx].clone());
        }
        writeln!(out, "Invalid selection. Please try again.").map_err(prompt_io)?;
    }
}

/// Prompt until a valid space-separated selection list is entered. Order of
/// entry is preserved in the result.
pub fn prompt_multi<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    items: &[PathBuf],
) -> VidstitchResult<Vec<PathBuf>> {
    loop {
        writeln!(out, "\nEnter numbers separated by spaces (e.g., '1 3 4')")
            .map_err(prompt_io)?;
        write!(out, "{prompt}").and_then(|_| out.flush()).map_err(prompt_io)?;
        let Some(line) = read_line(input)? else {
            return Err(VidstitchError::config("input closed during selection"));
        };
        if let Some(indices) = parse_multi_selection(&line, items.len()) {
            return Ok(indices.into_iter().map(|i| items[i].clone()).collect());
        }
        writeln!(out, "Invalid selection. Please try again.").map_err(prompt_io)?;
    }
}

/// Prompt until a path ending in one of `extensions` is entered.
pub fn prompt_output_path<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    extensions: &[&str],
) -> VidstitchResult<PathBuf> {
    loop {
        write!(out, "Output video path (e.g., out.mp4): ")
            .and_then(|_| out.flush())
            .map_err(prompt_io)?;
        let Some(line) = read_line(input)? else {
            return Err(VidstitchError::config("input closed during selection"));
        };
        let candidate = PathBuf::from(line.trim());
        if has_extension(&candidate, extensions) {
            return Ok(candidate);
        }
        writeln!(
            out,
            "Output must end in one of: {}.",
            extensions.join(", ")
        )
        .map_err(prompt_io)?;
    }
}

/// Whether `path` ends in one of `extensions` (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

fn read_line<R: BufRead>(input: &mut R) -> VidstitchResult<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).map_err(prompt_io)?;
    Ok((n > 0).then_some(line))
}

fn prompt_io(e: std::io::Error) -> VidstitchError {
    VidstitchError::config(format!("selection prompt io error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn items(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("clip{i}.mp4"))).collect()
    }

    #[test]
    fn single_selection_is_one_based() {
        assert_eq!(parse_single_selection("1", 3), Some(0));
        assert_eq!(parse_single_selection(" 3 ", 3), Some(2));
        assert_eq!(parse_single_selection("0", 3), None);
        assert_eq!(parse_single_selection("4", 3), None);
        assert_eq!(parse_single_selection("x", 3), None);
    }

    #[test]
    fn multi_selection_preserves_entry_order() {
        assert_eq!(parse_multi_selection("3 1 2", 3), Some(vec![2, 0, 1]));
        assert_eq!(parse_multi_selection("1 1", 3), Some(vec![0, 0]));
        assert_eq!(parse_multi_selection("", 3), None);
        assert_eq!(parse_multi_selection("1 9", 3), None);
        assert_eq!(parse_multi_selection("1 two", 3), None);
    }

    #[test]
    fn invalid_input_reprompts_until_valid() {
        let mut input = Cursor::new(b"zero\n9\n2\n".to_vec());
        let mut out = Vec::new();
        let picked = prompt_single(&mut input, &mut out, "> ", &items(3)).unwrap();
        assert_eq!(picked, PathBuf::from("clip1.mp4"));
        let transcript = String::from_utf8(out).unwrap();
        assert_eq!(transcript.matches("Invalid selection").count(), 2);
    }

    #[test]
    fn multi_prompt_maps_to_paths_in_order() {
        let mut input = Cursor::new(b"2 1\n".to_vec());
        let mut out = Vec::new();
        let picked = prompt_multi(&mut input, &mut out, "> ", &items(2)).unwrap();
        assert_eq!(
            picked,
            vec![PathBuf::from("clip1.mp4"), PathBuf::from("clip0.mp4")]
        );
    }

    #[test]
    fn output_prompt_requires_supported_extension() {
        let mut input = Cursor::new(b"movie.txt\nmovie.mp4\n".to_vec());
        let mut out = Vec::new();
        let picked =
            prompt_output_path(&mut input, &mut out, crate::scan::VIDEO_EXTENSIONS).unwrap();
        assert_eq!(picked, PathBuf::from("movie.mp4"));
    }

    #[test]
    fn closed_input_is_an_error_not_a_hang() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        assert!(prompt_single(&mut input, &mut out, "> ", &items(2)).is_err());
    }

    #[test]
    fn numbered_list_prints_file_names() {
        let mut out = Vec::new();
        print_numbered_list(&mut out, "Available videos", &items(2)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1. clip0.mp4"));
        assert!(text.contains("2. clip1.mp4"));
    }
}
