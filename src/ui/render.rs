// src/ui/render.rs

//! In-place redraw of the progress block and the per-slot status strings.
//!
//! The block is one line per busy slot followed by three summary lines. The
//! cursor is left at the end of the last summary line so the next redraw can
//! walk back up over exactly the lines it drew.

use crossterm::{
    cursor,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

use super::theme::Theme;
use super::utils::{format_bytes, format_bytes_if_known, format_duration};
use crate::sync::progress::ProgressSnapshot;

/// Summary lines printed under the slot rows.
pub const SUMMARY_LINES: usize = 3;

/// Erase the previous block and draw `snapshot`. Returns the number of lines
/// drawn, to be passed back as `previous_lines` next time.
pub fn draw_progress<W: Write>(
    out: &mut W,
    snapshot: &ProgressSnapshot,
    previous_lines: usize,
    theme: &Theme,
) -> io::Result<usize> {
    for i in 0..previous_lines {
        if i > 0 {
            queue!(out, cursor::MoveUp(1))?;
        }
        queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    }

    let mut lines = 0;
    for activity in snapshot.activity.iter().filter(|a| !a.is_empty()) {
        writeln!(out, "{}", activity)?;
        lines += 1;
    }

    writeln!(
        out,
        "{} {} checked, {}, {} skipped, {}",
        theme.bold("Files:"),
        snapshot.files_checked,
        theme.paint(format!("{} downloaded", snapshot.files_downloaded), theme.success),
        snapshot.files_skipped,
        theme.paint(format!("{} deleted", snapshot.files_deleted), theme.deleted),
    )?;

    let percentage = snapshot
        .percentage()
        .map(|p| format!(" ({:.1}%)", p))
        .unwrap_or_default();
    writeln!(
        out,
        "{} {} / {} @ {}{}",
        theme.bold("Transfer:"),
        theme.paint(format_bytes(snapshot.transferred()), theme.transfer),
        format_bytes_if_known(snapshot.total_bytes_estimate),
        theme.paint(format!("{}/s", format_bytes(snapshot.bytes_per_second())), theme.transfer),
        percentage,
    )?;

    write!(
        out,
        "{} {}",
        theme.bold("Time:"),
        theme.paint(format_duration(snapshot.elapsed), theme.elapsed),
    )?;
    out.flush()?;

    Ok(lines + SUMMARY_LINES)
}

pub fn checking_line(theme: &Theme, name: &str) -> String {
    format!("{} {}", theme.paint("→ Checking:", theme.checking), name)
}

/// Status of a running transfer; percentage only when the size is known.
pub fn transfer_line(theme: &Theme, name: &str, written: u64, total: Option<u64>) -> String {
    let arrow = theme.paint("↓", theme.transfer);
    match total {
        Some(total) if total > 0 => {
            let pct = written as f64 / total as f64 * 100.0;
            format!(
                "{} {} {}",
                arrow,
                name,
                theme.dim(format!(
                    "{:.0}% {}/{}",
                    pct,
                    format_bytes(written),
                    format_bytes(total)
                ))
            )
        }
        _ => format!("{} {} {}", arrow, name, theme.dim(format_bytes(written))),
    }
}

pub fn done_line(theme: &Theme, name: &str, bytes: u64) -> String {
    format!(
        "{} {} {}",
        theme.paint("✓", theme.success),
        name,
        theme.dim(format!("({})", format_bytes(bytes)))
    )
}
