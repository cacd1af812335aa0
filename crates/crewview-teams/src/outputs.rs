//! Tail reads of agent `.output` logs.
//!
//! Logs can grow without bound, so files are read backwards from the end in
//! chunks until the last [`TAIL_LINES`] lines are in hand.

use std::io::SeekFrom;
use std::path::Path;
use std::time::SystemTime;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::errors::TeamsError;
use crate::roots::{DataRoots, OUTPUT_EXTENSION};
use crate::scanner::system_time_rfc3339;
use crate::types::AgentOutput;

pub const TAIL_LINES: usize = 100;
const TAIL_CHUNK_BYTES: u64 = 64 * 1024;
/// Upper bound on bytes read per file, for logs with pathological line lengths.
const TAIL_MAX_BYTES: u64 = 16 * 1024 * 1024;

/// Last `max_lines` lines of a file, reading at most `max_bytes` from its end.
async fn tail_lines_within(
    path: &Path,
    max_lines: usize,
    max_bytes: u64,
) -> std::io::Result<Vec<String>> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let floor = len.saturating_sub(max_bytes);

    let mut start = len;
    let mut buf: Vec<u8> = Vec::new();
    while start > floor {
        let next = start.saturating_sub(TAIL_CHUNK_BYTES).max(floor);
        let mut chunk = vec![0u8; (start - next) as usize];
        file.seek(SeekFrom::Start(next)).await?;
        file.read_exact(&mut chunk).await?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
        start = next;

        // Every newline before the final byte begins a complete line.
        let body = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        if body.iter().filter(|&&b| b == b'\n').count() >= max_lines {
            break;
        }
    }

    // The first line is partial unless the window starts right after a newline.
    let starts_mid_line = if start == 0 {
        false
    } else {
        let mut before = [0u8; 1];
        file.seek(SeekFrom::Start(start - 1)).await?;
        file.read_exact(&mut before).await?;
        before[0] != b'\n'
    };

    let text = String::from_utf8_lossy(&buf);
    let mut lines: Vec<&str> = text.lines().collect();
    if starts_mid_line && !lines.is_empty() {
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].iter().map(|l| l.to_string()).collect())
}

async fn tail_lines(path: &Path, max_lines: usize) -> std::io::Result<Vec<String>> {
    tail_lines_within(path, max_lines, TAIL_MAX_BYTES).await
}

async fn read_output(path: &Path) -> Option<(Option<SystemTime>, AgentOutput)> {
    let file_name = path.file_name()?.to_str()?.to_string();
    let id = path.file_stem()?.to_str()?.to_string();
    let modified = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok());

    match tail_lines(path, TAIL_LINES).await {
        Ok(lines) => Some((
            modified,
            AgentOutput {
                id,
                file_name,
                line_count: lines.len(),
                content: lines.join("\n"),
                modified_at: modified.map(system_time_rfc3339),
            },
        )),
        Err(e) => {
            tracing::warn!(
                event = "teams.outputs.read_failed",
                path = %path.display(),
                error = %e
            );
            None
        }
    }
}

/// All `*.output` logs in the outputs root, most recently modified first.
pub async fn get_agent_outputs(roots: &DataRoots) -> Vec<AgentOutput> {
    let mut entries = match tokio::fs::read_dir(&roots.outputs).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(
                event = "teams.outputs.read_dir_failed",
                path = %roots.outputs.display(),
                error = %e
            );
            return Vec::new();
        }
    };

    let mut outputs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != OUTPUT_EXTENSION) {
            continue;
        }
        if let Some(output) = read_output(&path).await {
            outputs.push(output);
        }
    }

    outputs.sort_by(|a, b| b.0.cmp(&a.0));
    outputs.into_iter().map(|(_, o)| o).collect()
}

/// One output log by id. `Ok(None)` if it does not exist.
pub async fn read_agent_output(
    roots: &DataRoots,
    id: &str,
) -> Result<Option<AgentOutput>, TeamsError> {
    let path = roots.output_file(id)?;
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(None);
    }
    Ok(read_output(&path).await.map(|(_, o)| o))
}
