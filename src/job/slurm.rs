//! SLURM batch script header

use super::shell_quote;
use std::path::PathBuf;

/// Parse a memory size such as `96G`, `512M` or `1024` into bytes
pub fn parse_memory(text: &str) -> Option<u64> {
    let text = text.trim().to_uppercase();
    let text = text.strip_suffix('B').unwrap_or(&text);

    let (number, multiplier) = if let Some(number) = text.strip_suffix('T') {
        (number, 1024 * 1024 * 1024 * 1024u64)
    } else if let Some(number) = text.strip_suffix('G') {
        (number, 1024 * 1024 * 1024u64)
    } else if let Some(number) = text.strip_suffix('M') {
        (number, 1024 * 1024u64)
    } else if let Some(number) = text.strip_suffix('K') {
        (number, 1024u64)
    } else {
        (text, 1u64)
    };

    number.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

/// Parse a SLURM time string: `D-HH:MM:SS`, `HH:MM:SS` or `MM:SS`
pub fn parse_slurm_time(text: &str) -> Option<u64> {
    let (days, time) = match text.trim().split_once('-') {
        Some((days, time)) => (days.parse::<u64>().ok()?, time),
        None => (0, text.trim()),
    };

    let parts = time
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        [minutes, seconds] => (0, *minutes, *seconds),
        _ => return None,
    };

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(days * 86400 + hours * 3600 + minutes * 60 + seconds)
}

/// Format seconds as a SLURM time limit
pub fn format_slurm_time(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

/// Memory request of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    /// All memory of every allocated node, without binding
    FullNode,
    /// Memory bound to the local NUMA domain, optionally sized in bytes per node
    Local { bytes: Option<u64> },
}

/// `#SBATCH` directives of a batch script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmHeader {
    pub nodes: u64,
    pub ntasks: u64,
    pub cpus_per_task: u64,
    pub output: PathBuf,
    pub partition: Option<String>,
    /// Formatted time limit
    pub time: Option<String>,
    pub memory: Memory,
}

impl SlurmHeader {
    /// Header lines, one directive each
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("#SBATCH --nodes={}", self.nodes),
            format!("#SBATCH --ntasks={}", self.ntasks),
            format!("#SBATCH --cpus-per-task={}", self.cpus_per_task),
            format!("#SBATCH --output={}", shell_quote(&self.output.display().to_string())),
        ];

        if let Some(partition) = &self.partition {
            lines.push(format!("#SBATCH --partition={}", partition));
        }

        if let Some(time) = &self.time {
            lines.push(format!("#SBATCH --time={}", time));
        }

        match self.memory {
            Memory::FullNode => lines.push("#SBATCH --mem=0".to_string()),
            Memory::Local { bytes } => {
                if let Some(bytes) = bytes {
                    lines.push(format!("#SBATCH --mem={}M", bytes / (1024 * 1024)));
                }
                lines.push("#SBATCH --mem-bind=local".to_string());
            }
        }

        lines
    }
}
