//! records.rs: Reading and writing record files
//!
//! `.bin` files hold the firmware layout: one 72-byte command, or any number
//! of back-to-back 696-byte state records. Anything else is JSON; state files
//! are newline-delimited, one record per line.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use clap::ValueEnum;
use tracing::warn;

use uwbot_types::wire::{
    decode_command, decode_state, encode_command, encode_state, STATE_WIRE_LEN,
};
use uwbot_types::{CommandRecord, StateRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Command,
    State,
}

pub fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("bin"))
}

pub fn read_command(path: &Path) -> anyhow::Result<CommandRecord> {
    if is_binary(path) {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        return decode_command(&bytes).with_context(|| format!("decoding {}", path.display()));
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn read_states(path: &Path) -> anyhow::Result<Vec<StateRecord>> {
    if is_binary(path) {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        return split_states(&bytes).with_context(|| format!("decoding {}", path.display()));
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_ndjson(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Each record decodes on its own; a truncated tail is dropped with a warning
/// so one bad write does not cost the rest of the session.
pub fn split_states(bytes: &[u8]) -> anyhow::Result<Vec<StateRecord>> {
    if bytes.len() < STATE_WIRE_LEN {
        bail!("{} bytes is shorter than one {STATE_WIRE_LEN}-byte record", bytes.len());
    }
    let chunks = bytes.chunks_exact(STATE_WIRE_LEN);
    let tail = chunks.remainder().len();
    let mut states = Vec::with_capacity(bytes.len() / STATE_WIRE_LEN);
    for (i, chunk) in chunks.enumerate() {
        match decode_state(chunk) {
            Ok(state) => states.push(state),
            Err(e) => warn!("skipping state record {i}: {e}"),
        }
    }
    if tail != 0 {
        warn!("ignoring {tail} trailing byte(s) after {} record(s)", states.len());
    }
    Ok(states)
}

fn parse_ndjson(text: &str) -> anyhow::Result<Vec<StateRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("line {}", n + 1)))
        .collect()
}

pub fn write_command_bin(out: &mut impl Write, cmd: &CommandRecord) -> anyhow::Result<()> {
    out.write_all(&encode_command(cmd))?;
    Ok(())
}

pub fn write_states_bin(out: &mut impl Write, states: &[StateRecord]) -> anyhow::Result<()> {
    for s in states {
        out.write_all(&encode_state(s))?;
    }
    Ok(())
}

pub fn write_states_ndjson(out: &mut impl Write, states: &[StateRecord]) -> anyhow::Result<()> {
    for s in states {
        serde_json::to_writer(&mut *out, s)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_state_stream_splits_into_records() {
        let mut first = StateRecord::default();
        first.diagnostics.uptime_s = 10;
        let mut second = first.clone();
        second.diagnostics.uptime_s = 11;

        let mut buf = Vec::new();
        write_states_bin(&mut buf, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(buf.len(), 2 * STATE_WIRE_LEN);
        assert_eq!(split_states(&buf).unwrap(), vec![first.clone(), second]);

        buf.pop();
        assert_eq!(split_states(&buf).unwrap(), vec![first]);
        assert!(split_states(&buf[..STATE_WIRE_LEN - 1]).is_err());
    }

    #[test]
    fn one_odd_flag_byte_keeps_the_whole_session() {
        let mut states = vec![StateRecord::default(); 3];
        for (i, s) in states.iter_mut().enumerate() {
            s.diagnostics.uptime_s = 100 + i as u32;
        }
        let mut buf = Vec::new();
        write_states_bin(&mut buf, &states).unwrap();
        buf[STATE_WIRE_LEN + 687] = 0xFF; // leak_detected of the middle record

        let decoded = split_states(&buf).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[1].diagnostics.leak_detected);
        assert!(!decoded[0].diagnostics.leak_detected);
        assert_eq!(decoded[2].diagnostics.uptime_s, 102);
    }

    #[test]
    fn ndjson_skips_blank_lines_and_reports_line_numbers() {
        let mut buf = Vec::new();
        write_states_ndjson(&mut buf, &[StateRecord::default()]).unwrap();
        let mut text = String::from_utf8(buf).unwrap();
        text.push('\n');
        assert_eq!(parse_ndjson(&text).unwrap().len(), 1);

        text.push_str("{not json}\n");
        let err = parse_ndjson(&text).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }

    #[test]
    fn command_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandRecord { mode_wheel: true, speed_level: 3, ..Default::default() };

        let bin = dir.path().join("cmd.bin");
        let mut f = std::fs::File::create(&bin).unwrap();
        write_command_bin(&mut f, &cmd).unwrap();
        drop(f);
        assert_eq!(read_command(&bin).unwrap(), cmd);

        let json = dir.path().join("cmd.json");
        std::fs::write(&json, serde_json::to_string(&cmd).unwrap()).unwrap();
        assert_eq!(read_command(&json).unwrap(), cmd);
    }
}
