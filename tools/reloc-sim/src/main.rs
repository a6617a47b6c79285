//! Host-side harness for `kernel-reloc`.
//!
//! Reads a text file of whitespace-separated hex triples `d s l` per line:
//! a `d` of zero describes a free scratch region `(start=s, len=l)` to add
//! to the map; any other `d` describes a desired relocation `(dst=d,
//! src=s, len=l)`. Runs the planner and prints the emitted schedule as
//! `0x{len:08x} bytes at 0x{src:08x} -> 0x{dst:08x}`, one line per copy.
//!
//! Exit codes: `0` on success, `1` if the planner reports the instance is
//! infeasible, `2` if the input file could not be read or parsed.

use kernel_reloc::{compute_movelist, Addr, AddressMap, MoveEntry, RegionKind};
use std::{env, fs, process};

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: reloc-sim <input-file>");
        process::exit(2);
    };

    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("reloc-sim: failed to read {path}: {e}");
            process::exit(2);
        }
    };

    let (ifrags, memmap) = match parse(&text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("reloc-sim: malformed input: {e}");
            process::exit(2);
        }
    };

    match compute_movelist(&ifrags, &memmap) {
        Ok(moves) => {
            for m in &moves {
                println!(
                    "{:#010x} bytes at {:#010x} -> {:#010x}",
                    m.len,
                    m.src.as_u64(),
                    m.dst.as_u64()
                );
            }
        }
        Err(e) => {
            eprintln!("reloc-sim: infeasible: {e}");
            process::exit(1);
        }
    }
}

/// Parses the hex-triple format into a pending move list and the initial
/// free-space map. Blank lines and `#`-prefixed comments are skipped (an
/// addition over the original's bare triples, to keep hand-written test
/// fixtures readable).
fn parse(text: &str) -> Result<(Vec<MoveEntry>, AddressMap), String> {
    let mut ifrags = Vec::new();
    let mut memmap = AddressMap::new();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let d = parse_hex_field(fields.next(), lineno)?;
        let s = parse_hex_field(fields.next(), lineno)?;
        let l = parse_hex_field(fields.next(), lineno)?;
        if fields.next().is_some() {
            return Err(format!("line {}: expected exactly 3 fields", lineno + 1));
        }
        if l == 0 {
            return Err(format!("line {}: length must be nonzero", lineno + 1));
        }

        if d == 0 {
            memmap
                .add(Addr::new(s), l, RegionKind::Free)
                .map_err(|e| format!("line {}: {e}", lineno + 1))?;
        } else {
            ifrags.push(MoveEntry::new(Addr::new(d), Addr::new(s), l));
        }
    }

    Ok((ifrags, memmap))
}

fn parse_hex_field(field: Option<&str>, lineno: usize) -> Result<u64, String> {
    let field = field.ok_or_else(|| {
        format!("line {}: expected 3 whitespace-separated hex fields", lineno + 1)
    })?;
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u64::from_str_radix(digits, 16).map_err(|e| format!("line {}: '{field}' is not hex: {e}", lineno + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_free_region_and_move() {
        let (ifrags, map) = parse("0 2000 1000\n2000 1000 1000\n").unwrap();
        assert_eq!(ifrags, alloc_entry_vec(&[(0x2000, 0x1000, 0x1000)]));
        assert!(map.is_free_zone(Addr::new(0x2000), 0x1000).is_some());
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let (ifrags, _) = parse("# a comment\n\n2000 1000 1000\n").unwrap();
        assert_eq!(ifrags.len(), 1);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse("2000 1000\n").is_err());
        assert!(parse("2000 1000 1000 extra\n").is_err());
    }

    #[test]
    fn rejects_non_hex_field() {
        assert!(parse("zzzz 1000 1000\n").is_err());
    }

    #[test]
    fn rejects_zero_length() {
        assert!(parse("2000 1000 0\n").is_err());
    }

    fn alloc_entry_vec(vals: &[(u64, u64, u64)]) -> Vec<MoveEntry> {
        vals.iter()
            .map(|(d, s, l)| MoveEntry::new(Addr::new(*d), Addr::new(*s), *l))
            .collect()
    }
}
