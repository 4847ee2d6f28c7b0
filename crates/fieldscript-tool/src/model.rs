use anyhow::Result;
use std::path::Path;

/// Reads a script blob out of a file: `skip` bytes in, `len` bytes long (default: to EOF).
pub fn load_blob(path: &Path, skip: usize, len: Option<usize>) -> Result<Vec<u8>> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        payload.len() <= fieldscript_rs::MAX_SCRIPT_LEN,
        "script blob is {} bytes, more than a script can hold",
        payload.len()
    );
    Ok(payload.to_vec())
}

/// Decimal (optionally negative) or `0x` hex.
pub fn parse_num(s: &str) -> Option<i64> {
    let t = s.trim();
    let (neg, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let v = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        t.parse::<i64>().ok()?
    };
    Some(if neg { -v } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_num_hex_dec_and_negative() {
        assert_eq!(parse_num("0x10"), Some(0x10));
        assert_eq!(parse_num("16"), Some(16));
        assert_eq!(parse_num("-16"), Some(-16));
        assert_eq!(parse_num("-0x10"), Some(-16));
        assert_eq!(parse_num("zz"), None);
    }

    #[test]
    fn loader_honours_skip_and_len() {
        let path = std::env::temp_dir().join("_fieldscript_tool_blob.bin");
        std::fs::write(&path, [0u8, 1, 0x5F, 0x00, 4, 5]).unwrap();
        assert_eq!(load_blob(&path, 2, Some(2)).unwrap(), vec![0x5F, 0x00]);
        assert!(load_blob(&path, 7, None).is_err());
        assert!(load_blob(&path, 2, Some(9)).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
