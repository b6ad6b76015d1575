//! Wait instruction generation

use super::commands::opcode;

/// Longest wait a single short-wait byte can express
pub const MAX_SHORT_WAIT: u64 = opcode::MAX_SHORT_WAIT as u64;

/// Longest wait a single long-wait instruction can express
pub const MAX_LONG_WAIT: u64 = u16::MAX as u64;

/// Generate wait instructions covering `ms` milliseconds
///
/// Returns a vector of bytes representing the bytecode
pub fn generate_wait(ms: u64) -> Vec<u8> {
    let mut out = Vec::new();
    push_wait(&mut out, ms);
    out
}

/// Append wait instructions covering `ms` milliseconds to `out`
pub fn push_wait(out: &mut Vec<u8>, mut ms: u64) {
    while ms > 0 {
        if ms <= MAX_SHORT_WAIT {
            // The opcode is the duration
            out.push(ms as u8);
            break;
        }

        // Always at least MAX_SHORT_WAIT + 1 here
        let chunk = ms.min(MAX_LONG_WAIT);
        out.push(opcode::LONG_WAIT);
        out.extend_from_slice(&(chunk as u16).to_le_bytes());
        ms -= chunk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::commands::{decode, Instruction};

    #[test]
    fn test_zero_wait() {
        assert!(generate_wait(0).is_empty());
    }

    #[test]
    fn test_short_wait() {
        assert_eq!(generate_wait(1), vec![0x01]);
        assert_eq!(generate_wait(100), vec![0x64]);
        assert_eq!(generate_wait(239), vec![0xEF]);
    }

    #[test]
    fn test_long_wait_boundary() {
        assert_eq!(generate_wait(240), vec![0xF0, 0xF0, 0x00]);
        assert_eq!(generate_wait(1000), vec![0xF0, 0xE8, 0x03]);
        assert_eq!(generate_wait(65535), vec![0xF0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_long_wait_with_short_tail() {
        assert_eq!(generate_wait(65535 + 10), vec![0xF0, 0xFF, 0xFF, 0x0A]);
    }

    #[test]
    fn test_very_long_wait_sums_exactly() {
        for total in [100_000u64, 131_070, 1_000_000] {
            let mut bytes = generate_wait(total);
            bytes.push(opcode::END);
            let instructions = decode(&bytes).unwrap();

            let sum: u64 = instructions
                .iter()
                .filter_map(|i| i.wait_ms())
                .map(u64::from)
                .sum();
            assert_eq!(sum, total);
            assert!(instructions
                .iter()
                .all(|i| !matches!(i, Instruction::ShortWait { ms: 0 })));
        }

        assert_eq!(
            generate_wait(100_000),
            vec![0xF0, 0xFF, 0xFF, 0xF0, 0xA1, 0x86]
        );
    }
}
