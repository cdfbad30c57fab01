use std::time::Instant;
use tracing::info;

/// Logs when a long command starts and how long it ran once dropped.
pub struct Timer {
    what: &'static str,
    since: Instant,
}

impl Timer {
    pub fn start(what: &'static str) -> Self {
        info!("⏱  {} started", what);
        Self {
            what,
            since: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("⏱  {} finished in {:.2?}", self.what, self.since.elapsed());
    }
}

/// Row counts grouped in threes with a space, the way the price site prints
/// its own figures: `1 234 567`.
pub fn fmt_count(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Fresh per-test directory under the system temp dir.
#[cfg(test)]
pub fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("grain_prices_{}_{}_{}", tag, std::process::id(), nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_space_grouped() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1_000), "1 000");
        assert_eq!(fmt_count(12_345), "12 345");
        assert_eq!(fmt_count(1_234_567), "1 234 567");
    }
}
