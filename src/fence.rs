//! Fenced code block tracking for line-oriented scans.

/// Tracks whether successive lines fall inside a ``` or ~~~ fenced block.
#[derive(Debug, Default)]
pub struct FenceTracker {
    /// Fence character and run length of the currently open fence.
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed the next line. Returns true if the line is a fence delimiter or code.
    pub fn is_code(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let fence = ['`', '~']
            .into_iter()
            .find(|c| return trimmed.starts_with(*c))
            .map(|c| return (c, trimmed.chars().take_while(|x| return *x == c).count()))
            .filter(|(_, n)| return *n >= 3);

        match (self.open, fence) {
            (None, Some(opened)) => {
                self.open = Some(opened);
                return true;
            },
            (Some((c, n)), Some((fc, fn_len))) if c == fc && fn_len >= n && trimmed.trim_start_matches(c).trim().is_empty() => {
                self.open = None;
                return true;
            },
            (Some(_), _) => return true,
            (None, None) => return false,
        }
    }
}
