/// Interactive playback commands read from stdin

/// Volume change applied by `+` and `-`
pub const VOLUME_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `p`
    PauseResume,
    /// `n`
    Next,
    /// `+`
    VolumeUp,
    /// `-`
    VolumeDown,
    /// `v <level>`
    SetVolume(i32),
    /// `q`
    Quit,
}

impl Command {
    /// Parse one input line. Returns `None` for blank or unknown input.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = match parts.next()? {
            "p" => Self::PauseResume,
            "n" => Self::Next,
            "+" => Self::VolumeUp,
            "-" => Self::VolumeDown,
            "v" => Self::SetVolume(parts.next()?.parse().ok()?),
            "q" => Self::Quit,
            _ => return None,
        };

        // Trailing arguments make the line ambiguous
        if parts.next().is_some() {
            return None;
        }
        Some(command)
    }
}

pub const HELP: &str = "commands: p pause/resume | n next | + / - volume | v <0-120> set volume | q quit";
