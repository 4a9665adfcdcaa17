use thiserror::Error;

/// What the processor does with each frame. Detection and tracking never
/// run together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Idle,
    Detecting,
    Tracking,
}

impl Mode {
    /// Whether entering this mode needs a loaded classifier model.
    pub fn needs_classifier(&self) -> bool {
        !matches!(self, Mode::Idle)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::Detecting => write!(f, "detecting"),
            Mode::Tracking => write!(f, "tracking"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(Mode::Idle),
            "detect" | "detecting" => Ok(Mode::Detecting),
            "track" | "tracking" => Ok(Mode::Tracking),
            other => Err(format!("unknown mode '{other}' (expected idle, detect or track)")),
        }
    }
}

/// Why a mode transition was refused. The mode is unchanged in every case.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeError {
    #[error("capture device unavailable")]
    CaptureUnavailable,
    #[error("no classifier model loaded")]
    NoClassifierModel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("idle", Mode::Idle)]
    #[case("detect", Mode::Detecting)]
    #[case("Tracking", Mode::Tracking)]
    fn test_parse(#[case] input: &str, #[case] expected: Mode) {
        assert_eq!(input.parse::<Mode>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("blur".parse::<Mode>().is_err());
    }

    #[test]
    fn test_only_idle_needs_no_classifier() {
        assert!(!Mode::Idle.needs_classifier());
        assert!(Mode::Detecting.needs_classifier());
        assert!(Mode::Tracking.needs_classifier());
    }
}
