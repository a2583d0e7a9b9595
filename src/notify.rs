//! User-visible notices.
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Info(String),
    Error(String),
    /// The guide could not be shown; offer to open it again.
    OpenLastGuide,
    /// Same for the child guide and its named context.
    OpenLastChildGuide,
    /// Generation blocked by quota rather than by a hard error.
    QuotaExceeded { used: u32, limit: u32 },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(msg) | Notice::Info(msg) => info!("{}", msg),
            Notice::Error(msg) => warn!("{}", msg),
            Notice::OpenLastGuide => {
                warn!("the guide viewer was blocked; the guide is kept as the last guide")
            }
            Notice::OpenLastChildGuide => {
                warn!("the child guide viewer was blocked; the child guide is kept for reopening")
            }
            Notice::QuotaExceeded { used, limit } => warn!(
                used,
                limit, "monthly guide limit reached; upgrade your plan to generate more"
            ),
        }
    }
}

/// Describe detected characters, listing at most the first three.
pub fn character_summary<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let names: Vec<&String> = names.into_iter().collect();
    if names.is_empty() {
        return None;
    }
    let shown: Vec<&str> = names.iter().take(3).map(|n| n.as_str()).collect();
    let mut summary = format!("Characters detected: {}", shown.join(", "));
    if names.len() > 3 {
        summary.push_str(&format!(" (+{} more)", names.len() - 3));
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_caps_at_three() {
        let names: Vec<String> = ["ALEX", "JORDAN", "KIM", "RIVER"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            character_summary(&names).unwrap(),
            "Characters detected: ALEX, JORDAN, KIM (+1 more)"
        );
        assert_eq!(
            character_summary(&names[..1]).unwrap(),
            "Characters detected: ALEX"
        );
        assert!(character_summary(&Vec::<String>::new()).is_none());
    }
}
