//! Fault reports carried through the escalation pipeline.

/// Everything an escalation channel needs to produce a human-readable report
/// about one failure. Built by the failure site; the pipeline stamps the
/// ambient fields (command line, worker, version, log excerpts) at notify
/// time.
#[derive(Debug, Clone, Default)]
pub struct FaultReport {
    /// Top-level error text.
    pub error: String,
    /// Underlying causes, outermost first.
    pub causes: Vec<String>,
    /// Expected operational failure vs. unhandled fault.
    pub was_expected: bool,
    /// Operational log excerpts.
    pub logs: Vec<String>,
    pub version: Option<String>,
    pub command_line: Option<String>,
    pub worker: Option<String>,
}

impl FaultReport {
    /// An anticipated operational failure (transport rejection, commit
    /// failure, exhaustion).
    pub fn expected(error: &dyn std::error::Error) -> Self {
        Self::from_error(error, true)
    }

    /// A fault nothing in the cycle anticipated.
    pub fn unexpected(error: &dyn std::error::Error) -> Self {
        Self::from_error(error, false)
    }

    /// An aggregated, expected failure class: one summary line plus the set
    /// of distinct underlying causes observed during the cycle.
    pub fn aggregate(error: impl Into<String>, causes: Vec<String>) -> Self {
        Self {
            error: error.into(),
            causes,
            was_expected: true,
            ..Default::default()
        }
    }

    fn from_error(error: &dyn std::error::Error, was_expected: bool) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            error: error.to_string(),
            causes,
            was_expected,
            ..Default::default()
        }
    }

    /// The human-readable report delivered to operators.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.was_expected {
            out.push_str("UNEXPECTED ERROR\n\n");
        }
        out.push_str("Error ");
        out.push_str(&self.error);
        out.push('\n');
        for cause in &self.causes {
            out.push_str("caused by: ");
            out.push_str(cause);
            out.push('\n');
        }
        if let Some(command_line) = &self.command_line {
            out.push_str(&format!("command_line: {command_line}\n"));
        }
        if let Some(version) = &self.version {
            out.push_str(&format!("version: {version}\n"));
        }
        if let Some(worker) = &self.worker {
            out.push_str(&format!("worker: {worker}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhrasedropError;

    #[test]
    fn test_unexpected_banner() {
        let err = PhrasedropError::Channel("boom".into());
        let rendered = FaultReport::unexpected(&err).render();
        assert!(rendered.starts_with("UNEXPECTED ERROR"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn test_expected_has_no_banner() {
        let err = PhrasedropError::Channel("boom".into());
        let rendered = FaultReport::expected(&err).render();
        assert!(!rendered.contains("UNEXPECTED"));
    }

    #[test]
    fn test_cause_chain_is_walked() {
        let io = std::io::Error::other("disk on fire");
        let err = PhrasedropError::Io(io);
        let report = FaultReport::expected(&err);
        assert_eq!(report.causes, vec!["disk on fire".to_string()]);
    }

    #[test]
    fn test_ambient_fields_rendered() {
        let mut report = FaultReport::aggregate("failed to send 3 messages", vec!["timeout".into()]);
        report.version = Some("0.2.0".into());
        report.command_line = Some("phrasedrop start".into());
        report.worker = Some("tokio-runtime-worker".into());
        let rendered = report.render();
        assert!(rendered.contains("caused by: timeout"));
        assert!(rendered.contains("command_line: phrasedrop start"));
        assert!(rendered.contains("version: 0.2.0"));
        assert!(rendered.contains("worker: tokio-runtime-worker"));
    }
}
