/// Lifecycle of a single job.
///
/// `Pending → Fetching → Transforming → Converting → Writing → Done`, with
/// `Failed` reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Pending,
    Fetching,
    Transforming,
    Converting,
    Writing,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// The stage that follows `self` on the success path.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Pending => Some(Stage::Fetching),
            Stage::Fetching => Some(Stage::Transforming),
            Stage::Transforming => Some(Stage::Converting),
            Stage::Converting => Some(Stage::Writing),
            Stage::Writing => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn can_advance_to(self, to: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Stage::Failed || self.next() == Some(to)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Fetching => "fetching",
            Stage::Transforming => "transforming",
            Stage::Converting => "converting",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Stage;

    #[test]
    fn success_path_walks_every_stage() {
        let mut stage = Stage::Pending;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(stage.can_advance_to(next));
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Pending,
                Stage::Fetching,
                Stage::Transforming,
                Stage::Converting,
                Stage::Writing,
                Stage::Done
            ]
        );
    }

    #[test]
    fn failed_is_reachable_until_terminal() {
        assert!(Stage::Pending.can_advance_to(Stage::Failed));
        assert!(Stage::Writing.can_advance_to(Stage::Failed));
        assert!(!Stage::Done.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Fetching));
    }

    #[test]
    fn stages_cannot_be_skipped() {
        assert!(!Stage::Pending.can_advance_to(Stage::Converting));
        assert!(!Stage::Converting.can_advance_to(Stage::Fetching));
    }
}
