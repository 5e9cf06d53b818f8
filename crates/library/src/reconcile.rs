use std::collections::{BTreeSet, HashSet};

/// Result of comparing discovered source files against the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Discovered names with no ledger row, sorted.
    pub pending: Vec<String>,
    /// Discovered names skipped because the ledger already knows them.
    pub already_known: usize,
}

/// Every discovered name not in `known`, sorted lexicographically and
/// without duplicates.
pub fn reconcile<I, S>(discovered: I, known: &HashSet<String>) -> Reconciliation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let discovered: BTreeSet<String> = discovered.into_iter().map(Into::into).collect();
    let mut reconciliation = Reconciliation::default();
    for name in discovered {
        if known.contains(&name) {
            tracing::debug!(file = %name, "skipping file already in ledger");
            reconciliation.already_known += 1;
        } else {
            reconciliation.pending.push(name);
        }
    }
    reconciliation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[rstest]
    #[case(&[], &[], &[], 0)]
    #[case(&["a.jpg", "b.jpg"], &["a.jpg"], &["b.jpg"], 1)]
    #[case(&["c.png", "a.png", "b.png"], &[], &["a.png", "b.png", "c.png"], 0)]
    #[case(&["a.png"], &["a.png", "z.png"], &[], 1)]
    #[case(&["B.png", "a.png"], &[], &["B.png", "a.png"], 0)]
    fn test_reconcile(
        #[case] discovered: &[&str],
        #[case] known: &[&str],
        #[case] pending: &[&str],
        #[case] already_known: usize,
    ) {
        let result = reconcile(discovered.iter().copied(), &set(known));
        assert_eq!(result.pending, pending);
        assert_eq!(result.already_known, already_known);
    }

    #[test]
    fn test_excludes_every_known_original() {
        let known = set(&["1.png", "3.png", "5.png"]);
        let discovered = (1..=6).map(|i| format!("{i}.png"));
        let result = reconcile(discovered, &known);
        assert!(result.pending.iter().all(|name| !known.contains(name)));
        assert_eq!(result.pending.len() + result.already_known, 6);
    }
}
