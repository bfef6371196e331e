//! Credential set reconciliation.
//!
//! Merge is a pure function over two credential sets. Identity is the
//! credential id; recency is the modification timestamp. The caller decides
//! what to do with the reconciled set.

use passfort_vault::Credential;
use std::collections::HashMap;
use uuid::Uuid;

/// What happened to each entry during a merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries that existed only remotely and were added.
    pub added: usize,
    /// Entries where the remote copy was newer and replaced the local one.
    pub updated: usize,
    /// Same-timestamp content conflicts resolved in favor of local.
    pub conflicts_kept_local: usize,
    /// Same-timestamp content conflicts resolved in favor of remote.
    pub conflicts_kept_remote: usize,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.added == 0
            && self.updated == 0
            && self.conflicts_kept_local == 0
            && self.conflicts_kept_remote == 0
    }
}

/// Reconciles `remote` into `local` by id and last-modified timestamp.
///
/// Local-only entries always survive; remote-only entries are added; for
/// entries present on both sides, the more recently modified copy wins.
/// Equal timestamps with differing content resolve to the remote copy.
/// Local entry order is preserved; added entries append in remote order.
pub fn merge(
    local: &[Credential],
    remote: &[Credential],
) -> (Vec<Credential>, MergeOutcome) {
    let mut outcome = MergeOutcome::default();
    let remote_by_id: HashMap<Uuid, &Credential> =
        remote.iter().map(|c| (c.id, c)).collect();

    let mut merged: Vec<Credential> = Vec::with_capacity(local.len() + remote.len());
    for ours in local {
        match remote_by_id.get(&ours.id) {
            Some(theirs) => match pick(ours, theirs) {
                Winner::Local => {
                    if **theirs != *ours {
                        outcome.conflicts_kept_local += 1;
                    }
                    merged.push(ours.clone());
                }
                Winner::Remote => {
                    if ours.modified_at == theirs.modified_at {
                        outcome.conflicts_kept_remote += 1;
                    } else {
                        outcome.updated += 1;
                    }
                    merged.push((*theirs).clone());
                }
                Winner::Identical => merged.push(ours.clone()),
            },
            None => merged.push(ours.clone()),
        }
    }

    let local_ids: HashMap<Uuid, ()> = local.iter().map(|c| (c.id, ())).collect();
    for theirs in remote {
        if !local_ids.contains_key(&theirs.id) {
            outcome.added += 1;
            merged.push(theirs.clone());
        }
    }

    (merged, outcome)
}

enum Winner {
    Local,
    Remote,
    Identical,
}

fn pick(ours: &Credential, theirs: &Credential) -> Winner {
    if ours == theirs {
        return Winner::Identical;
    }
    if ours.modified_at > theirs.modified_at {
        Winner::Local
    } else {
        // Equal timestamps with differing content: the remote copy wins so
        // every replica converges to the same choice.
        Winner::Remote
    }
}
