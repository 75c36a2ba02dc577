//! Dependency ordering of tables for data loading.
//!
//! Tables are loaded parents first so that rows referenced by a foreign key
//! exist before the rows that reference them. Ordering uses layered Kahn
//! passes; tables that become ready in the same pass keep their input order.

use std::collections::HashSet;

use tracing::{debug, warn};

/// Load order plus anything worth reporting about how it was reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderResult {
    pub order: Vec<String>,
    pub warnings: Vec<String>,
}

/// Order `tables` so each table follows the tables it references.
///
/// `deps_of` returns the tables a table references. References outside the
/// input set and self-references are ignored. Names compare
/// case-insensitively; duplicates in the input are dropped.
///
/// When a cycle blocks progress, every remaining table is appended in input
/// order and a warning names them.
pub fn order_tables<F>(tables: &[String], deps_of: F) -> OrderResult
where
    F: Fn(&str) -> Vec<String>,
{
    let mut seen = HashSet::new();
    let names: Vec<&String> = tables
        .iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect();
    let members: HashSet<String> = names.iter().map(|t| t.to_lowercase()).collect();

    let deps: Vec<HashSet<String>> = names
        .iter()
        .map(|t| {
            let own = t.to_lowercase();
            deps_of(t)
                .into_iter()
                .map(|d| d.to_lowercase())
                .filter(|d| *d != own && members.contains(d))
                .collect()
        })
        .collect();

    let n = names.len();
    let max_passes = 2 * n;
    let mut result = OrderResult::default();
    let mut emitted: HashSet<String> = HashSet::with_capacity(n);
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut passes = 0;

    while !remaining.is_empty() {
        if passes >= max_passes {
            let leftover: Vec<&str> = remaining.iter().map(|&i| names[i].as_str()).collect();
            let msg = format!(
                "Dependency ordering stopped after {} passes; appending {} tables unordered: {}",
                passes,
                leftover.len(),
                leftover.join(", ")
            );
            warn!("{}", msg);
            result.warnings.push(msg);
            result
                .order
                .extend(remaining.iter().map(|&i| names[i].clone()));
            break;
        }
        passes += 1;

        let (ready, blocked): (Vec<usize>, Vec<usize>) = remaining
            .iter()
            .partition(|&&i| deps[i].iter().all(|d| emitted.contains(d)));

        if ready.is_empty() {
            let cyclic: Vec<&str> = blocked.iter().map(|&i| names[i].as_str()).collect();
            let msg = format!(
                "Circular foreign key dependency among tables: {}; loading them in input order",
                cyclic.join(", ")
            );
            warn!("{}", msg);
            result.warnings.push(msg);
            result.order.extend(blocked.iter().map(|&i| names[i].clone()));
            break;
        }

        debug!("Ordering pass {}: {} tables ready", passes, ready.len());
        for &i in &ready {
            emitted.insert(names[i].to_lowercase());
            result.order.push(names[i].clone());
        }
        remaining = blocked;
    }

    result
}
