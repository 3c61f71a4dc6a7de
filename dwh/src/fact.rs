//! Substitution of dimension surrogate keys into fact rows.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::bail;
use crate::dimension::SurrogateKeyTable;
use crate::error::{ErrorKind, EtlResult};
use crate::report::{FactLoadReport, RoleReport};
use crate::types::{NaturalKey, SurrogateKey, TableName};

/// How many missing keys of a role are named in the end of load warning.
const MISSING_KEY_SAMPLE: usize = 10;

/// A dimension referenced by a fact table, e.g. the customer of a sale.
#[derive(Debug, Clone, Copy)]
pub struct FactRole<'a> {
    pub name: &'static str,
    pub dimension: &'a SurrogateKeyTable,
}

/// Distinct natural keys of one role that did not resolve during a fact load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MissingKeySet {
    occurrences: u64,
    seen: HashSet<NaturalKey>,
    keys: Vec<NaturalKey>,
}

impl MissingKeySet {
    pub fn record(&mut self, key: &NaturalKey) {
        self.occurrences += 1;
        if self.seen.insert(key.clone()) {
            self.keys.push(key.clone());
        }
    }

    /// Number of fact rows that referenced a missing key of the role.
    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }

    pub fn distinct(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.seen.contains(key)
    }

    /// Missing keys in first-seen order.
    pub fn keys(&self) -> &[NaturalKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Resolves the natural keys of fact rows against the dimension tables of their roles.
///
/// A row is accepted only if every role resolves. Otherwise it is skipped and each
/// unresolved key lands in the [`MissingKeySet`] of its role. The resolver only reads the
/// dimension tables.
#[derive(Debug)]
pub struct FactResolver<'a> {
    roles: Vec<FactRole<'a>>,
    missing: Vec<MissingKeySet>,
    accepted: u64,
    skipped: u64,
}

impl<'a> FactResolver<'a> {
    pub fn new(roles: Vec<FactRole<'a>>) -> Self {
        let missing = vec![MissingKeySet::default(); roles.len()];

        Self {
            roles,
            missing,
            accepted: 0,
            skipped: 0,
        }
    }

    /// Resolves one fact row given the natural key of every role, in role order.
    ///
    /// Returns the surrogate keys in role order, or [`None`] if the row must be skipped.
    pub fn resolve<const N: usize>(
        &mut self,
        natural_keys: &[NaturalKey; N],
    ) -> EtlResult<Option<[SurrogateKey; N]>> {
        if N != self.roles.len() {
            bail!(
                ErrorKind::InvalidData,
                "Fact row does not provide a key for every role",
                format!(
                    "expected {} keys, got {}",
                    self.roles.len(),
                    N
                )
            );
        }

        let mut surrogate_keys = [SurrogateKey::FIRST; N];
        let mut complete = true;
        for (((role, missing), natural_key), slot) in self
            .roles
            .iter()
            .zip(self.missing.iter_mut())
            .zip(natural_keys)
            .zip(surrogate_keys.iter_mut())
        {
            match role.dimension.key_for(natural_key) {
                Some(surrogate_key) => *slot = surrogate_key,
                None => {
                    missing.record(natural_key);
                    complete = false;
                }
            }
        }

        if complete {
            self.accepted += 1;
            Ok(Some(surrogate_keys))
        } else {
            self.skipped += 1;
            Ok(None)
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn missing(&self, role: &str) -> Option<&MissingKeySet> {
        self.roles
            .iter()
            .position(|candidate| candidate.name == role)
            .map(|index| &self.missing[index])
    }

    /// Ends the load of `table`, logging the outcome and the unresolved keys per role.
    pub fn into_report(self, table: TableName) -> FactLoadReport {
        info!(
            table = %table,
            accepted = self.accepted,
            skipped = self.skipped,
            "resolved fact rows"
        );

        let roles = self
            .roles
            .iter()
            .zip(self.missing)
            .map(|(role, missing)| {
                if !missing.is_empty() {
                    let sample = missing
                        .keys()
                        .iter()
                        .take(MISSING_KEY_SAMPLE)
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    warn!(
                        table = %table,
                        role = role.name,
                        occurrences = missing.occurrences(),
                        distinct = missing.distinct(),
                        sample = %sample,
                        "fact rows skipped because of unknown keys"
                    );
                }

                RoleReport {
                    role: role.name,
                    missing,
                }
            })
            .collect();

        FactLoadReport {
            table,
            accepted: self.accepted,
            skipped: self.skipped,
            roles,
        }
    }
}
