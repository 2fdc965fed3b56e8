//! Merging of sharded test results.
//!
//! A sharded target produces one report per shard. Suites are matched by name at every
//! level of the tree; matched suites have their counters summed and their test cases
//! concatenated, unmatched suites are appended in the order they are first seen.

use crate::model::Suite;
use log::debug;

/**
Merge the reports of all shards of one test target.

The result is a synthetic root without a name whose children are the shard suites,
merged by name. Shards are consumed in iteration order, so the order of the resulting
children is only deterministic if the shards are.

- `shards` the parsed report of every shard, usually in shard index order.
*/
pub fn merge_suites<I>(shards: I) -> Suite
where
    I: IntoIterator<Item = Suite>,
{
    let mut outer = Suite::default();
    for shard in shards {
        outer.add_suite(shard);
    }
    outer
}

impl Suite {
    /// Adds `suite` as a child, merging it into an existing child of the same name.
    ///
    /// Names are compared exactly; two unnamed suites match each other.
    pub fn add_suite(&mut self, suite: Suite) {
        match self.suites.iter().position(|existing| existing.name == suite.name) {
            Some(index) => self.suites[index].merge_with(suite),
            None => self.suites.push(suite),
        }
    }

    /// Merges another shard's copy of this suite into `self`.
    pub fn merge_with(&mut self, other: Suite) {
        debug!("Merging shard results for suite {:?}", other.name);
        let Suite {
            name: _,
            classname,
            tests,
            failures,
            errors,
            skipped,
            disabled,
            time,
            system_out,
            system_err,
            error,
            failure,
            suites,
            decorators,
            test_cases,
        } = other;

        for child in suites {
            self.add_suite(child);
        }
        self.decorators.extend(decorators);
        self.test_cases.extend(test_cases);

        self.tests = self.tests.saturating_add(tests);
        self.failures = self.failures.saturating_add(failures);
        self.errors = self.errors.saturating_add(errors);
        self.skipped = self.skipped.saturating_add(skipped);
        self.disabled = self.disabled.saturating_add(disabled);
        self.time += time;

        // First shard to report these wins.
        self.classname = self.classname.take().or(classname);
        self.system_out = self.system_out.take().or(system_out);
        self.system_err = self.system_err.take().or(system_err);
        self.error = self.error.take().or(error);
        self.failure = self.failure.take().or(failure);
    }
}
