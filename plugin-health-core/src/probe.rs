//! Probe trait and the applicability state machine.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;

use crate::context::ProbeContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::result::{ProbeResult, ResultStatus};

/// Why a probe is (or is not) executed on a plugin in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// No previous result is stored.
    NoPreviousResult,
    /// The previous result was produced by an older probe version.
    SchemaUpgrade,
    /// The previous result is an ERROR, which is never a verdict worth keeping.
    PreviousError,
    /// The probe reads external state that may change at any time.
    ExternalState,
    /// The plugin was released after the previous result.
    NewRelease,
    /// No commit date is known for the sources, so they are assumed changed.
    UnknownCommitDate,
    /// A commit landed after the previous result.
    NewCommit,
    /// Nothing the probe depends on changed.
    UpToDate,
}

impl Applicability {
    /// Whether the check has to run.
    pub fn should_run(self) -> bool {
        self != Self::UpToDate
    }
}

/// A named, versioned health check.
///
/// Implementors provide the static traits and [`Probe::check`]; the engine
/// calls [`Probe::apply`], which decides whether the check runs and turns any
/// error or panic into an ERROR result.
pub trait Probe: Send + Sync {
    /// Unique key, also the id of every result this probe produces.
    fn key(&self) -> &str;

    /// Human-readable purpose.
    fn description(&self) -> &str;

    /// Version of the check logic and its output format.
    fn schema_version(&self) -> u32 {
        1
    }

    /// Only a new release can change the outcome.
    fn requires_release(&self) -> bool {
        false
    }

    /// Only a new commit can change the outcome.
    fn is_source_code_related(&self) -> bool {
        false
    }

    /// Keys of probes that must have succeeded before this one runs.
    fn requirements(&self) -> &[&'static str] {
        &[]
    }

    /// Perform the check.
    ///
    /// Return `Ok` with a FAILURE or ERROR result for verdicts reached by the
    /// probe itself; `Err` for failures of the calls it makes.
    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult>;

    /// Decide whether the check needs to run given the previous result.
    fn applicability(&self, plugin: &Plugin, context: &ProbeContext) -> Applicability {
        let Some(previous) = plugin.result(self.key()) else {
            return Applicability::NoPreviousResult;
        };
        if previous.schema_version() < self.schema_version() {
            return Applicability::SchemaUpgrade;
        }
        if previous.is_error() {
            return Applicability::PreviousError;
        }
        if !self.requires_release() && !self.is_source_code_related() {
            return Applicability::ExternalState;
        }
        if self.requires_release()
            && plugin
                .release_timestamp
                .is_some_and(|released| previous.timestamp() < released)
        {
            return Applicability::NewRelease;
        }
        if self.is_source_code_related() {
            return match context.last_commit_date() {
                None => Applicability::UnknownCommitDate,
                Some(commit) if previous.timestamp() < commit => Applicability::NewCommit,
                Some(_) => Applicability::UpToDate,
            };
        }
        Applicability::UpToDate
    }

    /// First declared requirement without a SUCCESS result.
    fn unmet_requirement(&self, plugin: &Plugin) -> Option<&'static str> {
        self.requirements()
            .iter()
            .copied()
            .find(|key| !plugin.result(key).is_some_and(ProbeResult::is_success))
    }

    /// Run the probe if applicable and its requirements are met.
    ///
    /// Never fails: skips yield SKIPPED, unmet requirements, errors and panics
    /// yield ERROR. The returned result always carries this probe's key and version.
    fn apply(&self, plugin: &Plugin, context: &mut ProbeContext) -> ProbeResult {
        let key = self.key();
        let version = self.schema_version();

        if !self.applicability(plugin, context).should_run() {
            return ProbeResult::skipped(
                key,
                version,
                format!(
                    "{key} does not meet the criteria to be executed on {}",
                    plugin.name
                ),
            );
        }
        if let Some(requirement) = self.unmet_requirement(plugin) {
            return ProbeResult::error(
                key,
                version,
                format!("requirement {requirement} not satisfied"),
            );
        }

        match catch_unwind(AssertUnwindSafe(|| self.check(plugin, context))) {
            Ok(Ok(result)) => result.with_identity(key, version),
            Ok(Err(err)) => ProbeResult::error(key, version, format!("{}: {err}", err.kind())),
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|text| text.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ProbeResult::error(key, version, format!("panic: {detail}"))
            }
        }
    }

    /// SUCCESS result for this probe.
    fn success(&self, message: impl Into<Value>) -> ProbeResult
    where
        Self: Sized,
    {
        ProbeResult::new(self.key(), ResultStatus::Success, message, self.schema_version())
    }

    /// FAILURE result for this probe.
    fn failure(&self, message: impl Into<Value>) -> ProbeResult
    where
        Self: Sized,
    {
        ProbeResult::new(self.key(), ResultStatus::Failure, message, self.schema_version())
    }

    /// ERROR result for this probe.
    fn error(&self, message: impl Into<Value>) -> ProbeResult
    where
        Self: Sized,
    {
        ProbeResult::new(self.key(), ResultStatus::Error, message, self.schema_version())
    }
}

#[cfg(test)]
mod tests {
    use super::{Applicability, Probe};
    use crate::context::ProbeContext;
    use crate::context::testing::Fixture;
    use crate::error::{HealthError, Result};
    use crate::plugin::Plugin;
    use crate::result::{ProbeResult, ResultStatus};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        WrongId,
    }

    struct CountingProbe {
        requires_release: bool,
        source: bool,
        version: u32,
        requirements: &'static [&'static str],
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        fn new(requires_release: bool, source: bool) -> Self {
            Self {
                requires_release,
                source,
                version: 1,
                requirements: &[],
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Probe for CountingProbe {
        fn key(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "Counts its invocations."
        }

        fn schema_version(&self) -> u32 {
            self.version
        }

        fn requires_release(&self) -> bool {
            self.requires_release
        }

        fn is_source_code_related(&self) -> bool {
            self.source
        }

        fn requirements(&self) -> &[&'static str] {
            self.requirements
        }

        fn check(&self, _plugin: &Plugin, _context: &mut ProbeContext) -> Result<ProbeResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(self.success("checked")),
                Behavior::Fail => Err(HealthError::Timeout("hosting call timed out".to_string())),
                Behavior::Panic => panic!("probe exploded"),
                Behavior::WrongId => Ok(ProbeResult::failure("other", 9, "checked")),
            }
        }
    }

    fn context_for(plugin: &Plugin) -> ProbeContext {
        Fixture::default().factory().context_for(plugin)
    }

    fn plugin_with_previous(timestamp_offset_days: i64, version: u32) -> Plugin {
        let released = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut plugin = Plugin::new("mailer").with_release("1.0", released);
        plugin.record(
            ProbeResult::success("counting", version, "old")
                .at(released + Duration::days(timestamp_offset_days)),
        );
        plugin
    }

    #[test]
    fn runs_without_previous_result_regardless_of_traits() {
        for (release, source) in [(false, false), (true, false), (false, true), (true, true)] {
            let probe = CountingProbe::new(release, source);
            let plugin = Plugin::new("mailer");
            let mut context = context_for(&plugin);

            assert_eq!(
                probe.applicability(&plugin, &context),
                Applicability::NoPreviousResult
            );
            let result = probe.apply(&plugin, &mut context);
            assert_eq!(result.status(), ResultStatus::Success);
            assert_eq!(probe.calls(), 1);
        }
    }

    #[test]
    fn schema_upgrade_forces_a_run() {
        let mut probe = CountingProbe::new(true, true);
        probe.version = 2;
        let plugin = plugin_with_previous(10, 1);
        let mut context = context_for(&plugin);
        context
            .publish_last_commit_date(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .expect("publish");

        assert_eq!(
            probe.applicability(&plugin, &context),
            Applicability::SchemaUpgrade
        );
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.schema_version(), 2);
        assert_eq!(probe.calls(), 1);
    }

    #[test]
    fn external_state_probes_always_run() {
        let probe = CountingProbe::new(false, false);
        let plugin = plugin_with_previous(10, 1);
        let context = context_for(&plugin);
        assert_eq!(
            probe.applicability(&plugin, &context),
            Applicability::ExternalState
        );
    }

    #[test]
    fn release_related_probes_follow_release_timestamp() {
        let probe = CountingProbe::new(true, false);

        let stale = plugin_with_previous(-1, 1);
        let mut context = context_for(&stale);
        assert_eq!(probe.applicability(&stale, &context), Applicability::NewRelease);
        assert_eq!(probe.apply(&stale, &mut context).status(), ResultStatus::Success);

        let fresh = plugin_with_previous(1, 1);
        let mut context = context_for(&fresh);
        let result = probe.apply(&fresh, &mut context);
        assert_eq!(result.status(), ResultStatus::Skipped);
        assert_eq!(
            result.message_text(),
            "counting does not meet the criteria to be executed on mailer"
        );
        assert_eq!(probe.calls(), 1);
    }

    #[test]
    fn source_probes_skip_when_newer_than_last_commit() {
        let probe = CountingProbe::new(false, true);
        let plugin = plugin_with_previous(5, 1);
        let mut context = context_for(&plugin);
        context
            .publish_last_commit_date(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap())
            .expect("publish");

        assert_eq!(probe.applicability(&plugin, &context), Applicability::UpToDate);
        assert_eq!(probe.apply(&plugin, &mut context).status(), ResultStatus::Skipped);
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn source_probes_run_after_new_commit_or_without_commit_date() {
        let probe = CountingProbe::new(false, true);
        let plugin = plugin_with_previous(5, 1);

        let context = context_for(&plugin);
        assert_eq!(
            probe.applicability(&plugin, &context),
            Applicability::UnknownCommitDate
        );

        let mut context = context_for(&plugin);
        context
            .publish_last_commit_date(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap())
            .expect("publish");
        assert_eq!(probe.applicability(&plugin, &context), Applicability::NewCommit);
    }

    #[test]
    fn unmet_requirement_yields_error_without_running() {
        let mut probe = CountingProbe::new(false, false);
        probe.requirements = &["scm"];
        let mut plugin = Plugin::new("mailer");

        let mut context = context_for(&plugin);
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "requirement scm not satisfied");

        plugin.record(ProbeResult::failure("scm", 1, "no scm"));
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(probe.calls(), 0);

        plugin.record(ProbeResult::success("scm", 1, "ok"));
        assert_eq!(probe.apply(&plugin, &mut context).status(), ResultStatus::Success);
        assert_eq!(probe.calls(), 1);
    }

    #[test]
    fn errors_and_panics_become_error_results() {
        let mut probe = CountingProbe::new(false, false);
        probe.behavior = Behavior::Fail;
        let plugin = Plugin::new("mailer");
        let mut context = context_for(&plugin);
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "timeout: hosting call timed out");

        probe.behavior = Behavior::Panic;
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "panic: probe exploded");
        assert_eq!(result.id(), "counting");
    }

    #[test]
    fn result_identity_is_forced_to_probe_key_and_version() {
        let mut probe = CountingProbe::new(false, false);
        probe.behavior = Behavior::WrongId;
        let plugin = Plugin::new("mailer");
        let mut context = context_for(&plugin);
        let result = probe.apply(&plugin, &mut context);
        assert_eq!(result.id(), "counting");
        assert_eq!(result.schema_version(), 1);
        assert_eq!(result.status(), ResultStatus::Failure);
    }

    #[test]
    fn previous_error_forces_a_run() {
        let probe = CountingProbe::new(true, true);
        let released = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut plugin = Plugin::new("mailer").with_release("1.0", released);
        plugin.record(
            ProbeResult::error("counting", 1, "git: clone failed").at(released + Duration::days(3)),
        );
        let mut context = context_for(&plugin);
        context
            .publish_last_commit_date(released - Duration::days(1))
            .expect("publish");

        assert_eq!(
            probe.applicability(&plugin, &context),
            Applicability::PreviousError
        );
        assert_eq!(probe.apply(&plugin, &mut context).status(), ResultStatus::Success);
        assert_eq!(probe.calls(), 1);
    }
}
