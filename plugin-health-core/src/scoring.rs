//! Weighted reduction of probe results into category scores.

use std::panic::{AssertUnwindSafe, catch_unwind};

use log::warn;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Result;
use crate::plugin::{Plugin, ProbeResults};
use crate::result::ProbeResult;

/// Remediation hint attached to a component result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Resolution {
    /// What to do.
    pub text: String,
    /// Where to learn how.
    pub link: String,
}

impl Resolution {
    /// Create a resolution.
    pub fn new(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: link.into(),
        }
    }
}

/// Judgment of one scoring component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentResult {
    /// Usually 0 to 100; negative values are strong penalties.
    pub score: i32,
    /// Relative weight; 0 keeps the reasons visible without affecting the value.
    pub weight: u32,
    /// Why the score is what it is.
    pub reasons: Vec<String>,
    /// How to improve the score.
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
}

impl ComponentResult {
    /// Create a result without resolutions.
    pub fn new(score: i32, weight: u32, reason: impl Into<String>) -> Self {
        Self {
            score,
            weight,
            reasons: vec![reason.into()],
            resolutions: Vec::new(),
        }
    }

    /// Append a reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// Append a resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolutions.push(resolution);
        self
    }
}

/// Score of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoreResult {
    /// Scoring key.
    pub key: String,
    /// Reduced value, 0 to 100.
    pub value: u8,
    /// Category weight used by the overall score.
    pub weight: f32,
    /// Version of the scoring logic.
    pub version: u32,
    /// Every component judgment, in declaration order.
    pub components: Vec<ComponentResult>,
}

/// One weighted judgment rule over the result map.
pub trait ScoringComponent: Send + Sync {
    /// What the component judges.
    fn description(&self) -> &str;
    /// Declared weight.
    fn weight(&self) -> u32;
    /// Judge the plugin from its probe results only.
    fn evaluate(&self, plugin: &Plugin, results: &ProbeResults) -> Result<ComponentResult>;
}

/// A named, versioned, weighted collection of components.
pub trait Scoring: Send + Sync {
    /// Unique key.
    fn key(&self) -> &str;
    /// Category weight, between 0 and 1.
    fn weight(&self) -> f32;
    /// Human-readable purpose.
    fn description(&self) -> &str;
    /// Version of the scoring logic.
    fn version(&self) -> u32 {
        1
    }
    /// Components in evaluation order.
    fn components(&self) -> &[Box<dyn ScoringComponent>];

    /// Evaluate every component and reduce them to a category score.
    ///
    /// A component that fails or panics counts as score 0 at its declared
    /// weight, with a reason describing the failure.
    fn apply(&self, plugin: &Plugin) -> ScoreResult {
        let components: Vec<ComponentResult> = self
            .components()
            .iter()
            .map(|component| {
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| component.evaluate(plugin, plugin.results())));
                let failure = match outcome {
                    Ok(Ok(result)) => return result,
                    Ok(Err(err)) => format!("{}: {err}", err.kind()),
                    Err(_) => "panic".to_string(),
                };
                warn!(
                    "{} component {:?} failed on {}: {failure}",
                    self.key(),
                    component.description(),
                    plugin.name
                );
                ComponentResult::new(
                    0,
                    component.weight(),
                    format!("{} could not be evaluated ({failure}).", component.description()),
                )
            })
            .collect();

        let value = weighted_value(
            components
                .iter()
                .map(|component| (f64::from(component.score), f64::from(component.weight))),
        );
        ScoreResult {
            key: self.key().to_string(),
            value,
            weight: self.weight(),
            version: self.version(),
            components,
        }
    }
}

/// `round(clamp(Σ score·weight / Σ weight, 0, 100))`, or 100 when the weights sum to 0.
pub fn weighted_value(parts: impl IntoIterator<Item = (f64, f64)>) -> u8 {
    let (sum, weights) = parts
        .into_iter()
        .fold((0.0, 0.0), |(sum, weights), (score, weight)| {
            (sum + score * weight, weights + weight)
        });
    if weights == 0.0 {
        return 100;
    }
    (sum / weights).clamp(0.0, 100.0).round() as u8
}

/// Signature of a component rule: plugin, results, declared weight.
pub type ComponentRule = fn(&Plugin, &ProbeResults, u32) -> Result<ComponentResult>;

/// Component defined by a rule function.
pub struct RuleComponent {
    description: &'static str,
    weight: u32,
    rule: ComponentRule,
}

impl RuleComponent {
    /// Create a component.
    pub fn new(description: &'static str, weight: u32, rule: ComponentRule) -> Self {
        Self {
            description,
            weight,
            rule,
        }
    }
}

impl ScoringComponent for RuleComponent {
    fn description(&self) -> &str {
        self.description
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn evaluate(&self, plugin: &Plugin, results: &ProbeResults) -> Result<ComponentResult> {
        (self.rule)(plugin, results, self.weight)
    }
}

/// Scoring assembled from components.
pub struct CategoryScoring {
    key: &'static str,
    description: &'static str,
    weight: f32,
    version: u32,
    components: Vec<Box<dyn ScoringComponent>>,
}

impl CategoryScoring {
    /// Create a scoring with no components.
    pub fn new(key: &'static str, weight: f32, version: u32, description: &'static str) -> Self {
        Self {
            key,
            description,
            weight,
            version,
            components: Vec::new(),
        }
    }

    /// Append a component.
    pub fn with_component(mut self, component: impl ScoringComponent + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// Append a rule-defined component.
    pub fn with_rule(self, description: &'static str, weight: u32, rule: ComponentRule) -> Self {
        self.with_component(RuleComponent::new(description, weight, rule))
    }
}

impl Scoring for CategoryScoring {
    fn key(&self) -> &str {
        self.key
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn description(&self) -> &str {
        self.description
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn components(&self) -> &[Box<dyn ScoringComponent>] {
        &self.components
    }
}

/// Result for `key` unless it is missing or ERROR.
pub fn usable<'a>(results: &'a ProbeResults, key: &str) -> Option<&'a ProbeResult> {
    results.get(key).filter(|result| !result.is_error())
}

#[cfg(test)]
mod tests {
    use super::{CategoryScoring, ComponentResult, Resolution, Scoring, usable, weighted_value};
    use crate::error::{HealthError, Result};
    use crate::plugin::{Plugin, ProbeResults};
    use crate::result::ProbeResult;

    fn fixed(score: i32, weight: u32) -> ComponentResult {
        ComponentResult::new(score, weight, "fixed")
    }

    fn full(_: &Plugin, _: &ProbeResults, weight: u32) -> Result<ComponentResult> {
        Ok(fixed(100, weight))
    }

    fn empty(_: &Plugin, _: &ProbeResults, weight: u32) -> Result<ComponentResult> {
        Ok(fixed(0, weight))
    }

    fn broken(_: &Plugin, _: &ProbeResults, _: u32) -> Result<ComponentResult> {
        Err(HealthError::Other("message is not a number".to_string()))
    }

    fn exploding(_: &Plugin, _: &ProbeResults, _: u32) -> Result<ComponentResult> {
        panic!("component exploded")
    }

    fn penalty(_: &Plugin, _: &ProbeResults, _: u32) -> Result<ComponentResult> {
        Ok(fixed(-100, 100))
    }

    #[test]
    fn weighted_value_rounds_half_up_and_clamps() {
        assert_eq!(weighted_value([(100.0, 1.0)]), 100);
        assert_eq!(weighted_value([(0.0, 1.0), (100.0, 3.0)]), 75);
        assert_eq!(weighted_value([(0.0, 1.0), (100.0, 1.0), (25.0, 0.0)]), 50);
        assert_eq!(weighted_value([(50.0, 1.0), (51.0, 1.0)]), 51);
        assert_eq!(weighted_value([(-100.0, 100.0), (100.0, 1.0)]), 0);
        assert_eq!(weighted_value([(250.0, 1.0)]), 100);
        assert_eq!(weighted_value(Vec::<(f64, f64)>::new()), 100);
        assert_eq!(weighted_value([(0.0, 0.0), (12.0, 0.0)]), 100);
    }

    #[test]
    fn single_full_component_scores_100() {
        let scoring = CategoryScoring::new("demo", 1.0, 2, "demo").with_rule("full", 1, full);
        let result = scoring.apply(&Plugin::new("mailer"));
        assert_eq!(result.value, 100);
        assert_eq!(result.version, 2);
        assert_eq!(result.key, "demo");
    }

    #[test]
    fn weights_one_and_three_give_75() {
        let scoring = CategoryScoring::new("demo", 1.0, 1, "demo")
            .with_rule("empty", 1, empty)
            .with_rule("full", 3, full);
        assert_eq!(scoring.apply(&Plugin::new("mailer")).value, 75);
    }

    #[test]
    fn failing_components_are_contained() {
        let scoring = CategoryScoring::new("demo", 1.0, 1, "demo")
            .with_rule("full", 3, full)
            .with_rule("Pull request count", 1, broken)
            .with_rule("Exploding rule", 1, exploding);

        let result = scoring.apply(&Plugin::new("mailer"));

        assert_eq!(result.components.len(), 3);
        assert_eq!(result.components[0].score, 100);
        assert_eq!(result.components[1].score, 0);
        assert_eq!(result.components[1].weight, 1);
        assert_eq!(
            result.components[1].reasons,
            vec!["Pull request count could not be evaluated (other: message is not a number).".to_string()]
        );
        assert_eq!(
            result.components[2].reasons,
            vec!["Exploding rule could not be evaluated (panic).".to_string()]
        );
        assert_eq!(result.value, 60);
    }

    #[test]
    fn zero_total_weight_scores_100() {
        let scoring = CategoryScoring::new("demo", 1.0, 1, "demo").with_rule("empty", 0, empty);
        assert_eq!(scoring.apply(&Plugin::new("mailer")).value, 100);
    }

    #[test]
    fn negative_penalties_clamp_to_zero() {
        let scoring = CategoryScoring::new("demo", 1.0, 1, "demo")
            .with_rule("full", 1, full)
            .with_rule("penalty", 1, penalty);
        assert_eq!(scoring.apply(&Plugin::new("mailer")).value, 0);
    }

    #[test]
    fn usable_ignores_error_results() {
        let mut plugin = Plugin::new("mailer");
        plugin.record(ProbeResult::error("scm", 1, "requirement not satisfied"));
        plugin.record(ProbeResult::failure("deprecation", 1, "deprecated"));
        assert!(usable(plugin.results(), "scm").is_none());
        assert!(usable(plugin.results(), "missing").is_none());
        assert!(usable(plugin.results(), "deprecation").is_some());
    }

    #[test]
    fn builders_collect_reasons_and_resolutions() {
        let result = ComponentResult::new(0, 2, "no guide")
            .with_reason("inherits organization guide")
            .with_resolution(Resolution::new("Add a guide", "https://example.com/guide"));
        assert_eq!(result.reasons.len(), 2);
        assert_eq!(result.resolutions[0].link, "https://example.com/guide");
    }
}
