//! QC rules, checked in order with the first violation deciding the flag.

use crate::config::{CrossCheck, QcConfig, RangeBounds};
use crate::models::{DailyReference, QcFlag, QuantityCode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QcRule {
    /// Absolute physical bounds
    Range(RangeBounds),
    /// Consistency with the station's daily reference aggregate
    Reference { check: CrossCheck, margin: f64 },
}

impl QcRule {
    pub fn name(&self) -> &'static str {
        match self {
            QcRule::Range(_) => "range",
            QcRule::Reference { .. } => "reference",
        }
    }

    /// Flag assigned when this rule is the first one violated.
    pub fn flag(&self) -> QcFlag {
        match self {
            QcRule::Range(_) => QcFlag::RangeError,
            QcRule::Reference { .. } => QcFlag::Suspect,
        }
    }

    /// Boundary values pass: every comparison is strict.
    pub fn is_violated(&self, value: f64, reference: Option<&DailyReference>) -> bool {
        match *self {
            QcRule::Range(bounds) => !bounds.contains(value),
            QcRule::Reference { check, margin } => {
                let Some(reference) = reference else {
                    return false;
                };
                match check {
                    CrossCheck::Maximum => value > reference.max + margin,
                    CrossCheck::Minimum => value < reference.min - margin,
                    CrossCheck::Mean => (value - reference.mean).abs() > margin,
                    CrossCheck::None => false,
                }
            }
        }
    }
}

/// Ordered rule list for one quantity: range first, then the reference
/// cross-check when the quantity has a relationship configured.
pub fn rules_for(config: &QcConfig, quantity: &QuantityCode) -> Vec<QcRule> {
    let mut rules = vec![QcRule::Range(config.bounds)];

    let check = config.cross_check_for(quantity);
    if check != CrossCheck::None {
        rules.push(QcRule::Reference {
            check,
            margin: config.margin,
        });
    }

    rules
}

pub fn first_violation(
    rules: &[QcRule],
    value: f64,
    reference: Option<&DailyReference>,
) -> Option<QcFlag> {
    rules
        .iter()
        .find(|rule| rule.is_violated(value, reference))
        .map(QcRule::flag)
}
