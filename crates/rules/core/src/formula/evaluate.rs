//! Formula evaluation against roll data.

use super::{Formula, FormulaError, RollData, RollValue};
use crate::dice::{DiceRoller, DieResult};

/// Result of evaluating a formula.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub total: f64,
    /// Individual dice rolled, in evaluation order.
    pub dice: Vec<DieResult>,
}

/// Evaluate a formula.
///
/// Dice terms (including references that resolve to dice) are rolled with
/// `roller`; without one they fail with [`FormulaError::DiceNotAllowed`].
pub fn evaluate(
    formula: &Formula,
    data: &RollData,
    roller: Option<&dyn DiceRoller>,
) -> Result<Evaluation, FormulaError> {
    let mut dice = Vec::new();
    let total = eval(formula, data, roller, &mut dice)?;
    if !total.is_finite() {
        return Err(FormulaError::NonFinite);
    }
    Ok(Evaluation { total, dice })
}

impl Formula {
    pub fn evaluate(
        &self,
        data: &RollData,
        roller: Option<&dyn DiceRoller>,
    ) -> Result<Evaluation, FormulaError> {
        evaluate(self, data, roller)
    }
}

fn eval(
    formula: &Formula,
    data: &RollData,
    roller: Option<&dyn DiceRoller>,
    dice: &mut Vec<DieResult>,
) -> Result<f64, FormulaError> {
    match formula {
        Formula::Constant(value) => Ok(*value),

        Formula::Reference(path) => match data.get(path) {
            Some(RollValue::Number(value)) => Ok(value),
            Some(RollValue::Dice { count, faces }) => roll(count, faces, roller, dice),
            None => Err(FormulaError::UnresolvedReference(path.clone())),
        },

        Formula::Dice { count, faces } => roll(*count, *faces, roller, dice),

        Formula::Negate(inner) => Ok(-eval(inner, data, roller, dice)?),

        Formula::Sum(a, b) => Ok(eval(a, data, roller, dice)? + eval(b, data, roller, dice)?),

        Formula::Difference(a, b) => {
            Ok(eval(a, data, roller, dice)? - eval(b, data, roller, dice)?)
        }

        Formula::Product(a, b) => Ok(eval(a, data, roller, dice)? * eval(b, data, roller, dice)?),

        Formula::Quotient(a, b) => {
            let numerator = eval(a, data, roller, dice)?;
            let denominator = eval(b, data, roller, dice)?;
            if denominator == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            Ok(numerator / denominator)
        }

        Formula::Min(args) => args
            .iter()
            .map(|arg| eval(arg, data, roller, dice))
            .try_fold(f64::INFINITY, |min, value| value.map(|v| min.min(v))),

        Formula::Max(args) => args
            .iter()
            .map(|arg| eval(arg, data, roller, dice))
            .try_fold(f64::NEG_INFINITY, |max, value| value.map(|v| max.max(v))),

        Formula::Floor(inner) => Ok(eval(inner, data, roller, dice)?.floor()),

        Formula::Ceil(inner) => Ok(eval(inner, data, roller, dice)?.ceil()),
    }
}

fn roll(
    count: u32,
    faces: u32,
    roller: Option<&dyn DiceRoller>,
    dice: &mut Vec<DieResult>,
) -> Result<f64, FormulaError> {
    let roller = roller.ok_or(FormulaError::DiceNotAllowed)?;
    if faces == 0 {
        return Err(FormulaError::InvalidDice { count, faces });
    }

    let mut total = 0.0;
    for _ in 0..count {
        let value = roller.roll_die(faces).clamp(1, faces);
        dice.push(DieResult { faces, value });
        total += f64::from(value);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedRoller;

    fn data() -> RollData {
        RollData::new()
            .with_number("abilities.dex.mod", 3.0)
            .with_number("abilities.wis.mod", 2.0)
            .with_number("prof", 2.0)
    }

    #[test]
    fn evaluates_references_and_functions() {
        let formula = Formula::parse("10 + @abilities.dex.mod + @abilities.wis.mod").unwrap();
        assert_eq!(formula.evaluate(&data(), None).unwrap().total, 15.0);

        let formula = Formula::parse("max(1, floor(7 / 2)) - ceil(0.5)").unwrap();
        assert_eq!(formula.evaluate(&data(), None).unwrap().total, 2.0);

        let formula = Formula::parse("-@prof * 2").unwrap();
        assert_eq!(formula.evaluate(&data(), None).unwrap().total, -4.0);
    }

    #[test]
    fn dice_need_a_roller() {
        let formula = Formula::parse("1d6 + @prof").unwrap();
        assert_eq!(
            formula.evaluate(&data(), None),
            Err(FormulaError::DiceNotAllowed)
        );

        let roller = ScriptedRoller::new([4]);
        let evaluation = formula.evaluate(&data(), Some(&roller)).unwrap();
        assert_eq!(evaluation.total, 6.0);
        assert_eq!(evaluation.dice, vec![DieResult { faces: 6, value: 4 }]);
    }

    #[test]
    fn dice_references_roll() {
        let mut data = data();
        data.insert_dice("scale.operative.sneak", 2, 6);
        let roller = ScriptedRoller::new([5, 1]);
        let evaluation = Formula::parse("@scale.operative.sneak")
            .unwrap()
            .evaluate(&data, Some(&roller))
            .unwrap();
        assert_eq!(evaluation.total, 6.0);
        assert_eq!(evaluation.dice.len(), 2);
    }

    #[test]
    fn reports_evaluation_failures() {
        assert_eq!(
            Formula::parse("@missing")
                .unwrap()
                .evaluate(&data(), None),
            Err(FormulaError::UnresolvedReference("missing".into()))
        );
        assert_eq!(
            Formula::parse("1 / (@prof - 2)")
                .unwrap()
                .evaluate(&data(), None),
            Err(FormulaError::DivisionByZero)
        );
    }
}
