//! Document totals derived from line items.

use serde::Serialize;

use wareflow_core::{DomainError, DomainResult, Money, Quantity};

use crate::line_item::DocumentLineItem;

/// Derived document totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocTotals {
    pub summ: Money,
    pub item_count: Quantity,
}

/// `summ = Σ quantity × (unit_price − bonus)`, `item_count = Σ quantity`.
///
/// Fails with `InvariantViolation` if either sum leaves the `i64` range.
pub fn compute_totals(lines: &[DocumentLineItem]) -> DomainResult<DocTotals> {
    lines.iter().try_fold(DocTotals::default(), |acc, line| {
        let summ = acc
            .summ
            .checked_add(line.line_total()?)
            .ok_or_else(|| DomainError::invariant("document total overflows"))?;
        let item_count = acc
            .item_count
            .checked_add(line.quantity)
            .ok_or_else(|| DomainError::invariant("document item count overflows"))?;
        Ok(DocTotals { summ, item_count })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use wareflow_core::{DocumentId, LineItemId, ProductId, UserId};

    fn line(quantity: Quantity, unit_price: Money, bonus: Money) -> DocumentLineItem {
        DocumentLineItem {
            id: LineItemId::new(),
            document_id: DocumentId::new(),
            product_id: ProductId::new(),
            batch_id: None,
            quantity,
            unit_price,
            bonus,
            created_at: Utc::now(),
            created_by: UserId::new(),
        }
    }

    #[test]
    fn sums_lines_with_bonus_deduction() {
        let totals = compute_totals(&[line(2, 50, 0), line(1, 30, 5)]).unwrap();
        assert_eq!(totals.summ, 125);
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn empty_document_totals_zero() {
        assert_eq!(compute_totals(&[]).unwrap(), DocTotals::default());
    }

    #[test]
    fn overflowing_sum_is_an_invariant_violation() {
        let big = i64::MAX / 2 + 1;
        let err = compute_totals(&[line(1, big, 0), line(1, big, 0)]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: totals depend only on the set of lines, not on how often
        /// or in which order they are recomputed.
        #[test]
        fn recomputation_is_stable(
            raw in prop::collection::vec((1i64..1_000, 0i64..10_000, 0i64..100), 0..20)
        ) {
            let lines: Vec<DocumentLineItem> = raw
                .into_iter()
                .map(|(q, p, b)| line(q, p, b.min(p)))
                .collect();

            let first = compute_totals(&lines).unwrap();
            let second = compute_totals(&lines).unwrap();
            prop_assert_eq!(first, second);

            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(compute_totals(&reversed).unwrap(), first);
        }
    }
}
